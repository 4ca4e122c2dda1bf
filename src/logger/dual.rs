//! Dual-write activity logging: console status lines + optional JSONL file.
//!
//! The cleaner runs on a single thread, so events are written synchronously in
//! the order they happen. Both sinks swallow their own IO failures.

#![allow(missing_docs)]

use std::time::SystemTime;

use serde_json::json;

use crate::logger::console::ConsoleSink;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use crate::scanner::deletion::{SweepOutcome, SweepReport};
use crate::scanner::walker::{ScanOutcome, ScanReport};

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stop signal (Ctrl+C / SIGTERM) or programmatic shutdown request.
    Interrupted,
    /// Configured cycle budget ran out (`--once`).
    Completed,
}

/// Everything the cleaner reports.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    DaemonStarted {
        version: String,
        watch_dir: String,
        prefix: String,
        interval_secs: f64,
        dry_run: bool,
        config_hash: String,
    },
    DaemonStopped {
        reason: StopReason,
        cycles: u64,
    },
    EntryTracked {
        name: String,
        expires_at: String,
    },
    EntryDeleted {
        name: String,
    },
    EntryWouldDelete {
        name: String,
    },
    EntryNotFound {
        name: String,
    },
    EntryPermissionDenied {
        name: String,
    },
    EntryDeleteFailed {
        name: String,
        error: String,
    },
    InvalidName {
        name: String,
        reason: String,
    },
    MetadataUnavailable {
        name: String,
        error: String,
    },
    ListingError {
        error: String,
    },
    ScanFailed {
        path: String,
        code: String,
        error: String,
    },
    CycleCompleted {
        cycle: u64,
        tracked: usize,
        deleted: usize,
        scan_ms: u64,
        sweep_ms: u64,
    },
}

impl ActivityEvent {
    pub const fn severity(&self) -> Severity {
        match self {
            Self::EntryPermissionDenied { .. }
            | Self::InvalidName { .. }
            | Self::MetadataUnavailable { .. }
            | Self::ListingError { .. } => Severity::Warning,
            Self::EntryDeleteFailed { .. } | Self::ScanFailed { .. } => Severity::Critical,
            _ => Severity::Info,
        }
    }

    /// Chatty events the console shows only in verbose mode.
    pub const fn is_verbose_only(&self) -> bool {
        matches!(self, Self::EntryTracked { .. } | Self::CycleCompleted { .. })
    }

    /// Events for every per-entry outcome of a scan, in listing order.
    pub fn from_scan(report: &ScanReport) -> Vec<Self> {
        report
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                ScanOutcome::Tracked {
                    name, expires_at, ..
                } => Self::EntryTracked {
                    name: name.clone(),
                    expires_at: rfc3339(*expires_at),
                },
                ScanOutcome::InvalidName { name, rejection } => Self::InvalidName {
                    name: name.clone(),
                    reason: rejection.to_string(),
                },
                ScanOutcome::MetadataUnavailable { name, error } => Self::MetadataUnavailable {
                    name: name.clone(),
                    error: error.clone(),
                },
                ScanOutcome::EntryUnreadable { error } => Self::ListingError {
                    error: error.clone(),
                },
            })
            .collect()
    }

    /// Events for every per-entry outcome of a sweep.
    pub fn from_sweep(report: &SweepReport) -> Vec<Self> {
        report
            .outcomes
            .iter()
            .map(|outcome| match outcome.clone() {
                SweepOutcome::Deleted { name } => Self::EntryDeleted { name },
                SweepOutcome::WouldDelete { name } => Self::EntryWouldDelete { name },
                SweepOutcome::NotFound { name } => Self::EntryNotFound { name },
                SweepOutcome::PermissionDenied { name } => Self::EntryPermissionDenied { name },
                SweepOutcome::Failed { name, error } => Self::EntryDeleteFailed { name, error },
            })
            .collect()
    }

    /// JSONL record for this event.
    pub fn to_log_entry(&self) -> LogEntry {
        let (event_type, severity) = (self.event_type(), self.severity());
        let mut entry = LogEntry::new(event_type, severity);
        match self {
            Self::DaemonStarted {
                version,
                watch_dir,
                prefix,
                interval_secs,
                dry_run,
                config_hash,
            } => {
                entry.path = Some(watch_dir.clone());
                entry.details = Some(json!({
                    "version": version,
                    "prefix": prefix,
                    "interval_secs": interval_secs,
                    "dry_run": dry_run,
                    "config_hash": config_hash,
                }));
            }
            Self::DaemonStopped { reason, cycles } => {
                entry.details = Some(json!({
                    "reason": match reason {
                        StopReason::Interrupted => "interrupted",
                        StopReason::Completed => "completed",
                    },
                    "cycles": cycles,
                }));
            }
            Self::EntryTracked { name, expires_at } => {
                entry.name = Some(name.clone());
                entry.expires_at = Some(expires_at.clone());
            }
            Self::EntryDeleted { name }
            | Self::EntryWouldDelete { name }
            | Self::EntryNotFound { name }
            | Self::EntryPermissionDenied { name } => {
                entry.name = Some(name.clone());
            }
            Self::EntryDeleteFailed { name, error }
            | Self::MetadataUnavailable { name, error } => {
                entry.name = Some(name.clone());
                entry.error_message = Some(error.clone());
            }
            Self::InvalidName { name, reason } => {
                entry.name = Some(name.clone());
                entry.error_message = Some(reason.clone());
            }
            Self::ListingError { error } => {
                entry.error_message = Some(error.clone());
            }
            Self::ScanFailed { path, code, error } => {
                entry.path = Some(path.clone());
                entry.error_code = Some(code.clone());
                entry.error_message = Some(error.clone());
            }
            Self::CycleCompleted {
                cycle,
                tracked,
                deleted,
                scan_ms,
                sweep_ms,
            } => {
                entry.duration_ms = Some(scan_ms + sweep_ms);
                entry.details = Some(json!({
                    "cycle": cycle,
                    "tracked": tracked,
                    "deleted": deleted,
                    "scan_ms": scan_ms,
                    "sweep_ms": sweep_ms,
                }));
            }
        }
        entry
    }

    const fn event_type(&self) -> EventType {
        match self {
            Self::DaemonStarted { .. } => EventType::DaemonStart,
            Self::DaemonStopped { .. } => EventType::DaemonStop,
            Self::EntryTracked { .. } => EventType::EntryTracked,
            Self::EntryDeleted { .. } => EventType::EntryDeleted,
            Self::EntryWouldDelete { .. } => EventType::EntryWouldDelete,
            Self::EntryNotFound { .. } => EventType::EntryNotFound,
            Self::EntryPermissionDenied { .. } => EventType::EntryPermissionDenied,
            Self::EntryDeleteFailed { .. } => EventType::EntryDeleteFailed,
            Self::InvalidName { .. } => EventType::InvalidName,
            Self::MetadataUnavailable { .. } => EventType::MetadataUnavailable,
            Self::ListingError { .. } => EventType::EntryUnreadable,
            Self::ScanFailed { .. } => EventType::ScanFailed,
            Self::CycleCompleted { .. } => EventType::CycleComplete,
        }
    }
}

/// Format a timestamp as RFC 3339 UTC with milliseconds.
pub fn rfc3339(at: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(at).to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Fans events out to the console and, when configured, the JSONL file.
#[derive(Default)]
pub struct ActivityLogger {
    console: Option<ConsoleSink>,
    jsonl: Option<JsonlWriter>,
}

impl ActivityLogger {
    pub fn new(console: Option<ConsoleSink>, jsonl: Option<JsonlConfig>) -> Self {
        Self {
            console,
            jsonl: jsonl.map(JsonlWriter::open),
        }
    }

    /// A logger that drops everything.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn log(&mut self, event: &ActivityEvent) {
        if let Some(console) = self.console.as_mut() {
            console.emit(event);
        }
        if let Some(jsonl) = self.jsonl.as_mut() {
            jsonl.write_entry(&event.to_log_entry());
        }
    }

    pub fn log_all<'a>(&mut self, events: impl IntoIterator<Item = &'a ActivityEvent>) {
        for event in events {
            self.log(event);
        }
    }

    pub fn flush(&mut self) {
        if let Some(jsonl) = self.jsonl.as_mut() {
            jsonl.flush();
        }
    }
}
