//! Human-readable status lines.

#![allow(missing_docs)]

use std::io::{self, Write};

use colored::Colorize;

use crate::logger::dual::{ActivityEvent, StopReason};
use crate::logger::jsonl::Severity;

/// How much the console prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    /// Banner, per-entry outcomes, invalid names, stop message.
    #[default]
    Normal,
    /// Also every tracked entry and a per-cycle summary.
    Verbose,
}

/// Line format on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    Plain,
    Colored,
    /// One JSON record per event, same shape as the JSONL file.
    Json,
}

/// Writes status lines for activity events.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
    verbosity: Verbosity,
    format: LineFormat,
}

impl ConsoleSink {
    pub fn stdout(verbosity: Verbosity, format: LineFormat) -> Self {
        Self::new(Box::new(io::stdout()), verbosity, format)
    }

    pub fn new(out: Box<dyn Write + Send>, verbosity: Verbosity, format: LineFormat) -> Self {
        Self {
            out,
            verbosity,
            format,
        }
    }

    pub fn emit(&mut self, event: &ActivityEvent) {
        if !self.wants(event) {
            return;
        }
        let line = match self.format {
            LineFormat::Plain => render_line(event),
            LineFormat::Colored => paint(&render_line(event), event),
            LineFormat::Json => match serde_json::to_string(&event.to_log_entry()) {
                Ok(json) => json,
                Err(_) => return,
            },
        };
        // A closed stdout must not stop the sweep.
        let _ = writeln!(self.out, "{line}").and_then(|()| self.out.flush());
    }

    fn wants(&self, event: &ActivityEvent) -> bool {
        match self.verbosity {
            Verbosity::Quiet => event.severity() >= Severity::Warning,
            Verbosity::Normal => !event.is_verbose_only(),
            Verbosity::Verbose => true,
        }
    }
}

/// Plain status line for an event, without color.
pub fn render_line(event: &ActivityEvent) -> String {
    match event {
        ActivityEvent::DaemonStarted {
            watch_dir,
            interval_secs,
            dry_run,
            ..
        } => {
            let mode = if *dry_run { " [dry run]" } else { "" };
            format!(
                "🧹 tempclean is watching {watch_dir} every {interval_secs}s{mode}... Press Ctrl+C to stop."
            )
        }
        ActivityEvent::DaemonStopped { reason, .. } => match reason {
            StopReason::Interrupted => "⏹️ tempclean stopped by user.".to_string(),
            StopReason::Completed => "tempclean finished.".to_string(),
        },
        ActivityEvent::EntryTracked { name, expires_at } => {
            format!("Tracking: {name} (expires {expires_at})")
        }
        ActivityEvent::EntryDeleted { name } => format!("Deleted: {name}"),
        ActivityEvent::EntryWouldDelete { name } => format!("Would delete: {name} (dry run)"),
        ActivityEvent::EntryNotFound { name } => format!("Not found: {name}, skipping..."),
        ActivityEvent::EntryPermissionDenied { name } => {
            format!("Permission denied: {name}, skipping...")
        }
        ActivityEvent::EntryDeleteFailed { name, error } => {
            format!("Error deleting '{name}': {error}")
        }
        ActivityEvent::InvalidName { name, reason } => {
            format!("Invalid time format in '{name}' ({reason}), skipping...")
        }
        ActivityEvent::MetadataUnavailable { name, error } => {
            format!("Cannot read timestamp of '{name}': {error}, skipping...")
        }
        ActivityEvent::ListingError { error } => format!("Unreadable directory entry: {error}"),
        ActivityEvent::ScanFailed { path, error, .. } => format!("Cannot scan {path}: {error}"),
        ActivityEvent::CycleCompleted {
            cycle,
            tracked,
            deleted,
            ..
        } => format!("Cycle {cycle}: {tracked} tracked, {deleted} deleted"),
    }
}

fn paint(line: &str, event: &ActivityEvent) -> String {
    match event {
        ActivityEvent::DaemonStarted { .. } | ActivityEvent::DaemonStopped { .. } => {
            line.bold().to_string()
        }
        ActivityEvent::EntryDeleted { .. } => line.green().to_string(),
        ActivityEvent::EntryTracked { .. } | ActivityEvent::CycleCompleted { .. } => {
            line.dimmed().to_string()
        }
        _ => match event.severity() {
            Severity::Info => line.to_string(),
            Severity::Warning => line.yellow().to_string(),
            Severity::Critical => line.red().to_string(),
        },
    }
}
