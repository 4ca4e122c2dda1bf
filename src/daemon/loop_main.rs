//! Driver loop: scan, then expire, then sleep a fixed interval; repeat until stopped.
//!
//! State machine:
//!
//! ```text
//! Idle -> Scanning -> Expiring -> Sleeping -> Scanning -> ...
//!   any state --stop request--> Stopped
//! ```
//!
//! A stop request is observed before each cycle, between the scan and the
//! sweep, and while sleeping. Filesystem calls already in flight are allowed to
//! finish; nothing is cancelled mid-call. The sleep does not subtract the time
//! the cycle took.

#![allow(missing_docs)]

use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::daemon::signals::SignalHandler;
use crate::logger::dual::{ActivityEvent, ActivityLogger, StopReason};
use crate::scanner::deletion::{Expirer, SweepReport};
use crate::scanner::naming::NamingConvention;
use crate::scanner::tracked::TrackedSet;
use crate::scanner::walker::{DirectoryScanner, ScanReport};

/// Upper bound on one uninterrupted nap while waiting for the next cycle.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scanning,
    Expiring,
    Sleeping,
    Stopped,
}

/// What one cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    /// `None` when the watched directory could not be listed.
    pub scan: Option<ScanReport>,
    /// `None` when a stop request arrived between scan and sweep.
    pub sweep: Option<SweepReport>,
}

/// Owns the tracked set and drives the scan/expire cycle.
pub struct CleanerDaemon {
    config: Config,
    tracked: TrackedSet,
    scanner: DirectoryScanner,
    expirer: Expirer,
    logger: ActivityLogger,
    signals: SignalHandler,
    state: RunState,
    cycles: u64,
    max_cycles: Option<u64>,
}

impl CleanerDaemon {
    /// Build from a validated config.
    pub fn new(config: Config, logger: ActivityLogger, signals: SignalHandler) -> Self {
        let scanner = DirectoryScanner::new(
            NamingConvention::new(config.watch.prefix.clone()),
            config.watch.timestamp_source,
        );
        let expirer = Expirer::new(config.schedule.dry_run);
        Self {
            config,
            tracked: TrackedSet::new(),
            scanner,
            expirer,
            logger,
            signals,
            state: RunState::Idle,
            cycles: 0,
            max_cycles: None,
        }
    }

    /// Stop on its own after `n` cycles (`None` = run until signalled).
    #[must_use]
    pub fn with_max_cycles(mut self, n: Option<u64>) -> Self {
        self.max_cycles = n;
        self
    }

    pub const fn state(&self) -> RunState {
        self.state
    }

    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    pub const fn tracked(&self) -> &TrackedSet {
        &self.tracked
    }

    /// Handle that can stop the loop from elsewhere.
    pub fn shutdown_handle(&self) -> SignalHandler {
        self.signals.clone()
    }

    /// Run until a stop request (or the cycle budget) ends the loop.
    pub fn run(&mut self) -> Result<StopReason> {
        let config_hash = self.config.stable_hash()?;
        self.logger.log(&ActivityEvent::DaemonStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            watch_dir: self.config.watch.directory.display().to_string(),
            prefix: self.config.watch.prefix.clone(),
            interval_secs: self.config.schedule.scan_interval_secs,
            dry_run: self.expirer.is_dry_run(),
            config_hash,
        });

        let interval = self.config.schedule.scan_interval();
        let reason = loop {
            if self.signals.should_shutdown() {
                break StopReason::Interrupted;
            }

            self.run_cycle();

            if self.signals.should_shutdown() {
                break StopReason::Interrupted;
            }
            if self.max_cycles.is_some_and(|max| self.cycles >= max) {
                break StopReason::Completed;
            }

            self.state = RunState::Sleeping;
            if self.sleep_until_next_cycle(interval) {
                break StopReason::Interrupted;
            }
        };

        self.state = RunState::Stopped;
        self.logger.log(&ActivityEvent::DaemonStopped {
            reason,
            cycles: self.cycles,
        });
        self.logger.flush();
        Ok(reason)
    }

    /// One scan followed by one sweep. Per-entry problems are logged, never returned.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let watch_dir = self.config.watch.directory.clone();

        self.state = RunState::Scanning;
        let scan = match self.scanner.scan_and_update(&mut self.tracked, &watch_dir) {
            Ok(report) => {
                self.logger.log_all(&ActivityEvent::from_scan(&report));
                Some(report)
            }
            Err(e) => {
                self.logger.log(&ActivityEvent::ScanFailed {
                    path: watch_dir.display().to_string(),
                    code: e.code().to_string(),
                    error: e.to_string(),
                });
                None
            }
        };

        if self.signals.should_shutdown() {
            return CycleReport {
                cycle: self.cycles,
                scan,
                sweep: None,
            };
        }

        self.state = RunState::Expiring;
        let sweep = self
            .expirer
            .delete_expired(&mut self.tracked, &watch_dir, SystemTime::now());
        self.logger.log_all(&ActivityEvent::from_sweep(&sweep));

        self.logger.log(&ActivityEvent::CycleCompleted {
            cycle: self.cycles,
            tracked: self.tracked.len(),
            deleted: sweep.items_deleted,
            scan_ms: scan.as_ref().map_or(0, |s| millis(s.duration)),
            sweep_ms: millis(sweep.duration),
        });

        CycleReport {
            cycle: self.cycles,
            scan,
            sweep: Some(sweep),
        }
    }

    /// Sleep `interval`, waking early on a stop request. Returns true if stopped.
    fn sleep_until_next_cycle(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        loop {
            if self.signals.should_shutdown() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(remaining.min(STOP_POLL_INTERVAL));
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
