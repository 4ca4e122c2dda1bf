//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use temp_cleaner::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{CleanerError, Result};

// Scanner
pub use crate::scanner::deletion::{EntryRemover, Expirer, FsRemover, RemovalOutcome, SweepReport};
pub use crate::scanner::naming::{NameMatch, NameRejection, NamingConvention, ParsedName, TimeUnit};
pub use crate::scanner::timestamps::TimestampSource;
pub use crate::scanner::tracked::TrackedSet;
pub use crate::scanner::walker::{DirectoryScanner, ScanOutcome, ScanReport};

// Logger
pub use crate::logger::console::{ConsoleSink, LineFormat, Verbosity};
pub use crate::logger::dual::{ActivityEvent, ActivityLogger, StopReason};

// Daemon
#[cfg(feature = "daemon")]
pub use crate::daemon::loop_main::{CleanerDaemon, CycleReport, RunState};
#[cfg(feature = "daemon")]
pub use crate::daemon::signals::SignalHandler;
