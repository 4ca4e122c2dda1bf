#![forbid(unsafe_code)]

//! temp_cleaner (tempclean): a background cleaner for self-expiring entries.
//!
//! Any file or directory in the watched directory whose name is
//! `<prefix><digits><s|m|h>` (for example `temp5m` or `temp2h`) is deleted once
//! its creation time plus the encoded duration has passed.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use temp_cleaner::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use temp_cleaner::core::config::Config;
//! use temp_cleaner::scanner::naming::{NameMatch, NamingConvention};
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod logger;
pub mod scanner;
