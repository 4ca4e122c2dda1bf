//! Directory scanner: lists the watched directory (one level, no recursion),
//! matches names against the convention and records expirations.
//!
//! The scanner never deletes. Its only side effect is upserting into the
//! caller's [`TrackedSet`]; invalid names are reported and left alone, including
//! any value already tracked under that name.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use crate::core::errors::{CleanerError, Result};
use crate::scanner::naming::{NameMatch, NameRejection, NamingConvention};
use crate::scanner::timestamps::TimestampSource;
use crate::scanner::tracked::TrackedSet;

// ──────────────────── report types ────────────────────

/// What happened to one listed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Parsed and upserted.
    Tracked {
        name: String,
        born_at: SystemTime,
        duration_secs: u64,
        expires_at: SystemTime,
    },
    /// Carries the prefix but fails the grammar.
    InvalidName {
        name: String,
        rejection: NameRejection,
    },
    /// Name was valid but its timestamp could not be read (usually it vanished
    /// between listing and stat).
    MetadataUnavailable { name: String, error: String },
    /// The listing yielded an error instead of an entry.
    EntryUnreadable { error: String },
}

/// Summary of one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Entries returned by the listing, candidates or not.
    pub entries_listed: usize,
    /// Entries without the prefix.
    pub ignored: usize,
    pub outcomes: Vec<ScanOutcome>,
    pub duration: Duration,
}

impl ScanReport {
    pub fn tracked_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ScanOutcome::Tracked { .. }))
            .count()
    }

    pub fn invalid_names(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            ScanOutcome::InvalidName { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }
}

// ──────────────────── scanner ────────────────────

/// Lists a directory and keeps a [`TrackedSet`] current.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    convention: NamingConvention,
    timestamp_source: TimestampSource,
}

impl DirectoryScanner {
    pub fn new(convention: NamingConvention, timestamp_source: TimestampSource) -> Self {
        Self {
            convention,
            timestamp_source,
        }
    }

    pub fn convention(&self) -> &NamingConvention {
        &self.convention
    }

    /// Scan `watch_dir` once and upsert every valid candidate into `tracked`.
    ///
    /// Fails only when the directory itself cannot be listed; per-entry problems
    /// land in the report.
    pub fn scan_and_update(&self, tracked: &mut TrackedSet, watch_dir: &Path) -> Result<ScanReport> {
        let start = Instant::now();
        let listing = fs::read_dir(watch_dir).map_err(|source| CleanerError::DirectoryUnreadable {
            path: watch_dir.to_path_buf(),
            source,
        })?;

        let mut report = ScanReport::default();
        for entry in listing {
            report.entries_listed += 1;
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.outcomes.push(ScanOutcome::EntryUnreadable {
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let raw_name = entry.file_name();
            let parsed = match self.convention.parse_os(&raw_name) {
                NameMatch::NotCandidate => {
                    report.ignored += 1;
                    continue;
                }
                NameMatch::Invalid(rejection) => {
                    report.outcomes.push(ScanOutcome::InvalidName {
                        name: raw_name.to_string_lossy().into_owned(),
                        rejection,
                    });
                    continue;
                }
                NameMatch::Valid(parsed) => parsed,
            };
            // parse_os only returns Valid for UTF-8 names.
            let name = raw_name.to_string_lossy().into_owned();

            let born_at = match self.timestamp_source.read(&entry.path()) {
                Ok(t) => t,
                Err(e) => {
                    report
                        .outcomes
                        .push(ScanOutcome::MetadataUnavailable {
                            name,
                            error: e.to_string(),
                        });
                    continue;
                }
            };

            let Some(expires_at) = born_at.checked_add(parsed.duration()) else {
                report.outcomes.push(ScanOutcome::InvalidName {
                    name,
                    rejection: NameRejection::Overflow,
                });
                continue;
            };

            tracked.upsert(name.clone(), expires_at);
            report.outcomes.push(ScanOutcome::Tracked {
                name,
                born_at,
                duration_secs: parsed.duration_secs,
                expires_at,
            });
        }

        report.duration = start.elapsed();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn scanner() -> DirectoryScanner {
        DirectoryScanner::default()
    }

    fn born(path: &Path) -> SystemTime {
        TimestampSource::Created.read(path).unwrap()
    }

    #[test]
    fn tracks_valid_entries_with_creation_plus_duration() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("temp2s")).unwrap();
        fs::create_dir(dir.path().join("temp5m")).unwrap();
        fs::write(dir.path().join("temp1h"), b"plain file").unwrap();

        let mut tracked = TrackedSet::new();
        let report = scanner().scan_and_update(&mut tracked, dir.path()).unwrap();

        assert_eq!(report.entries_listed, 3);
        assert_eq!(report.tracked_count(), 3);
        for (name, secs) in [("temp2s", 2), ("temp5m", 300), ("temp1h", 3_600)] {
            let expected = born(&dir.path().join(name)) + Duration::from_secs(secs);
            assert_eq!(tracked.get(name), Some(expected), "{name}");
        }
    }

    #[test]
    fn ignores_names_without_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("notes")).unwrap();
        fs::create_dir(dir.path().join("Temp5s")).unwrap();

        let mut tracked = TrackedSet::new();
        let report = scanner().scan_and_update(&mut tracked, dir.path()).unwrap();

        assert!(tracked.is_empty());
        assert_eq!(report.ignored, 2);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn invalid_names_are_reported_and_prior_value_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("tempXh")).unwrap();
        fs::create_dir(dir.path().join("temp5d")).unwrap();

        let sentinel = UNIX_EPOCH + Duration::from_secs(42);
        let mut tracked = TrackedSet::new();
        tracked.upsert("tempXh", sentinel);

        let report = scanner().scan_and_update(&mut tracked, dir.path()).unwrap();

        let mut invalid: Vec<&str> = report.invalid_names().collect();
        invalid.sort_unstable();
        assert_eq!(invalid, vec!["temp5d", "tempXh"]);
        assert_eq!(tracked.get("tempXh"), Some(sentinel));
        assert!(!tracked.contains("temp5d"));
    }

    #[test]
    fn rescan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("temp10m")).unwrap();

        let mut tracked = TrackedSet::new();
        scanner().scan_and_update(&mut tracked, dir.path()).unwrap();
        let first = tracked.clone();
        scanner().scan_and_update(&mut tracked, dir.path()).unwrap();
        assert_eq!(tracked, first);
    }

    #[test]
    fn rescan_overwrites_stale_expiration() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("temp1s")).unwrap();

        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1s", UNIX_EPOCH);
        scanner().scan_and_update(&mut tracked, dir.path()).unwrap();

        let expected = born(&dir.path().join("temp1s")) + Duration::from_secs(1);
        assert_eq!(tracked.get("temp1s"), Some(expected));
    }

    #[test]
    fn scan_does_not_drop_entries_missing_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracked = TrackedSet::new();
        tracked.upsert("temp9s", UNIX_EPOCH);

        scanner().scan_and_update(&mut tracked, dir.path()).unwrap();
        assert!(tracked.contains("temp9s"));
    }

    #[test]
    fn scan_is_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("holder").join("temp1s")).unwrap();

        let mut tracked = TrackedSet::new();
        scanner().scan_and_update(&mut tracked, dir.path()).unwrap();
        assert!(tracked.is_empty());
    }

    #[test]
    fn unreadable_directory_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");
        let mut tracked = TrackedSet::new();

        let err = scanner()
            .scan_and_update(&mut tracked, &missing)
            .unwrap_err();
        assert_eq!(err.code(), "TMP-2001");
        assert!(err.to_string().contains("no-such-dir"));
    }

    #[test]
    fn custom_prefix_and_modified_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmp30s");
        fs::write(&path, b"x").unwrap();
        let pinned = filetime::FileTime::from_unix_time(1_000_000, 0);
        filetime::set_file_mtime(&path, pinned).unwrap();

        let scanner =
            DirectoryScanner::new(NamingConvention::new("tmp"), TimestampSource::Modified);
        let mut tracked = TrackedSet::new();
        scanner.scan_and_update(&mut tracked, dir.path()).unwrap();

        assert_eq!(
            tracked.get("tmp30s"),
            Some(UNIX_EPOCH + Duration::from_secs(1_000_030))
        );
    }
}
