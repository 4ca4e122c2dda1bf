//! Expirer: removes tracked entries whose expiration has passed.
//!
//! Sweep: snapshot expired names (cutoff fixed by the caller's `now`) -> remove
//! each -> classify -> prune the tracked set from the snapshot, never while
//! iterating the set itself.
//!
//! Outcome policy:
//! - removed, or already gone: stop tracking
//! - permission denied, or any other failure: keep tracking, retry next sweep

#![allow(missing_docs)]

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use crate::scanner::tracked::TrackedSet;

// ──────────────────── removal ────────────────────

/// Classified result of one removal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    NotFound,
    PermissionDenied,
    Failed(String),
}

impl RemovalOutcome {
    /// Map an IO error onto the three failure kinds.
    pub fn from_io_error(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Failed(error.to_string()),
        }
    }

    /// Whether the name should leave the tracked set.
    pub const fn stops_tracking(&self) -> bool {
        matches!(self, Self::Removed | Self::NotFound)
    }
}

/// Removes one filesystem object. The seam exists so sweeps can be driven
/// against scripted failures.
pub trait EntryRemover {
    fn remove(&self, path: &Path) -> RemovalOutcome;
}

/// Real filesystem removal: directories recursively, anything else unlinked.
/// Symlinks are removed themselves, never followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl EntryRemover for FsRemover {
    fn remove(&self, path: &Path) -> RemovalOutcome {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) => return RemovalOutcome::from_io_error(&e),
        };

        let removed = if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = removed {
            return RemovalOutcome::from_io_error(&e);
        }

        // Post-removal verification: something may have recreated it.
        if fs::symlink_metadata(path).is_ok() {
            return RemovalOutcome::Failed(format!(
                "path still exists after removal: {}",
                path.display()
            ));
        }
        RemovalOutcome::Removed
    }
}

// ──────────────────── report types ────────────────────

/// Per-entry result of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Deleted { name: String },
    /// Dry run: would have been removed; still tracked.
    WouldDelete { name: String },
    NotFound { name: String },
    PermissionDenied { name: String },
    Failed { name: String, error: String },
}

impl SweepOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Deleted { name }
            | Self::WouldDelete { name }
            | Self::NotFound { name }
            | Self::PermissionDenied { name }
            | Self::Failed { name, .. } => name,
        }
    }
}

/// Summary after one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Tracked entries at or past their expiration when the sweep started.
    pub expired: usize,
    pub items_deleted: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
    pub outcomes: Vec<SweepOutcome>,
    pub duration: Duration,
    pub dry_run: bool,
}

// ──────────────────── expirer ────────────────────

/// Deletes expired entries and prunes the tracked set.
#[derive(Debug, Clone, Default)]
pub struct Expirer<R = FsRemover> {
    remover: R,
    dry_run: bool,
}

impl Expirer<FsRemover> {
    pub fn new(dry_run: bool) -> Self {
        Self::with_remover(FsRemover, dry_run)
    }
}

impl<R: EntryRemover> Expirer<R> {
    pub fn with_remover(remover: R, dry_run: bool) -> Self {
        Self { remover, dry_run }
    }

    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Remove every tracked entry with `expiration <= now` from `watch_dir`.
    ///
    /// Each expired name is attempted exactly once. Entries not yet expired are
    /// not touched, on disk or in the set.
    pub fn delete_expired(
        &self,
        tracked: &mut TrackedSet,
        watch_dir: &Path,
        now: SystemTime,
    ) -> SweepReport {
        let start = Instant::now();
        let expired = tracked.expired_at(now);
        let mut report = SweepReport {
            expired: expired.len(),
            dry_run: self.dry_run,
            ..SweepReport::default()
        };

        for name in expired {
            if self.dry_run {
                report.items_skipped += 1;
                report.outcomes.push(SweepOutcome::WouldDelete { name });
                continue;
            }

            let outcome = self.remover.remove(&watch_dir.join(&name));
            if outcome.stops_tracking() {
                tracked.remove(&name);
            }

            let entry = match outcome {
                RemovalOutcome::Removed => {
                    report.items_deleted += 1;
                    SweepOutcome::Deleted { name }
                }
                RemovalOutcome::NotFound => {
                    report.items_skipped += 1;
                    SweepOutcome::NotFound { name }
                }
                RemovalOutcome::PermissionDenied => {
                    report.items_skipped += 1;
                    SweepOutcome::PermissionDenied { name }
                }
                RemovalOutcome::Failed(error) => {
                    report.items_failed += 1;
                    SweepOutcome::Failed { name, error }
                }
            };
            report.outcomes.push(entry);
        }

        report.duration = start.elapsed();
        report
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::UNIX_EPOCH;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// Remover that replays scripted outcomes per file name and records calls.
    #[derive(Default)]
    struct ScriptedRemover {
        script: RefCell<HashMap<String, Vec<RemovalOutcome>>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedRemover {
        fn script(self, name: &str, outcomes: Vec<RemovalOutcome>) -> Self {
            self.script.borrow_mut().insert(name.to_string(), outcomes);
            self
        }
    }

    impl EntryRemover for ScriptedRemover {
        fn remove(&self, path: &Path) -> RemovalOutcome {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.borrow_mut().push(name.clone());
            let mut script = self.script.borrow_mut();
            match script.get_mut(&name) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => RemovalOutcome::Removed,
            }
        }
    }

    #[test]
    fn io_errors_map_to_three_kinds() {
        assert_eq!(
            RemovalOutcome::from_io_error(&io::Error::from(io::ErrorKind::NotFound)),
            RemovalOutcome::NotFound
        );
        assert_eq!(
            RemovalOutcome::from_io_error(&io::Error::from(io::ErrorKind::PermissionDenied)),
            RemovalOutcome::PermissionDenied
        );
        assert!(matches!(
            RemovalOutcome::from_io_error(&io::Error::other("device busy")),
            RemovalOutcome::Failed(msg) if msg.contains("device busy")
        ));
    }

    #[test]
    fn removes_directory_trees_and_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("temp1s");
        fs::create_dir_all(tree.join("nested").join("deeper")).unwrap();
        fs::write(tree.join("nested").join("f.txt"), b"data").unwrap();
        let file = dir.path().join("temp2s");
        fs::write(&file, b"data").unwrap();

        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1s", at(1));
        tracked.upsert("temp2s", at(2));

        let report = Expirer::new(false).delete_expired(&mut tracked, dir.path(), at(10));

        assert_eq!(report.items_deleted, 2);
        assert!(tracked.is_empty());
        assert!(!tree.exists());
        assert!(!file.exists());
    }

    #[test]
    #[cfg(unix)]
    fn symlink_is_removed_not_its_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("keep");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("precious"), b"data").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("temp1s")).unwrap();

        let outcome = FsRemover.remove(&dir.path().join("temp1s"));
        assert_eq!(outcome, RemovalOutcome::Removed);
        assert!(target.join("precious").exists());
    }

    #[test]
    fn unexpired_entries_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp1h");
        fs::create_dir(&path).unwrap();

        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1h", at(3_600));

        let report = Expirer::new(false).delete_expired(&mut tracked, dir.path(), at(3_599));
        assert_eq!(report.expired, 0);
        assert!(report.outcomes.is_empty());
        assert!(path.exists());
        assert_eq!(tracked.get("temp1h"), Some(at(3_600)));
    }

    #[test]
    fn cutoff_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("temp1s")).unwrap();
        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1s", at(100));

        let report = Expirer::new(false).delete_expired(&mut tracked, dir.path(), at(100));
        assert_eq!(report.items_deleted, 1);
        assert!(tracked.is_empty());
    }

    #[test]
    fn vanished_entry_is_dropped_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracked = TrackedSet::new();
        tracked.upsert("temp10m", at(600));

        let report = Expirer::new(false).delete_expired(&mut tracked, dir.path(), at(601));
        assert_eq!(
            report.outcomes,
            vec![SweepOutcome::NotFound {
                name: "temp10m".to_string()
            }]
        );
        assert_eq!(report.items_failed, 0);
        assert!(tracked.is_empty());
    }

    #[test]
    fn permission_denied_is_retried_until_it_succeeds() {
        let remover = ScriptedRemover::default().script(
            "temp1s",
            vec![
                RemovalOutcome::PermissionDenied,
                RemovalOutcome::PermissionDenied,
                RemovalOutcome::Removed,
            ],
        );
        let expirer = Expirer::with_remover(remover, false);
        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1s", at(1));
        let dir = Path::new("/watched");

        for _ in 0..2 {
            let report = expirer.delete_expired(&mut tracked, dir, at(5));
            assert!(matches!(
                report.outcomes.as_slice(),
                [SweepOutcome::PermissionDenied { .. }]
            ));
            assert!(tracked.contains("temp1s"));
        }

        let report = expirer.delete_expired(&mut tracked, dir, at(5));
        assert_eq!(report.items_deleted, 1);
        assert!(!tracked.contains("temp1s"));
        assert_eq!(expirer.remover.calls.borrow().len(), 3);
    }

    #[test]
    fn other_failures_keep_tracking_with_detail() {
        let remover = ScriptedRemover::default().script(
            "temp1s",
            vec![RemovalOutcome::Failed("resource busy".to_string())],
        );
        let expirer = Expirer::with_remover(remover, false);
        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1s", at(1));

        let report = expirer.delete_expired(&mut tracked, Path::new("/watched"), at(2));
        assert_eq!(report.items_failed, 1);
        assert_eq!(
            report.outcomes,
            vec![SweepOutcome::Failed {
                name: "temp1s".to_string(),
                error: "resource busy".to_string()
            }]
        );
        assert!(tracked.contains("temp1s"));
    }

    #[test]
    fn each_expired_entry_is_attempted_once_per_sweep() {
        let expirer = Expirer::with_remover(ScriptedRemover::default(), false);
        let mut tracked: TrackedSet = (0..5)
            .map(|i| (format!("temp{i}s"), at(i)))
            .chain(std::iter::once(("temp99s".to_string(), at(99))))
            .collect();

        let report = expirer.delete_expired(&mut tracked, Path::new("/watched"), at(10));
        let mut calls = expirer.remover.calls.borrow().clone();
        calls.sort();
        assert_eq!(calls, vec!["temp0s", "temp1s", "temp2s", "temp3s", "temp4s"]);
        assert_eq!(report.expired, 5);
        assert_eq!(tracked.len(), 1);
        assert!(tracked.contains("temp99s"));
    }

    #[test]
    fn dry_run_reports_without_removing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp1s");
        fs::create_dir(&path).unwrap();
        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1s", at(1));

        let report = Expirer::new(true).delete_expired(&mut tracked, dir.path(), at(5));
        assert!(report.dry_run);
        assert_eq!(
            report.outcomes,
            vec![SweepOutcome::WouldDelete {
                name: "temp1s".to_string()
            }]
        );
        assert!(path.exists());
        assert!(tracked.contains("temp1s"));
    }

    #[test]
    #[cfg(unix)]
    fn read_only_parent_yields_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let watched = dir.path().join("watched");
        fs::create_dir(&watched).unwrap();
        fs::create_dir(watched.join("temp1s")).unwrap();
        fs::set_permissions(&watched, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users (root in CI containers) bypass directory permissions.
        if fs::write(watched.join("probe"), b"x").is_ok() {
            let _ = fs::remove_file(watched.join("probe"));
            fs::set_permissions(&watched, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut tracked = TrackedSet::new();
        tracked.upsert("temp1s", at(1));
        let report = Expirer::new(false).delete_expired(&mut tracked, &watched, at(2));

        fs::set_permissions(&watched, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(
            report.outcomes.as_slice(),
            [SweepOutcome::PermissionDenied { .. }]
        ));
        assert!(tracked.contains("temp1s"));
    }
}
