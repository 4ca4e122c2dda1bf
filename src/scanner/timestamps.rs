//! Which filesystem timestamp an entry's lifetime is counted from.
//!
//! Platform caveat: "creation" is only a true birth time where the platform and
//! filesystem report one (statx on Linux, APFS/NTFS). Elsewhere `Created` falls
//! back to the inode status-change time on Unix and the modification time on
//! other platforms. Status-change time moves on chmod/rename, so an expiration
//! computed from it can drift between scans.

#![allow(missing_docs)]

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    /// Birth time, with the platform fallback described in the module docs.
    #[default]
    Created,
    /// Inode status-change time (Unix `st_ctime`).
    Changed,
    /// Last content modification time.
    Modified,
}

impl fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Changed => "changed",
            Self::Modified => "modified",
        })
    }
}

impl FromStr for TimestampSource {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" | "creation" | "birth" => Ok(Self::Created),
            "changed" | "ctime" => Ok(Self::Changed),
            "modified" | "mtime" => Ok(Self::Modified),
            other => Err(format!(
                "unknown timestamp source {other:?} (expected created, changed or modified)"
            )),
        }
    }
}

impl TimestampSource {
    /// Read this timestamp for the entry itself (symlinks are not followed).
    pub fn read(self, path: &Path) -> io::Result<SystemTime> {
        let meta = std::fs::symlink_metadata(path)?;
        self.of_metadata(&meta)
    }

    pub fn of_metadata(self, meta: &Metadata) -> io::Result<SystemTime> {
        match self {
            Self::Created => meta.created().or_else(|_| status_change_time(meta)),
            Self::Changed => status_change_time(meta),
            Self::Modified => meta.modified(),
        }
    }
}

#[cfg(unix)]
fn status_change_time(meta: &Metadata) -> io::Result<SystemTime> {
    use std::os::unix::fs::MetadataExt;

    let secs = meta.ctime();
    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    let since_epoch = Duration::new(secs.unsigned_abs(), nanos);
    let stamp = if secs >= 0 {
        UNIX_EPOCH.checked_add(since_epoch)
    } else {
        UNIX_EPOCH.checked_sub(since_epoch)
    };
    stamp.ok_or_else(|| io::Error::other(format!("ctime out of range: {secs}")))
}

#[cfg(not(unix))]
fn status_change_time(meta: &Metadata) -> io::Result<SystemTime> {
    meta.modified()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("created".parse::<TimestampSource>(), Ok(TimestampSource::Created));
        assert_eq!("CTIME".parse::<TimestampSource>(), Ok(TimestampSource::Changed));
        assert_eq!(" mtime ".parse::<TimestampSource>(), Ok(TimestampSource::Modified));
        assert!("atime".parse::<TimestampSource>().is_err());
    }

    #[test]
    fn display_matches_serde_name() {
        for source in [
            TimestampSource::Created,
            TimestampSource::Changed,
            TimestampSource::Modified,
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{source}\""));
        }
    }

    #[test]
    fn every_source_reads_a_plausible_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp5s");
        std::fs::create_dir(&path).unwrap();
        let now = SystemTime::now();

        for source in [
            TimestampSource::Created,
            TimestampSource::Changed,
            TimestampSource::Modified,
        ] {
            let stamp = source.read(&path).unwrap();
            let skew = now
                .duration_since(stamp)
                .unwrap_or_else(|e| e.duration());
            assert!(skew < Duration::from_secs(60), "{source}: {skew:?}");
        }
    }

    #[test]
    fn reading_twice_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp5s");
        std::fs::write(&path, b"x").unwrap();
        let a = TimestampSource::Created.read(&path).unwrap();
        let b = TimestampSource::Created.read(&path).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = TimestampSource::Created
            .read(&dir.path().join("gone"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
