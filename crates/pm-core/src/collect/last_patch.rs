//! Last-patch-time probe.
//!
//! Each manager family leaves one characteristic path behind whose
//! modification time tracks the last package operation. The probe
//! reads that mtime; it never runs a command. YUM hosts are probed at
//! the DNF history path, matching how modern YUM is packaged.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use pm_common::ManagerKind;
use tracing::debug;

/// The path whose mtime stands in for "last patched" on this family.
pub fn history_path(kind: ManagerKind) -> Option<&'static str> {
    match kind {
        ManagerKind::Apt => Some("/var/lib/apt/lists/"),
        ManagerKind::DnfYum => Some("/var/lib/dnf/history/"),
        ManagerKind::Zypper => Some("/var/log/zypp/history"),
        ManagerKind::Pacman => Some("/var/log/pacman.log"),
        ManagerKind::Unknown => None,
    }
}

/// Probe the last patch time for the detected manager.
///
/// A missing path or permission error resolves to `None`; the cycle
/// carries on without a timestamp.
pub fn last_patch_time(kind: ManagerKind) -> Option<DateTime<Utc>> {
    let path = history_path(kind)?;
    match path_mtime(Path::new(path)) {
        Ok(mtime) => Some(mtime),
        Err(e) => {
            debug!(path, error = %e, "could not determine last patch time");
            None
        }
    }
}

/// Modification time of `path` as a UTC timestamp.
pub fn path_mtime(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;

    #[test]
    fn test_history_paths() {
        assert_eq!(history_path(ManagerKind::Apt), Some("/var/lib/apt/lists/"));
        assert_eq!(
            history_path(ManagerKind::DnfYum),
            Some("/var/lib/dnf/history/")
        );
        assert_eq!(
            history_path(ManagerKind::Zypper),
            Some("/var/log/zypp/history")
        );
        assert_eq!(
            history_path(ManagerKind::Pacman),
            Some("/var/log/pacman.log")
        );
        assert_eq!(history_path(ManagerKind::Unknown), None);
    }

    #[test]
    fn test_path_mtime_reads_known_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("history");
        std::fs::write(&file, "log").unwrap();
        filetime::set_file_mtime(&file, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

        let mtime = path_mtime(&file).unwrap();
        assert_eq!(mtime.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_path_mtime_works_on_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(path_mtime(dir.path()).is_ok());
    }

    #[test]
    fn test_path_mtime_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(path_mtime(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_unknown_manager_has_no_timestamp() {
        assert_eq!(last_patch_time(ManagerKind::Unknown), None);
    }
}
