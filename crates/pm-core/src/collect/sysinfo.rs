//! Host identity facts.
//!
//! Everything here reads procfs or os-release; no commands are spawned.
//! Each fact degrades independently, so a locked-down container still
//! produces a report with whatever could be read.

use std::env;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use pm_common::HostFacts;
use tracing::debug;

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";
const KERNEL_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";
const STAT_PATH: &str = "/proc/stat";
const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Collect the host facts that accompany every report.
///
/// Undeterminable facts flatten to empty strings, matching the wire
/// contract for degraded fields.
pub fn host_facts() -> HostFacts {
    let os = os_release();
    HostFacts {
        hostname: hostname().unwrap_or_default(),
        os_name: os.name.unwrap_or_default(),
        os_version: os.version.unwrap_or_default(),
        architecture: env::consts::ARCH.to_string(),
        kernel_version: kernel_version().unwrap_or_default(),
        last_boot_time: boot_time(),
    }
}

pub fn hostname() -> Option<String> {
    read_trimmed(Path::new(HOSTNAME_PATH)).or_else(|| env::var("HOSTNAME").ok())
}

pub fn kernel_version() -> Option<String> {
    read_trimmed(Path::new(KERNEL_RELEASE_PATH))
}

/// Boot time from the `btime` field of /proc/stat.
pub fn boot_time() -> Option<DateTime<Utc>> {
    let stat = read_trimmed(Path::new(STAT_PATH))?;
    parse_btime(&stat).and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Distribution name and version from os-release, trying the standard
/// locations in order.
pub fn os_release() -> OsRelease {
    for path in OS_RELEASE_PATHS {
        match fs::read_to_string(path) {
            Ok(content) => return parse_os_release(&content),
            Err(e) => debug!(path, error = %e, "os-release not readable"),
        }
    }
    OsRelease::default()
}

/// Parse os-release key=value lines; values may be quoted.
pub fn parse_os_release(content: &str) -> OsRelease {
    let mut release = OsRelease::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        match key.trim() {
            "NAME" => release.name = Some(value.to_string()),
            "VERSION_ID" => release.version = Some(value.to_string()),
            _ => {}
        }
    }

    release
}

/// Extract the boot timestamp (seconds since the epoch) from
/// /proc/stat content.
pub fn parse_btime(stat: &str) -> Option<i64> {
    for line in stat.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() == Some("btime") {
            return fields.next().and_then(|v| v.parse().ok());
        }
    }
    None
}

fn read_trimmed(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "fact not readable");
            None
        }
    }
}
