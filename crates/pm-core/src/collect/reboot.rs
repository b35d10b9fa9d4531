//! Reboot-required detection.
//!
//! Marker files are authoritative for every manager family. When no
//! marker exists on an APT host, the installed kernel images are
//! compared against the running kernel as a fallback; the other
//! families have no such fallback.

use std::path::Path;

use pm_common::ManagerKind;
use tracing::{debug, error};

use super::runner::CommandRunner;
use super::{require_success, ProbeError};

/// Sentinels dropped by package tooling when a reboot is pending.
const REBOOT_MARKERS: &[&str] = &[
    "/var/run/reboot-required",
    "/var/run/reboot-required.pkgs",
];

/// Whether the host needs a reboot to finish applying updates.
///
/// Failures inside the kernel cross-check are logged and resolve to
/// false; this probe never aborts a cycle.
pub fn needs_reboot(runner: &CommandRunner, kind: ManagerKind) -> bool {
    if markers_present(REBOOT_MARKERS) {
        return true;
    }

    if kind == ManagerKind::Apt {
        match apt_kernel_pending(runner) {
            Ok(pending) => return pending,
            Err(e) => {
                error!(error = %e, "failed to check reboot status");
                return false;
            }
        }
    }

    false
}

fn markers_present<P: AsRef<Path>>(markers: &[P]) -> bool {
    markers.iter().any(|marker| marker.as_ref().exists())
}

/// Compare installed `linux-image-*` packages to the running kernel.
fn apt_kernel_pending(runner: &CommandRunner) -> Result<bool, ProbeError> {
    let uname = require_success(runner.run("uname", &["-r"])?, "uname -r")?;
    let running = uname.stdout_str().trim().to_string();

    let dpkg = require_success(
        runner.run("dpkg", &["-l", "linux-image-*"])?,
        "dpkg -l linux-image-*",
    )?;

    let pending = kernel_mismatch(&running, &dpkg.stdout_str());
    if pending {
        debug!(running, "installed kernel differs from running kernel");
    }
    Ok(pending)
}

/// True when any installed kernel-image row names a version other than
/// the running release.
///
/// Rows are recognized by the `ii` state and a `linux-image-` package
/// token; the version is the package name with that prefix stripped.
/// Malformed rows are skipped.
pub fn kernel_mismatch(running: &str, dpkg_output: &str) -> bool {
    for line in dpkg_output.lines() {
        if !line.contains("ii") || !line.contains("linux-image-") {
            continue;
        }
        let Some(package) = line.split_whitespace().nth(1) else {
            continue;
        };
        let version = package.replace("linux-image-", "");
        if version != running {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const DPKG_SINGLE_KERNEL: &str = "\
Desired=Unknown/Install/Remove/Purge/Hold
| Status=Not/Inst/Conf-files/Unpacked/halF-conf/Half-inst/trig-aWait/Trig-pend
|/ Name                                 Version              Architecture Description
+++-====================================-====================-============-===========
ii  linux-image-5.15.0-91-generic       5.15.0-91.101        amd64        Signed kernel image generic
";

    const DPKG_TWO_KERNELS: &str = "\
ii  linux-image-5.15.0-91-generic       5.15.0-91.101        amd64        Signed kernel image generic
ii  linux-image-5.15.0-92-generic       5.15.0-92.102        amd64        Signed kernel image generic
";

    #[test]
    fn test_running_kernel_matches_installed() {
        assert!(!kernel_mismatch("5.15.0-91-generic", DPKG_SINGLE_KERNEL));
    }

    #[test]
    fn test_newer_installed_kernel_detected() {
        assert!(kernel_mismatch("5.15.0-91-generic", DPKG_TWO_KERNELS));
    }

    #[test]
    fn test_metapackage_reads_as_mismatch() {
        // linux-image-generic strips to "generic", which never equals a
        // kernel release string.
        let dpkg = "ii  linux-image-generic  5.15.0.91.88  amd64  Generic Linux kernel image\n";
        assert!(kernel_mismatch("5.15.0-91-generic", dpkg));
    }

    #[test]
    fn test_removed_kernels_ignored() {
        let dpkg = "rc  linux-image-5.15.0-89-generic  5.15.0-89.99  amd64  Signed kernel image generic\n";
        assert!(!kernel_mismatch("5.15.0-91-generic", dpkg));
    }

    #[test]
    fn test_empty_listing() {
        assert!(!kernel_mismatch("5.15.0-91-generic", ""));
    }

    #[test]
    fn test_markers_present() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("reboot-required");
        let missing = dir.path().join("reboot-required.pkgs");

        assert!(!markers_present(&[&marker, &missing]));

        std::fs::write(&marker, "").unwrap();
        assert!(markers_present(&[&marker, &missing]));
        assert!(markers_present(&[&missing, &marker]));
    }
}
