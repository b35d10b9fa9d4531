//! Patch Monitor Core Library
//!
//! This library provides the core functionality for the patch agent:
//! - Package-manager detection and pending-update enumeration
//! - Security classification of pending updates
//! - Last-patch-time and reboot-required probes
//! - Snapshot assembly and collector delivery
//! - Exit codes for CLI operations
//!
//! The binary entry point is in `main.rs`.

pub mod collect;
pub mod daemon;
pub mod exit_codes;
pub mod logging;
pub mod transport;
