//! Patch Monitor common types, errors, and wire payloads.
//!
//! This crate provides foundational types shared across pm-core modules:
//! - The canonical patch-state data model (snapshot, pending updates)
//! - The agent report payload posted to the collector
//! - Common error types with stable codes and categories
//! - Output format specifications

pub mod error;
pub mod model;
pub mod output;

pub use error::{Error, ErrorCategory, Result};
pub use model::{
    AgentReport, HostFacts, ManagerKind, PatchSnapshot, PendingUpdate, UpdateType,
};
pub use output::OutputFormat;

/// Agent version reported to the collector in every payload.
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
