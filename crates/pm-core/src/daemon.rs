//! Agent daemon core loop.
//!
//! Library-side primitives for `pm-agent run`: per-cycle orchestration
//! (remote config adoption, version check, collect, deliver), state
//! bookkeeping with a bounded event ring, and stop-flag plumbing for
//! signal-driven shutdown.
//!
//! This module is library-only. The binary owns the forever-loop, the
//! sleep between cycles and the signal registration.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::collect::{CollectOptions, Collection};
use crate::transport::{warn_if_outdated, Collector, RemoteConfig};

/// Floor for any adopted interval; keeps a zero or nonsense remote
/// value from turning the loop hot.
pub const MIN_INTERVAL_SECS: u64 = 60;

/// Delay before retrying after a failed delivery (seconds).
pub const RETRY_DELAY_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the daemon loop.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Interval between collection cycles (seconds). The collector may
    /// override it at runtime via remote config.
    pub interval_secs: u64,
    /// Options applied to every collection cycle.
    pub collect: CollectOptions,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            collect: CollectOptions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Daemon state
// ---------------------------------------------------------------------------

/// A daemon event for telemetry / audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonEvent {
    pub timestamp: String,
    pub event_type: DaemonEventType,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonEventType {
    Started,
    Stopped,
    CycleCompleted,
    DeliveryFailed,
    IntervalChanged,
}

/// Running state of the daemon loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonState {
    pub started_at: String,
    pub cycle_count: u64,
    pub last_cycle_at: Option<String>,
    pub delivered_count: u64,
    pub failed_count: u64,
    /// Effective interval between cycles (seconds).
    pub interval_secs: u64,
    /// Recent events for audit.
    pub recent_events: VecDeque<DaemonEvent>,
}

impl DaemonState {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            started_at: Utc::now().to_rfc3339(),
            cycle_count: 0,
            last_cycle_at: None,
            delivered_count: 0,
            failed_count: 0,
            interval_secs,
            recent_events: VecDeque::with_capacity(100),
        }
    }

    pub fn record_event(&mut self, event_type: DaemonEventType, detail: &str) {
        let event = DaemonEvent {
            timestamp: Utc::now().to_rfc3339(),
            event_type,
            detail: detail.to_string(),
        };
        if self.recent_events.len() >= 100 {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(event);
    }
}

// ---------------------------------------------------------------------------
// Core cycle (synchronous, testable)
// ---------------------------------------------------------------------------

/// Outcome of a single daemon cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub cycle_number: u64,
    pub delivered: bool,
    /// Probes that fell back to empty results during collection.
    pub degradations: Vec<String>,
}

/// Process one daemon cycle: adopt remote settings, collect, deliver.
///
/// This is the core testable unit. Collection is injected so tests can
/// run cycles without touching a package manager; the collector is a
/// trait for the same reason.
pub fn run_cycle<C, F>(state: &mut DaemonState, collector: &C, collect_fn: &mut F) -> CycleOutcome
where
    C: Collector,
    F: FnMut() -> Collection,
{
    state.cycle_count += 1;
    let cycle_number = state.cycle_count;
    state.last_cycle_at = Some(Utc::now().to_rfc3339());

    if let Some(remote) = collector.fetch_remote_config() {
        apply_remote_interval(state, &remote);
    }
    warn_if_outdated(collector);

    let collection = collect_fn();
    let degradations = collection.degradations.clone();
    let report = collection.into_report();

    let delivered = match collector.deliver(&report) {
        Ok(()) => {
            state.delivered_count += 1;
            state.record_event(DaemonEventType::CycleCompleted, &format!("cycle {cycle_number}"));
            info!(cycle = cycle_number, "collection cycle completed");
            true
        }
        Err(e) => {
            state.failed_count += 1;
            state.record_event(DaemonEventType::DeliveryFailed, &e.to_string());
            warn!(cycle = cycle_number, error = %e, "collection cycle failed");
            false
        }
    };

    CycleOutcome {
        cycle_number,
        delivered,
        degradations,
    }
}

/// Delay before the next cycle. A failed delivery retries after a short
/// fixed delay instead of waiting out the full interval.
pub fn next_cycle_delay(state: &DaemonState, outcome: &CycleOutcome) -> Duration {
    if outcome.delivered {
        Duration::from_secs(state.interval_secs)
    } else {
        Duration::from_secs(RETRY_DELAY_SECS)
    }
}

/// Adopt a collector-pushed interval. The wire carries minutes; state
/// keeps seconds. Absent field means keep the current interval.
pub fn apply_remote_interval(state: &mut DaemonState, remote: &RemoteConfig) {
    let Some(minutes) = remote.collection_interval_minutes else {
        return;
    };
    let secs = minutes.saturating_mul(60).max(MIN_INTERVAL_SECS);
    if secs != state.interval_secs {
        info!(
            from = state.interval_secs,
            to = secs,
            "collection interval changed by collector"
        );
        state.record_event(
            DaemonEventType::IntervalChanged,
            &format!("{} -> {} seconds", state.interval_secs, secs),
        );
        state.interval_secs = secs;
    }
}

// ---------------------------------------------------------------------------
// Stop flag and signal plumbing
// ---------------------------------------------------------------------------

static STOP: AtomicBool = AtomicBool::new(false);

pub fn stop_requested() -> bool {
    STOP.load(Ordering::Relaxed)
}

pub fn request_stop() {
    STOP.store(true, Ordering::Relaxed);
}

pub fn clear_stop_request() {
    STOP.store(false, Ordering::Relaxed);
}

/// Route SIGINT and SIGTERM to the stop flag.
#[cfg(unix)]
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, handle_stop_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_stop_signal as libc::sighandler_t);
    }
}

#[cfg(unix)]
extern "C" fn handle_stop_signal(_signal: libc::c_int) {
    STOP.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
pub fn install_signal_handlers() {}

/// Sleep up to `duration`, waking early once a stop is requested.
pub fn sleep_interruptibly(duration: Duration) {
    let mut remaining = duration;
    while !stop_requested() && remaining > Duration::ZERO {
        let chunk = remaining.min(Duration::from_secs(1));
        thread::sleep(chunk);
        remaining = remaining.saturating_sub(chunk);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
