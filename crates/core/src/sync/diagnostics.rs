//! Cycle outcome bookkeeping. Observational only: the scheduler makes every
//! control-flow decision, this is the single source of truth for external
//! health queries (the per-cycle log line and shutdown summary).

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

/// What a cycle ended as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Fresh content (or a placeholder) reached the panel.
    Presented,
    /// Content unchanged, panel untouched.
    Skipped,
    /// Content fetched but the panel present failed; still polling normally.
    Degraded,
    /// Transport-level fetch failure.
    Network,
    /// Response body did not match the expected schema.
    Protocol,
    /// Token rejected by the server.
    Unauthorized,
}

impl CycleOutcome {
    /// Did this cycle deliver content (fetch succeeded)?
    pub fn is_success(self) -> bool {
        matches!(self, Self::Presented | Self::Skipped | Self::Degraded)
    }
}

/// Snapshot of the loop's health, serializable for the status log line.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_presented_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub current_backoff_secs: u64,
    pub unauthorized: bool,
    pub last_outcome: Option<CycleOutcome>,
    pub cycles: u64,
}

/// One cycle's result, as reported by the scheduler.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub at: DateTime<Utc>,
    pub duration_ms: i64,
    /// Wait until the next cycle, after this one.
    pub next_wait_secs: u64,
    pub consecutive_failures: u32,
}

/// Shareable, read-mostly view of [`SyncState`].
#[derive(Clone, Default)]
pub struct Diagnostics {
    inner: Arc<RwLock<SyncState>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished cycle and emit the health log line.
    pub fn record(&self, report: CycleReport) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.cycles += 1;
        state.last_outcome = Some(report.outcome);
        state.consecutive_failures = report.consecutive_failures;
        state.current_backoff_secs = report.next_wait_secs;
        if report.outcome.is_success() {
            state.last_success_at = Some(report.at);
            state.unauthorized = false;
        }
        if report.outcome == CycleOutcome::Unauthorized {
            state.unauthorized = true;
        }
        if report.outcome == CycleOutcome::Presented {
            state.last_presented_at = Some(report.at);
        }

        info!(
            "cycle {}: {:?} in {}ms (failures={}, next wait {}s)",
            state.cycles,
            report.outcome,
            report.duration_ms,
            report.consecutive_failures,
            report.next_wait_secs
        );
    }

    pub fn snapshot(&self) -> SyncState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
