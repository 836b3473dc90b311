//! Sync loop: poll, decide, render, present.

mod diagnostics;
mod engine;
mod scheduler;

pub use diagnostics::{CycleOutcome, CycleReport, Diagnostics, SyncState};
pub use engine::{backoff_seconds, decide_present, PresentReason, PresentedMarker};
pub use scheduler::Scheduler;
