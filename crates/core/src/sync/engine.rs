//! Pure retry and present policy, kept out of the loop so it can be unit
//! tested without driving the scheduler.

use chrono::{DateTime, Duration, Utc};

/// Exponential backoff in seconds with a hard ceiling.
///
/// The first failure waits the base interval, each further failure doubles
/// the wait up to the ceiling.
pub fn backoff_seconds(base_secs: u64, consecutive_failures: u32, ceiling_secs: u64) -> u64 {
    const MAX_EXPONENT: u32 = 16;

    let exp = consecutive_failures.saturating_sub(1).min(MAX_EXPONENT);
    base_secs.saturating_mul(1_u64 << exp).min(ceiling_secs)
}

/// The last frame that reached the panel (or was attempted; a hardware
/// failure still advances this marker so recovery is not stuck behind an
/// unchanged hash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedMarker {
    pub hash: String,
    pub at: DateTime<Utc>,
}

/// Why a frame is being pushed to the glass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentReason {
    FirstFrame,
    Changed,
    /// Unchanged content re-presented to counteract ghosting.
    ForcedRefresh,
}

/// Decide whether this cycle's content warrants touching the panel.
/// `None` means skip: no render, no present.
pub fn decide_present(
    new_hash: &str,
    last: Option<&PresentedMarker>,
    forced_refresh: Duration,
    now: DateTime<Utc>,
) -> Option<PresentReason> {
    match last {
        None => Some(PresentReason::FirstFrame),
        Some(marker) if marker.hash != new_hash => Some(PresentReason::Changed),
        Some(marker) if now - marker.at >= forced_refresh => Some(PresentReason::ForcedRefresh),
        Some(_) => None,
    }
}
