//! Content renderer: payload to deterministic bitmap frame.
//!
//! Identical `(payload, view, capabilities, today)` inputs always produce
//! bit-identical canvases. That determinism is what makes the scheduler's
//! content-hash comparison a valid proxy for "did the picture change":
//! layouts use the built-in mono fonts only and never read the clock.

mod agenda;
mod canvas;
mod monthly;
mod placeholder;
mod weekly;
mod yearly;

pub use canvas::FrameCanvas;

use chrono::{DateTime, NaiveDate, Utc};
use inkview_api::{ContentPayload, ViewType};
use inkview_panel::PanelCapabilities;
use log::warn;
use thiserror::Error;

/// Rendering failures. Recovered locally with a placeholder frame, never
/// propagated as a cycle failure.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("entry '{item}' is missing required field {field}")]
    MissingField { item: String, field: &'static str },
}

/// A frame ready for packing, tagged with the fingerprint of the content
/// that produced it. Exactly one last-presented frame is retained by the
/// scheduler at a time.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub canvas: FrameCanvas,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
}

/// Render the payload for the given view.
///
/// A payload that is structurally incompatible with the view falls back to
/// an error placeholder frame; the cycle still presents something.
pub fn render(
    payload: &ContentPayload,
    view: ViewType,
    caps: &PanelCapabilities,
    today: NaiveDate,
) -> RenderedFrame {
    let mut canvas = FrameCanvas::new(caps.width, caps.height);
    let result = match view {
        ViewType::Weekly => weekly::draw(&mut canvas, payload, today),
        ViewType::Monthly => monthly::draw(&mut canvas, payload, today),
        ViewType::Yearly => yearly::draw(&mut canvas, payload, today),
        ViewType::Agenda => agenda::draw(&mut canvas, payload, today),
    };
    if let Err(err) = result {
        warn!("Render failed for {:?} view, using placeholder: {}", view, err);
        canvas = placeholder::error_frame(caps, &err.to_string());
    }
    RenderedFrame {
        canvas,
        content_hash: payload.content_hash(),
        generated_at: Utc::now(),
    }
}

/// Frame shown after repeated fetch failures, so the panel never keeps
/// stale content without warning.
pub fn disconnected(
    caps: &PanelCapabilities,
    last_success: Option<DateTime<Utc>>,
    failures: u32,
) -> RenderedFrame {
    let canvas = placeholder::disconnected_frame(caps, last_success, failures);
    RenderedFrame {
        canvas,
        content_hash: format!(
            "disconnected:{}",
            last_success.map(|t| t.timestamp()).unwrap_or(0)
        ),
        generated_at: Utc::now(),
    }
}

/// Shorten to `max_chars`, marking the cut so nothing is dropped silently.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Parse "HH:MM" / "HH:MM:SS" into minutes since midnight.
pub(crate) fn minutes_of_day(time: &str) -> Option<u32> {
    let mut parts = time.splitn(3, ':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    if hours > 24 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}
