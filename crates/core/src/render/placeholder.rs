//! Minimal frames for error and disconnected states.

use chrono::{DateTime, Utc};
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};

use inkview_panel::PanelCapabilities;

use super::canvas::{drawn, FrameCanvas, BLACK, DARK};
use super::truncate;

/// Shown when a payload cannot be laid out for the selected view.
pub(super) fn error_frame(caps: &PanelCapabilities, message: &str) -> FrameCanvas {
    frame(
        caps,
        "DISPLAY PROBLEM",
        &[message, "The service keeps running and will retry."],
    )
}

/// Shown after repeated fetch failures instead of silently stale content.
pub(super) fn disconnected_frame(
    caps: &PanelCapabilities,
    last_success: Option<DateTime<Utc>>,
    failures: u32,
) -> FrameCanvas {
    let attempts = format!("No server contact after {} attempts.", failures);
    let last = match last_success {
        Some(at) => format!("Last update: {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => "Last update: never".to_string(),
    };
    frame(
        caps,
        "DISCONNECTED",
        &[&attempts, &last, "Check network and power."],
    )
}

fn frame(caps: &PanelCapabilities, title: &str, lines: &[&str]) -> FrameCanvas {
    let mut canvas = FrameCanvas::new(caps.width, caps.height);
    let width = caps.width as i32;
    let height = caps.height as i32;

    drawn(
        Rectangle::new(
            Point::new(8, 8),
            Size::new(caps.width.saturating_sub(16), caps.height.saturating_sub(16)),
        )
        .into_styled(PrimitiveStyle::with_stroke(BLACK, 2))
        .draw(&mut canvas),
    );

    let title_style = MonoTextStyle::new(&FONT_10X20, BLACK);
    drawn(
        Text::with_alignment(
            title,
            Point::new(width / 2, height / 2 - 40),
            title_style,
            Alignment::Center,
        )
        .draw(&mut canvas),
    );

    let small = MonoTextStyle::new(&FONT_6X10, DARK);
    let max_chars = ((width - 40) / 6).max(0) as usize;
    for (index, line) in lines.iter().enumerate() {
        let text = truncate(line, max_chars);
        drawn(
            Text::with_alignment(
                &text,
                Point::new(width / 2, height / 2 - 8 + index as i32 * 14),
                small,
                Alignment::Center,
            )
            .draw(&mut canvas),
        );
    }
    canvas
}
