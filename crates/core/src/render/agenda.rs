//! Chronological list of upcoming entries, grouped by day.

use chrono::NaiveDate;
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_9X15_BOLD};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text};

use inkview_api::{ContentItem, ContentPayload};

use super::canvas::{drawn, FrameCanvas, BLACK, DARK};
use super::{minutes_of_day, truncate, RenderError};

const HEADER_H: i32 = 40;
const GROUP_H: i32 = 18;
const LINE_H: i32 = 14;
const MARGIN: i32 = 12;

pub(super) fn draw(
    canvas: &mut FrameCanvas,
    payload: &ContentPayload,
    today: NaiveDate,
) -> Result<(), RenderError> {
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;

    let title = format!("Agenda - {}", today.format("%a, %b %-d"));
    let title_style = MonoTextStyle::new(&FONT_10X20, BLACK);
    drawn(
        Text::with_alignment(
            &title,
            Point::new(width / 2, 26),
            title_style,
            Alignment::Center,
        )
        .draw(canvas),
    );

    // Dated entries sorted by day and start time; undated trail at the end.
    let mut sorted: Vec<&ContentItem> = payload.items.iter().collect();
    sorted.sort_by(|a, b| {
        let key = |item: &ContentItem| {
            (
                item.start_date.is_none(),
                item.start_date,
                item.start_time
                    .as_deref()
                    .and_then(minutes_of_day)
                    .unwrap_or(u32::MAX),
                item.title.clone(),
            )
        };
        key(a).cmp(&key(b))
    });

    let group_style = MonoTextStyle::new(&FONT_9X15_BOLD, BLACK);
    let entry_style = MonoTextStyle::new(&FONT_6X10, BLACK);
    let marker_style = MonoTextStyle::new(&FONT_6X10, DARK);
    let max_chars = ((width - 2 * MARGIN) / 6).max(0) as usize;

    let mut y = HEADER_H + 8;
    let mut current_group: Option<Option<NaiveDate>> = None;
    let mut hidden = 0usize;

    for item in &sorted {
        // A date header plus one entry is the smallest thing worth starting.
        let group = Some(item.start_date);
        let needs_header = current_group != group;
        let needed = if needs_header { GROUP_H + LINE_H } else { LINE_H };
        if y + needed > height - LINE_H {
            hidden += 1;
            continue;
        }

        if needs_header {
            let label = match item.start_date {
                Some(date) => date.format("%A, %B %-d").to_string(),
                None => "Unscheduled".to_string(),
            };
            drawn(
                Text::with_baseline(&label, Point::new(MARGIN, y + 2), group_style, Baseline::Top)
                    .draw(canvas),
            );
            y += GROUP_H;
            current_group = group;
        }

        let time = match (
            item.start_time.as_deref().and_then(minutes_of_day),
            item.end_time.as_deref().and_then(minutes_of_day),
        ) {
            (Some(start), Some(end)) => format!(
                "{:02}:{:02}-{:02}:{:02}",
                start / 60,
                start % 60,
                end / 60,
                end % 60
            ),
            (Some(start), None) => format!("{:02}:{:02}      ", start / 60, start % 60),
            _ => "all day    ".to_string(),
        };
        let mut line = format!("{}  {}", time, item.title);
        if let Some(owner) = item.shared_by.as_deref() {
            line.push_str(&format!(" ({})", owner));
        }
        drawn(
            Text::with_baseline(
                &truncate(&line, max_chars),
                Point::new(MARGIN + 8, y + 2),
                entry_style,
                Baseline::Top,
            )
            .draw(canvas),
        );
        y += LINE_H;
    }

    if hidden > 0 {
        let marker = format!("+{} more", hidden);
        drawn(
            Text::with_baseline(
                &marker,
                Point::new(MARGIN, height - LINE_H),
                marker_style,
                Baseline::Top,
            )
            .draw(canvas),
        );
    }
    Ok(())
}
