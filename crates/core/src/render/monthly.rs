//! Month grid, one cell per day with entry titles.

use chrono::{Datelike, NaiveDate};
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_9X15_BOLD};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text};

use inkview_api::{ContentItem, ContentPayload};

use super::canvas::{drawn, FrameCanvas, BLACK, DARK, LIGHT, WHITE};
use super::{truncate, RenderError};

const HEADER_H: i32 = 40;
const WEEKDAY_H: i32 = 16;
const LINE_H: i32 = 11;
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub(super) fn draw(
    canvas: &mut FrameCanvas,
    payload: &ContentPayload,
    today: NaiveDate,
) -> Result<(), RenderError> {
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;

    let first = today.with_day(1).unwrap_or(today);
    let days_in_month = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28);
    let offset = first.weekday().num_days_from_monday() as i32;
    let rows = (offset + days_in_month as i32 + 6) / 7;

    let title_style = MonoTextStyle::new(&FONT_10X20, BLACK);
    let title = first.format("%B %Y").to_string();
    drawn(
        Text::with_alignment(
            &title,
            Point::new(width / 2, 26),
            title_style,
            Alignment::Center,
        )
        .draw(canvas),
    );

    let grid_top = HEADER_H + WEEKDAY_H;
    let cell_w = width / 7;
    let cell_h = (height - grid_top) / rows;

    let weekday_style = MonoTextStyle::new(&FONT_9X15_BOLD, DARK);
    for (col, name) in WEEKDAYS.iter().enumerate() {
        drawn(
            Text::with_alignment(
                name,
                Point::new(col as i32 * cell_w + cell_w / 2, HEADER_H + 12),
                weekday_style,
                Alignment::Center,
            )
            .draw(canvas),
        );
    }

    for row in 0..=rows {
        let y = grid_top + row * cell_h;
        drawn(
            Line::new(Point::new(0, y), Point::new(width - 1, y))
                .into_styled(PrimitiveStyle::with_stroke(LIGHT, 1))
                .draw(canvas),
        );
    }
    for col in 0..=7 {
        let x = (col * cell_w).min(width - 1);
        drawn(
            Line::new(Point::new(x, grid_top), Point::new(x, grid_top + rows * cell_h))
                .into_styled(PrimitiveStyle::with_stroke(LIGHT, 1))
                .draw(canvas),
        );
    }

    // Bucket entries by day of month; entries without a date cannot be
    // placed on the grid at all.
    let mut by_day: Vec<Vec<&ContentItem>> = vec![Vec::new(); days_in_month as usize];
    for item in &payload.items {
        let Some(date) = item.start_date else {
            return Err(RenderError::MissingField {
                item: item.title.clone(),
                field: "startDate",
            });
        };
        if date.year() == first.year() && date.month() == first.month() {
            by_day[(date.day() - 1) as usize].push(item);
        }
    }

    let number_style = MonoTextStyle::new(&FONT_9X15_BOLD, BLACK);
    let number_style_inverted = MonoTextStyle::new(&FONT_9X15_BOLD, WHITE);
    let entry_style = MonoTextStyle::new(&FONT_6X10, BLACK);
    let marker_style = MonoTextStyle::new(&FONT_6X10, DARK);

    for day in 1..=days_in_month {
        let index = offset + day as i32 - 1;
        let x = (index % 7) * cell_w;
        let y = grid_top + (index / 7) * cell_h;

        let number = format!("{}", day);
        if day == today.day() {
            drawn(
                Rectangle::new(Point::new(x + 2, y + 2), Size::new(20, 14))
                    .into_styled(PrimitiveStyle::with_fill(BLACK))
                    .draw(canvas),
            );
            drawn(
                Text::with_baseline(
                    &number,
                    Point::new(x + 4, y + 2),
                    number_style_inverted,
                    Baseline::Top,
                )
                .draw(canvas),
            );
        } else {
            drawn(
                Text::with_baseline(&number, Point::new(x + 4, y + 2), number_style, Baseline::Top)
                    .draw(canvas),
            );
        }

        let entries = &by_day[(day - 1) as usize];
        let capacity = (((cell_h - 18) / LINE_H).max(0)) as usize;
        if capacity == 0 {
            continue;
        }
        // Reserve the last line for the overflow marker when entries do not fit.
        let shown = if entries.len() > capacity {
            capacity - 1
        } else {
            entries.len()
        };
        let max_chars = ((cell_w - 6) / 6).max(0) as usize;
        for (slot, item) in entries.iter().take(shown).enumerate() {
            let label = truncate(&item.title, max_chars);
            drawn(
                Text::with_baseline(
                    &label,
                    Point::new(x + 3, y + 18 + slot as i32 * LINE_H),
                    entry_style,
                    Baseline::Top,
                )
                .draw(canvas),
            );
        }
        if entries.len() > shown {
            let marker = format!("+{} more", entries.len() - shown);
            drawn(
                Text::with_baseline(
                    &marker,
                    Point::new(x + 3, y + 18 + shown as i32 * LINE_H),
                    marker_style,
                    Baseline::Top,
                )
                .draw(canvas),
            );
        }
    }
    Ok(())
}
