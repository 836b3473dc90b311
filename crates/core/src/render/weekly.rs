//! Weekly timetable: seven day columns over an hour grid, with an all-day
//! strip under the day headers.

use chrono::{Datelike, Duration, NaiveDate};
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_9X15_BOLD};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text};

use inkview_api::ContentPayload;

use super::canvas::{drawn, FrameCanvas, BLACK, DARK, LIGHT, WHITE};
use super::{minutes_of_day, truncate, RenderError};

const HEADER_H: i32 = 40;
const DAY_HEADER_H: i32 = 18;
const ALL_DAY_H: i32 = 24;
const TIME_COL_W: i32 = 42;
const FOOTER_H: i32 = 14;
/// Visible hour window; entries outside it count toward the overflow marker.
const FIRST_HOUR: u32 = 8;
const LAST_HOUR: u32 = 24;

pub(super) fn draw(
    canvas: &mut FrameCanvas,
    payload: &ContentPayload,
    today: NaiveDate,
) -> Result<(), RenderError> {
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let week_end = monday + Duration::days(6);

    let title = format!(
        "{} - {}",
        monday.format("%b %-d"),
        week_end.format("%b %-d, %Y")
    );
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

    let grid_top = HEADER_H + DAY_HEADER_H + ALL_DAY_H;
    let grid_bottom = height - FOOTER_H;
    let grid_left = TIME_COL_W;
    let day_w = (width - TIME_COL_W) / 7;

    let day_style = MonoTextStyle::new(&FONT_9X15_BOLD, BLACK);
    let day_style_inverted = MonoTextStyle::new(&FONT_9X15_BOLD, WHITE);
    let small = MonoTextStyle::new(&FONT_6X10, BLACK);
    let small_dark = MonoTextStyle::new(&FONT_6X10, DARK);

    // Day headers; today's column gets an inverted band.
    for day in 0..7i32 {
        let date = monday + Duration::days(i64::from(day));
        let x = grid_left + day * day_w;
        let label = format!("{} {}", date.format("%a"), date.day());
        let center = Point::new(x + day_w / 2, HEADER_H + 14);
        if date == today {
            drawn(
                Rectangle::new(
                    Point::new(x, HEADER_H),
                    Size::new(day_w as u32, DAY_HEADER_H as u32),
                )
                .into_styled(PrimitiveStyle::with_fill(BLACK))
                .draw(canvas),
            );
            drawn(Text::with_alignment(&label, center, day_style_inverted, Alignment::Center).draw(canvas));
        } else {
            drawn(Text::with_alignment(&label, center, day_style, Alignment::Center).draw(canvas));
        }
    }

    // Hour grid.
    let hours = (LAST_HOUR - FIRST_HOUR) as i32;
    let hour_h = (grid_bottom - grid_top) / hours;
    for hour in 0..=hours {
        let y = grid_top + hour * hour_h;
        drawn(
            Line::new(Point::new(grid_left, y), Point::new(width - 1, y))
                .into_styled(PrimitiveStyle::with_stroke(LIGHT, 1))
                .draw(canvas),
        );
        if hour < hours {
            let label = format!("{:02}:00", FIRST_HOUR + hour as u32);
            drawn(
                Text::with_baseline(&label, Point::new(4, y + 2), small_dark, Baseline::Top)
                    .draw(canvas),
            );
        }
    }
    for day in 0..=7i32 {
        let x = grid_left + day * day_w;
        drawn(
            Line::new(Point::new(x, HEADER_H), Point::new(x, grid_bottom))
                .into_styled(PrimitiveStyle::with_stroke(LIGHT, 1))
                .draw(canvas),
        );
    }

    let mut all_day_used = [0u32; 7];
    let mut hidden = 0u32;
    let window_start = FIRST_HOUR * 60;
    let window_end = LAST_HOUR * 60;

    for item in &payload.items {
        let Some(date) = item.start_date else {
            return Err(RenderError::MissingField {
                item: item.title.clone(),
                field: "startDate",
            });
        };
        if date < monday || date > week_end {
            continue;
        }
        let day = (date - monday).num_days() as i32;
        let x = grid_left + day * day_w;

        match item.start_time.as_deref().and_then(minutes_of_day) {
            // Untimed and all-day entries share the strip under the header,
            // two slots per day.
            None => {
                let slot = all_day_used[day as usize];
                all_day_used[day as usize] += 1;
                if slot >= 2 {
                    hidden += 1;
                    continue;
                }
                let y = HEADER_H + DAY_HEADER_H + 1 + slot as i32 * 11;
                let label = truncate(&item.title, ((day_w - 6) / 6).max(0) as usize);
                drawn(
                    Text::with_baseline(&label, Point::new(x + 3, y), small, Baseline::Top)
                        .draw(canvas),
                );
            }
            Some(start_min) => {
                let end_min = item
                    .end_time
                    .as_deref()
                    .and_then(minutes_of_day)
                    .unwrap_or(start_min + 60);
                if end_min <= window_start || start_min >= window_end {
                    hidden += 1;
                    continue;
                }
                let clamped_start = start_min.max(window_start);
                let clamped_end = end_min.min(window_end).max(clamped_start + 15);
                let y0 = grid_top + ((clamped_start - window_start) as i32 * hour_h) / 60;
                let y1 = grid_top + ((clamped_end - window_start) as i32 * hour_h) / 60;
                let box_h = (y1 - y0).max(11) as u32;

                drawn(
                    Rectangle::new(Point::new(x + 1, y0), Size::new((day_w - 2) as u32, box_h))
                        .into_styled(PrimitiveStyle::with_fill(WHITE))
                        .draw(canvas),
                );
                drawn(
                    Rectangle::new(Point::new(x + 1, y0), Size::new((day_w - 2) as u32, box_h))
                        .into_styled(PrimitiveStyle::with_stroke(DARK, 1))
                        .draw(canvas),
                );
                let label = truncate(&item.title, ((day_w - 8) / 6).max(0) as usize);
                drawn(
                    Text::with_baseline(&label, Point::new(x + 4, y0 + 2), small, Baseline::Top)
                        .draw(canvas),
                );
            }
        }
    }

    if hidden > 0 {
        let marker = format!("+{} more", hidden);
        drawn(
            Text::with_baseline(
                &marker,
                Point::new(width - 72, height - FOOTER_H + 2),
                small,
                Baseline::Top,
            )
            .draw(canvas),
        );
    }
    Ok(())
}
