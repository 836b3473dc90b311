//! Year overview, twelve mini month grids with activity shading.

use chrono::{Datelike, NaiveDate};
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_9X15_BOLD};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};

use inkview_api::ContentPayload;

use super::canvas::{drawn, FrameCanvas, BLACK, DARK, LIGHT, WHITE};
use super::RenderError;

const HEADER_H: i32 = 36;
const MARGIN: i32 = 8;
const MONTH_COLS: i32 = 4;
const MONTH_ROWS: i32 = 3;
const MONTH_NAME_H: i32 = 18;
const DAY_HEADER_H: i32 = 12;
const DAY_LETTERS: [&str; 7] = ["M", "T", "W", "T", "F", "S", "S"];

pub(super) fn draw(
    canvas: &mut FrameCanvas,
    payload: &ContentPayload,
    today: NaiveDate,
) -> Result<(), RenderError> {
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;
    let year = today.year();

    // Days with at least one entry get a shaded cell. Index 0 is unused so
    // day numbers address the array directly.
    let mut busy = [[false; 32]; 12];
    for item in &payload.items {
        let Some(date) = item.start_date else {
            return Err(RenderError::MissingField {
                item: item.title.clone(),
                field: "startDate",
            });
        };
        if date.year() == year {
            busy[(date.month() - 1) as usize][date.day() as usize] = true;
        }
    }

    let title_style = MonoTextStyle::new(&FONT_10X20, BLACK);
    let title = format!("{}", year);
    drawn(
        Text::with_alignment(&title, Point::new(width / 2, 24), title_style, Alignment::Center)
            .draw(canvas),
    );

    let month_w = (width - 2 * MARGIN) / MONTH_COLS;
    let month_h = (height - HEADER_H - MARGIN) / MONTH_ROWS;

    let name_style = MonoTextStyle::new(&FONT_9X15_BOLD, BLACK);
    let letter_style = MonoTextStyle::new(&FONT_6X10, DARK);
    let day_style = MonoTextStyle::new(&FONT_6X10, BLACK);
    let day_style_inverted = MonoTextStyle::new(&FONT_6X10, WHITE);

    for month in 1..=12u32 {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            continue;
        };
        let index = month as i32 - 1;
        let x0 = MARGIN + (index % MONTH_COLS) * month_w;
        let y0 = HEADER_H + (index / MONTH_COLS) * month_h;

        let days_in_month = first
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .map(|last| last.day())
            .unwrap_or(28);
        let offset = first.weekday().num_days_from_monday() as i32;

        drawn(
            Text::with_alignment(
                &first.format("%b").to_string(),
                Point::new(x0 + month_w / 2, y0 + 12),
                name_style,
                Alignment::Center,
            )
            .draw(canvas),
        );

        let cell_w = month_w / 7;
        let cell_h = (month_h - MONTH_NAME_H - DAY_HEADER_H) / 6;
        let grid_top = y0 + MONTH_NAME_H + DAY_HEADER_H;

        for (col, letter) in DAY_LETTERS.iter().enumerate() {
            drawn(
                Text::with_alignment(
                    letter,
                    Point::new(x0 + col as i32 * cell_w + cell_w / 2, y0 + MONTH_NAME_H + 9),
                    letter_style,
                    Alignment::Center,
                )
                .draw(canvas),
            );
        }

        for day in 1..=days_in_month {
            let slot = offset + day as i32 - 1;
            let cx = x0 + (slot % 7) * cell_w + cell_w / 2;
            let cy = grid_top + (slot / 7) * cell_h + cell_h / 2;
            let is_today = month == today.month() && day == today.day();

            if is_today || busy[(month - 1) as usize][day as usize] {
                let fill = if is_today { BLACK } else { LIGHT };
                let side = (cell_w.min(cell_h) - 1).max(1) as u32;
                drawn(
                    Rectangle::with_center(Point::new(cx, cy), Size::new(side, side))
                        .into_styled(PrimitiveStyle::with_fill(fill))
                        .draw(canvas),
                );
            }

            let style = if is_today { day_style_inverted } else { day_style };
            drawn(
                Text::with_alignment(
                    &format!("{}", day),
                    Point::new(cx, cy + 3),
                    style,
                    Alignment::Center,
                )
                .draw(canvas),
            );
        }
    }
    Ok(())
}
