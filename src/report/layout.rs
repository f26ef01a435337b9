//! Page geometry, palette and the character-budget text rules.

use super::canvas::{Font, PdfCanvas, Rgb, PAGE_WIDTH};

pub const MARGIN: f32 = 50.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
/// Lowest baseline body content may use before the footer area.
pub const CONTENT_BOTTOM: f32 = 780.0;
pub const LINE_HEIGHT: f32 = 15.0;

pub const BODY_WRAP_CHARS: usize = 90;
pub const ROWS_PER_PAGE: usize = 18;
pub const TITLE_BUDGET: usize = 38;
pub const KEYWORD_BUDGET: usize = 22;
pub const SECONDARY_BUDGET: usize = 26;

const ELLIPSIS: &str = "...";

pub const PRIMARY: Rgb = Rgb(0.16, 0.33, 0.71);
pub const TEXT: Rgb = Rgb(0.13, 0.13, 0.16);
pub const MUTED: Rgb = Rgb(0.42, 0.45, 0.5);
pub const RULE: Rgb = Rgb(0.85, 0.87, 0.9);
pub const PANEL: Rgb = Rgb(0.95, 0.96, 0.98);
pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
pub const GOOD: Rgb = Rgb(0.13, 0.59, 0.33);
pub const FAIR: Rgb = Rgb(0.93, 0.55, 0.13);
pub const POOR: Rgb = Rgb(0.84, 0.2, 0.2);

/// Cut `text` to at most `budget` characters, marking the cut with `...`.
pub fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let keep = budget.saturating_sub(ELLIPSIS.len());
    if keep == 0 {
        return text.chars().take(budget).collect();
    }
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Word-wrap at a fixed character width.
pub fn split_lines(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

pub fn table_page_count(rows: usize) -> usize {
    rows.div_ceil(ROWS_PER_PAGE)
}

pub fn score_color(score: u8) -> Rgb {
    match score {
        80..=u8::MAX => GOOD,
        50..=79 => FAIR,
        _ => POOR,
    }
}

pub fn score_label(score: u8) -> &'static str {
    match score {
        80..=u8::MAX => "Good",
        50..=79 => "Needs improvement",
        _ => "Poor",
    }
}

/// Coloured title band across the top of a content page.
pub fn page_header(canvas: &mut PdfCanvas, title: &str, subtitle: &str) {
    canvas.fill_rect(0.0, 0.0, PAGE_WIDTH, 70.0, PRIMARY);
    canvas.text(MARGIN, 42.0, Font::Bold, 20.0, WHITE, title);
    canvas.text(MARGIN, 60.0, Font::Regular, 9.0, WHITE, &truncate(subtitle, 95));
}

pub fn section_title(canvas: &mut PdfCanvas, y: f32, title: &str) -> f32 {
    canvas.text(MARGIN, y, Font::Bold, 13.0, PRIMARY, title);
    canvas.line(
        (MARGIN, y + 5.0),
        (MARGIN + CONTENT_WIDTH, y + 5.0),
        RULE,
        0.8,
    );
    y + 22.0
}

/// Wrapped body text. Returns the baseline for whatever comes next.
pub fn paragraph(canvas: &mut PdfCanvas, x: f32, y: f32, text: &str, width: usize, max_lines: usize) -> f32 {
    let mut y = y;
    let lines = split_lines(text, width);
    let overflow = lines.len() > max_lines;
    for (i, line) in lines.into_iter().take(max_lines).enumerate() {
        let line = if overflow && i + 1 == max_lines {
            truncate(&format!("{} {}", line, ELLIPSIS), width)
        } else {
            line
        };
        canvas.text(x, y, Font::Regular, 10.0, TEXT, &line);
        y += LINE_HEIGHT;
    }
    y
}

/// Bulleted list, each entry wrapped. Stops before `bottom`.
pub fn bullets(canvas: &mut PdfCanvas, y: f32, items: &[String], width: usize, bottom: f32) -> f32 {
    let mut y = y;
    for item in items {
        let lines = split_lines(item, width);
        if y + LINE_HEIGHT * lines.len() as f32 > bottom {
            break;
        }
        canvas.text(MARGIN + 4.0, y, Font::Bold, 10.0, PRIMARY, "\u{2022}");
        for line in lines {
            canvas.text(MARGIN + 16.0, y, Font::Regular, 10.0, TEXT, &line);
            y += LINE_HEIGHT;
        }
        y += 3.0;
    }
    y
}

/// Label on the left, value right after it.
pub fn key_value(canvas: &mut PdfCanvas, x: f32, y: f32, label: &str, value: &str) {
    canvas.text(x, y, Font::Bold, 10.0, MUTED, label);
    canvas.text(x + 130.0, y, Font::Regular, 10.0, TEXT, value);
}

/// Horizontal bar filled to `score` percent.
pub fn score_bar(canvas: &mut PdfCanvas, x: f32, y: f32, width: f32, score: u8) {
    canvas.fill_rect(x, y, width, 10.0, RULE);
    let filled = width * f32::from(score.min(100)) / 100.0;
    if filled > 0.0 {
        canvas.fill_rect(x, y, filled, 10.0, score_color(score));
    }
}
