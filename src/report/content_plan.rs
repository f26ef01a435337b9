use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{ContentPlan, ContentPlanItem, ItemStatus, ReportKind, SearchIntent};

use super::canvas::{DocumentInfo, Font, PdfCanvas, PAGE_WIDTH};
use super::layout::{
    key_value, page_header, section_title, table_page_count, truncate, CONTENT_WIDTH,
    KEYWORD_BUDGET, MARGIN, MUTED, PANEL, PRIMARY, ROWS_PER_PAGE, RULE, SECONDARY_BUDGET, TEXT,
    TITLE_BUDGET, WHITE,
};
use super::RenderedDocument;

const ROW_HEIGHT: f32 = 32.0;
const TABLE_TOP: f32 = 110.0;
const TABLE_FONT: f32 = 7.0;

/// Column x offsets from the margin, with their headings.
const COLUMNS: [(f32, &str); 7] = [
    (0.0, "Date"),
    (48.0, "Title"),
    (188.0, "Keyword"),
    (270.0, "Secondary keywords"),
    (366.0, "Intent"),
    (418.0, "Words"),
    (448.0, "Status"),
];

/// Cover and overview, then one page per started block of table rows.
pub fn plan_page_count(items: usize) -> usize {
    2 + table_page_count(items)
}

pub fn render_content_plan(plan: &ContentPlan, generated_at: DateTime<Utc>) -> RenderedDocument {
    let kind = ReportKind::ContentPlan;
    let mut canvas = PdfCanvas::new();
    let mut sections = vec!["Cover", "Overview"];

    canvas.new_page();
    cover(&mut canvas, plan, generated_at);

    canvas.new_page();
    overview(&mut canvas, plan);

    let total = plan.items.len();
    for (index, rows) in plan.items.chunks(ROWS_PER_PAGE).enumerate() {
        canvas.new_page();
        let first = index * ROWS_PER_PAGE;
        let subtitle = format!(
            "{} | items {}-{} of {}",
            plan.main_topic,
            first + 1,
            first + rows.len(),
            total
        );
        page_header(&mut canvas, "Content Calendar", &subtitle);
        table(&mut canvas, rows);
        sections.push("Content Calendar");
    }

    let pages = canvas.page_count() as u32;
    let bytes = canvas.finish(&DocumentInfo {
        title: format!("{} - {}", kind.label(), plan.main_topic),
        footer: format!("{} | {}", kind.label(), truncate(&plan.main_topic, 40)),
        generated_at,
    });

    RenderedDocument {
        bytes,
        pages,
        sections,
    }
}

fn cover(canvas: &mut PdfCanvas, plan: &ContentPlan, generated_at: DateTime<Utc>) {
    canvas.fill_rect(0.0, 0.0, PAGE_WIDTH, 300.0, PRIMARY);
    canvas.text_centered(150.0, Font::Bold, 28.0, WHITE, ReportKind::ContentPlan.label());
    canvas.text_centered(185.0, Font::Regular, 14.0, WHITE, &truncate(&plan.main_topic, 60));

    let mut y = 380.0;
    let rows = [
        ("Main topic", truncate(&plan.main_topic, 40)),
        ("Prepared for", truncate(&plan.user_id, 60)),
        ("Articles", plan.items.len().to_string()),
        ("Planned", plan.created_at.format("%B %-d, %Y").to_string()),
        (
            "Generated",
            generated_at.format("%B %-d, %Y %H:%M UTC").to_string(),
        ),
    ];
    for (label, value) in rows {
        key_value(canvas, MARGIN + 60.0, y, label, &value);
        y += 22.0;
    }
}

fn overview(canvas: &mut PdfCanvas, plan: &ContentPlan) {
    let items = &plan.items;
    page_header(canvas, "Overview", &plan.main_topic);

    let mut y = section_title(canvas, 100.0, "At a glance");
    if items.is_empty() {
        canvas.text(MARGIN, y, Font::Oblique, 10.0, MUTED, "This plan has no items yet.");
        return;
    }

    let total_words: u64 = items.iter().map(|item| u64::from(item.length)).sum();
    let range = match (items.iter().map(|i| i.date).min(), items.iter().map(|i| i.date).max()) {
        (Some(first), Some(last)) => format!(
            "{} to {}",
            first.format("%b %-d, %Y"),
            last.format("%b %-d, %Y")
        ),
        _ => "-".to_string(),
    };
    let rows = [
        ("Articles", items.len().to_string()),
        ("Schedule", range),
        ("Total words", total_words.to_string()),
        (
            "Average length",
            format!("{} words", total_words / items.len() as u64),
        ),
    ];
    for (label, value) in rows {
        key_value(canvas, MARGIN, y, label, &value);
        y += 18.0;
    }

    y = section_title(canvas, y + 16.0, "Search intent");
    for intent in SearchIntent::ALL {
        let count = items.iter().filter(|item| item.intent == intent).count();
        y = breakdown_row(canvas, y, intent.as_str(), count, items.len());
    }

    y = section_title(canvas, y + 16.0, "Status");
    for status in ItemStatus::ALL {
        let count = items.iter().filter(|item| item.status == status).count();
        y = breakdown_row(canvas, y, status.label(), count, items.len());
    }

    y = section_title(canvas, y + 16.0, "Articles per month");
    let mut months: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        *months.entry(item.date.format("%Y-%m").to_string()).or_default() += 1;
    }
    for (month, count) in months.iter().take(8) {
        y = breakdown_row(canvas, y, month, *count, items.len());
    }
}

fn breakdown_row(canvas: &mut PdfCanvas, y: f32, label: &str, count: usize, total: usize) -> f32 {
    key_value(canvas, MARGIN, y, label, &count.to_string());
    let width = 250.0;
    canvas.fill_rect(MARGIN + 180.0, y - 8.0, width, 8.0, RULE);
    if count > 0 {
        let filled = width * count as f32 / total.max(1) as f32;
        canvas.fill_rect(MARGIN + 180.0, y - 8.0, filled, 8.0, PRIMARY);
    }
    y + 18.0
}

fn table(canvas: &mut PdfCanvas, rows: &[ContentPlanItem]) {
    canvas.fill_rect(MARGIN, TABLE_TOP - 14.0, CONTENT_WIDTH, 20.0, PRIMARY);
    for (offset, heading) in COLUMNS {
        canvas.text(MARGIN + offset + 3.0, TABLE_TOP, Font::Bold, TABLE_FONT, WHITE, heading);
    }

    let mut y = TABLE_TOP + 6.0;
    for (index, item) in rows.iter().enumerate() {
        if index % 2 == 1 {
            canvas.fill_rect(MARGIN, y, CONTENT_WIDTH, ROW_HEIGHT, PANEL);
        }
        let baseline = y + ROW_HEIGHT / 2.0 + 2.5;
        let cells = [
            item.date.format("%Y-%m-%d").to_string(),
            truncate(&item.title, TITLE_BUDGET),
            truncate(&item.keyword, KEYWORD_BUDGET),
            truncate(&item.secondary_keywords.join(", "), SECONDARY_BUDGET),
            item.intent.as_str().to_string(),
            item.length.to_string(),
            item.status.label().to_string(),
        ];
        for ((offset, _), cell) in COLUMNS.iter().zip(cells.iter()) {
            canvas.text(MARGIN + offset + 3.0, baseline, Font::Regular, TABLE_FONT, TEXT, cell);
        }
        y += ROW_HEIGHT;
        canvas.line((MARGIN, y), (MARGIN + CONTENT_WIDTH, y), RULE, 0.5);
    }
}
