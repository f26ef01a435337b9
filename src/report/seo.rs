use chrono::{DateTime, Utc};

use crate::models::{AiAnalysis, Performance, PerformanceMetrics, ReportKind, Scan, SeoData};

use super::canvas::{DocumentInfo, Font, PdfCanvas, PAGE_WIDTH};
use super::layout::{
    bullets, key_value, page_header, paragraph, score_bar, score_color, score_label,
    section_title, truncate, BODY_WRAP_CHARS, CONTENT_BOTTOM, CONTENT_WIDTH, LINE_HEIGHT,
    MARGIN, MUTED, PANEL, PRIMARY, RULE, TEXT, WHITE,
};
use super::RenderedDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Cover,
    Contents,
    Summary,
    Technical,
    AiAnalysis,
    Comparison,
    Conclusion,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Cover => "Cover",
            Section::Contents => "Table of Contents",
            Section::Summary => "Executive Summary",
            Section::Technical => "Technical SEO",
            Section::AiAnalysis => "AI Analysis",
            Section::Comparison => "Before & After",
            Section::Conclusion => "Conclusion",
        }
    }
}

/// Page sequence of an SEO report; every section is exactly one page.
pub fn sections(include_ai: bool) -> Vec<Section> {
    let mut sections = vec![
        Section::Cover,
        Section::Contents,
        Section::Summary,
        Section::Technical,
    ];
    if include_ai {
        sections.extend([Section::AiAnalysis, Section::Comparison]);
    }
    sections.push(Section::Conclusion);
    sections
}

pub fn predicted_score(score: u8) -> u8 {
    score.saturating_add(30).min(95)
}

pub fn recommendations(seo: &SeoData, performance: Option<&Performance>) -> Vec<String> {
    let mut out = Vec::new();

    if seo.score < 80 {
        out.push("Fix critical technical SEO issues".to_string());
    }

    let missing_alt = seo.images_missing_alt();
    if missing_alt > 0 {
        out.push(format!(
            "Add alt text to {} image{}",
            missing_alt,
            if missing_alt == 1 { "" } else { "s" }
        ));
    }

    if !(30..=60).contains(&seo.title_len()) {
        out.push("Optimize the title tag (30-60 characters)".to_string());
    }

    if !(120..=160).contains(&seo.meta_description_len()) {
        out.push("Write a meta description of 120-160 characters".to_string());
    }

    if seo.headings.h1.len() != 1 {
        out.push("Use exactly one H1 heading".to_string());
    }

    if seo.word_count < 300 {
        out.push("Expand thin content (under 300 words)".to_string());
    }

    if performance
        .and_then(|p| p.mobile.as_ref())
        .is_some_and(|mobile| mobile.score < 50)
    {
        out.push("Improve mobile page speed".to_string());
    }

    if out.is_empty() {
        out.push("Maintain current SEO practices".to_string());
    }
    out
}

pub fn render_seo_report(
    scan: &Scan,
    include_ai: bool,
    ai: Option<&AiAnalysis>,
    generated_at: DateTime<Utc>,
) -> RenderedDocument {
    let kind = if include_ai {
        ReportKind::AiEnhanced
    } else {
        ReportKind::Seo
    };
    let sections = sections(include_ai);
    let pages = SeoPages {
        scan,
        seo: &scan.payload.seo,
        ai,
        kind,
        generated_at,
    };

    let mut canvas = PdfCanvas::new();
    for section in &sections {
        canvas.new_page();
        match section {
            Section::Cover => pages.cover(&mut canvas),
            Section::Contents => pages.contents(&mut canvas, &sections),
            Section::Summary => pages.summary(&mut canvas),
            Section::Technical => pages.technical(&mut canvas),
            Section::AiAnalysis => pages.ai_analysis(&mut canvas),
            Section::Comparison => pages.comparison(&mut canvas),
            Section::Conclusion => pages.conclusion(&mut canvas),
        }
    }

    let page_count = canvas.page_count() as u32;
    let bytes = canvas.finish(&DocumentInfo {
        title: format!("{} - {}", kind.label(), scan.url),
        footer: format!("{} | {}", kind.label(), truncate(&scan.url, 40)),
        generated_at,
    });

    RenderedDocument {
        bytes,
        pages: page_count,
        sections: sections.iter().map(Section::title).collect(),
    }
}

struct SeoPages<'a> {
    scan: &'a Scan,
    seo: &'a SeoData,
    ai: Option<&'a AiAnalysis>,
    kind: ReportKind,
    generated_at: DateTime<Utc>,
}

impl SeoPages<'_> {
    fn performance(&self) -> Option<&Performance> {
        self.scan.payload.performance.as_ref()
    }

    fn cover(&self, canvas: &mut PdfCanvas) {
        let score = self.seo.score;
        canvas.fill_rect(0.0, 0.0, PAGE_WIDTH, 300.0, PRIMARY);
        canvas.text_centered(150.0, Font::Bold, 28.0, WHITE, self.kind.label());
        canvas.text_centered(185.0, Font::Regular, 13.0, WHITE, &truncate(&self.scan.url, 70));

        let box_x = PAGE_WIDTH / 2.0 - 80.0;
        canvas.fill_rect(box_x, 350.0, 160.0, 120.0, PANEL);
        canvas.stroke_rect(box_x, 350.0, 160.0, 120.0, RULE, 1.0);
        canvas.text_centered(420.0, Font::Bold, 44.0, score_color(score), &score.to_string());
        canvas.text_centered(450.0, Font::Regular, 11.0, MUTED, "Overall SEO score");

        let mut y = 540.0;
        let rows = [
            ("Website", truncate(&self.scan.url, 60)),
            ("Prepared for", truncate(&self.scan.user_id, 60)),
            (
                "Scanned",
                self.scan.created_at.format("%B %-d, %Y").to_string(),
            ),
            (
                "Generated",
                self.generated_at.format("%B %-d, %Y %H:%M UTC").to_string(),
            ),
            ("Report type", self.kind.label().to_string()),
        ];
        for (label, value) in rows {
            key_value(canvas, MARGIN + 60.0, y, label, &value);
            y += 22.0;
        }
    }

    fn contents(&self, canvas: &mut PdfCanvas, sections: &[Section]) {
        page_header(canvas, "Table of Contents", &self.scan.url);
        let mut y = 120.0;
        for (index, section) in sections.iter().enumerate() {
            canvas.text(
                MARGIN,
                y,
                Font::Regular,
                12.0,
                TEXT,
                &format!("{}. {}", index + 1, section.title()),
            );
            canvas.text(
                MARGIN + CONTENT_WIDTH - 20.0,
                y,
                Font::Bold,
                12.0,
                PRIMARY,
                &(index + 1).to_string(),
            );
            canvas.line((MARGIN, y + 8.0), (MARGIN + CONTENT_WIDTH, y + 8.0), RULE, 0.5);
            y += 30.0;
        }
    }

    fn summary(&self, canvas: &mut PdfCanvas) {
        let seo = self.seo;
        page_header(canvas, "Executive Summary", &self.scan.url);

        canvas.fill_rect(MARGIN, 95.0, CONTENT_WIDTH, 90.0, PANEL);
        canvas.text(MARGIN + 20.0, 155.0, Font::Bold, 40.0, score_color(seo.score), &seo.score.to_string());
        canvas.text(MARGIN + 110.0, 128.0, Font::Bold, 14.0, TEXT, score_label(seo.score));
        score_bar(canvas, MARGIN + 110.0, 142.0, 300.0, seo.score);
        canvas.text(MARGIN + 110.0, 172.0, Font::Regular, 9.0, MUTED, "Score out of 100");

        let mut y = section_title(canvas, 220.0, "Key metrics");
        let title = match seo.title_len() {
            0 => "Missing".to_string(),
            n => format!("{} characters", n),
        };
        let meta = match seo.meta_description_len() {
            0 => "Missing".to_string(),
            n => format!("{} characters", n),
        };
        let rows = [
            ("Title tag", title),
            ("Meta description", meta),
            ("H1 headings", seo.headings.h1.len().to_string()),
            (
                "H2 / H3 headings",
                format!("{} / {}", seo.headings.h2.len(), seo.headings.h3.len()),
            ),
            ("Images", seo.images.len().to_string()),
            ("Missing alt text", seo.images_missing_alt().to_string()),
            ("Word count", seo.word_count.to_string()),
            (
                "Links",
                format!("{} internal, {} external", seo.internal_links, seo.external_links),
            ),
        ];
        for (label, value) in rows {
            key_value(canvas, MARGIN, y, label, &value);
            y += 18.0;
        }

        y = section_title(canvas, y + 16.0, "Performance");
        match self.performance() {
            Some(performance) => {
                for (label, metrics) in [("Mobile", &performance.mobile), ("Desktop", &performance.desktop)] {
                    match metrics {
                        Some(metrics) => {
                            key_value(canvas, MARGIN, y, label, &format!("{}/100", metrics.score));
                            score_bar(canvas, MARGIN + 230.0, y - 9.0, 200.0, metrics.score);
                        }
                        None => key_value(canvas, MARGIN, y, label, "Not measured"),
                    }
                    y += 20.0;
                }
            }
            None => {
                canvas.text(
                    MARGIN,
                    y,
                    Font::Oblique,
                    10.0,
                    MUTED,
                    "Performance data was not collected for this scan.",
                );
                y += 20.0;
            }
        }

        y = section_title(canvas, y + 16.0, "Top priorities");
        let priorities: Vec<String> = recommendations(seo, self.performance())
            .into_iter()
            .take(3)
            .collect();
        bullets(canvas, y, &priorities, 80, CONTENT_BOTTOM);
    }

    fn technical(&self, canvas: &mut PdfCanvas) {
        let seo = self.seo;
        page_header(canvas, "Technical SEO", &self.scan.url);

        let mut y = section_title(canvas, 100.0, &format!("Title tag ({} characters)", seo.title_len()));
        y = paragraph(
            canvas,
            MARGIN,
            y,
            seo.title.as_deref().unwrap_or("No title tag found."),
            BODY_WRAP_CHARS,
            2,
        );

        y = section_title(
            canvas,
            y + 10.0,
            &format!("Meta description ({} characters)", seo.meta_description_len()),
        );
        y = paragraph(
            canvas,
            MARGIN,
            y,
            seo.meta_description
                .as_deref()
                .unwrap_or("No meta description found."),
            BODY_WRAP_CHARS,
            3,
        );

        y = section_title(canvas, y + 10.0, "Headings");
        for (level, headings) in [
            ("H1", &seo.headings.h1),
            ("H2", &seo.headings.h2),
            ("H3", &seo.headings.h3),
        ] {
            canvas.text(
                MARGIN,
                y,
                Font::Bold,
                10.0,
                TEXT,
                &format!("{} ({})", level, headings.len()),
            );
            y += LINE_HEIGHT;
            for heading in headings.iter().take(4) {
                canvas.text(MARGIN + 16.0, y, Font::Regular, 9.0, TEXT, &truncate(heading, 85));
                y += 14.0;
            }
            if headings.len() > 4 {
                canvas.text(
                    MARGIN + 16.0,
                    y,
                    Font::Oblique,
                    9.0,
                    MUTED,
                    &format!("and {} more", headings.len() - 4),
                );
                y += 14.0;
            }
        }

        let missing: Vec<&str> = seo
            .images
            .iter()
            .filter(|img| img.missing_alt())
            .map(|img| img.src.as_str())
            .collect();
        y = section_title(
            canvas,
            y + 10.0,
            &format!("Images without alt text ({} of {})", missing.len(), seo.images.len()),
        );
        if missing.is_empty() {
            canvas.text(MARGIN, y, Font::Oblique, 10.0, MUTED, "All images have alt text.");
            y += LINE_HEIGHT;
        }
        for src in missing.iter().take(6) {
            canvas.text(MARGIN + 16.0, y, Font::Regular, 9.0, TEXT, &truncate(src, 85));
            y += 14.0;
        }

        y = section_title(canvas, y + 10.0, "Performance metrics");
        match self.performance() {
            Some(performance) => performance_table(canvas, y, performance),
            None => canvas.text(
                MARGIN,
                y,
                Font::Oblique,
                10.0,
                MUTED,
                "Performance data was not collected for this scan.",
            ),
        }
    }

    fn ai_analysis(&self, canvas: &mut PdfCanvas) {
        page_header(canvas, "AI Analysis", &self.scan.url);

        let Some(ai) = self.ai else {
            canvas.text(
                MARGIN,
                120.0,
                Font::Oblique,
                11.0,
                MUTED,
                "AI analysis is not available for this scan.",
            );
            return;
        };

        let mut y = section_title(canvas, 100.0, "Summary");
        y = paragraph(canvas, MARGIN, y, &ai.summary, BODY_WRAP_CHARS, 8);

        y = section_title(canvas, y + 12.0, "Recommendations");
        let items: Vec<String> = ai.recommendations.iter().take(8).cloned().collect();
        y = bullets(canvas, y, &items, 80, 640.0);

        if !ai.keywords.is_empty() {
            y = section_title(canvas, y + 12.0, "Target keywords");
            paragraph(canvas, MARGIN, y, &ai.keywords.join(", "), BODY_WRAP_CHARS, 3);
        }
    }

    fn comparison(&self, canvas: &mut PdfCanvas) {
        let seo = self.seo;
        page_header(canvas, "Before & After", &self.scan.url);

        let left = MARGIN;
        let right = MARGIN + CONTENT_WIDTH / 2.0 + 10.0;
        let column_chars = 42;
        let suggestion = |value: Option<&String>| {
            value
                .cloned()
                .unwrap_or_else(|| "No suggestion available.".to_string())
        };

        let mut y = 110.0;
        for (label, current, optimized, max_lines) in [
            (
                "Title tag",
                seo.title.clone().unwrap_or_else(|| "Missing".to_string()),
                suggestion(self.ai.and_then(|ai| ai.optimized_title.as_ref())),
                4,
            ),
            (
                "Meta description",
                seo.meta_description
                    .clone()
                    .unwrap_or_else(|| "Missing".to_string()),
                suggestion(self.ai.and_then(|ai| ai.optimized_meta_description.as_ref())),
                6,
            ),
        ] {
            y = section_title(canvas, y, label);
            canvas.text(left, y, Font::Bold, 10.0, MUTED, &format!("Current ({} chars)", current.chars().count()));
            canvas.text(right, y, Font::Bold, 10.0, PRIMARY, &format!("Suggested ({} chars)", optimized.chars().count()));
            y += LINE_HEIGHT;
            let left_end = paragraph(canvas, left, y, &current, column_chars, max_lines);
            let right_end = paragraph(canvas, right, y, &optimized, column_chars, max_lines);
            y = left_end.max(right_end) + 20.0;
        }

        let predicted = predicted_score(seo.score);
        y = section_title(canvas, y, "Score");
        key_value(canvas, left, y, "Current score", &format!("{}/100", seo.score));
        score_bar(canvas, left + 230.0, y - 9.0, 200.0, seo.score);
        y += 22.0;
        key_value(canvas, left, y, "Predicted score", &format!("{}/100", predicted));
        score_bar(canvas, left + 230.0, y - 9.0, 200.0, predicted);
    }

    fn conclusion(&self, canvas: &mut PdfCanvas) {
        let seo = self.seo;
        let predicted = predicted_score(seo.score);
        page_header(canvas, "Conclusion", &self.scan.url);

        canvas.fill_rect(MARGIN, 95.0, CONTENT_WIDTH, 90.0, PANEL);
        canvas.text(MARGIN + 20.0, 125.0, Font::Bold, 11.0, MUTED, "Current score");
        canvas.text(MARGIN + 20.0, 165.0, Font::Bold, 32.0, score_color(seo.score), &seo.score.to_string());
        canvas.text(MARGIN + 260.0, 125.0, Font::Bold, 11.0, MUTED, "Predicted score after fixes");
        canvas.text(MARGIN + 260.0, 165.0, Font::Bold, 32.0, score_color(predicted), &predicted.to_string());

        let mut y = section_title(canvas, 220.0, "Recommended next steps");
        y = bullets(
            canvas,
            y,
            &recommendations(seo, self.performance()),
            80,
            CONTENT_BOTTOM - 60.0,
        );

        paragraph(
            canvas,
            MARGIN,
            y + 20.0,
            "Re-run the scan after applying these changes to measure the improvement.",
            BODY_WRAP_CHARS,
            2,
        );
    }
}

fn seconds(ms: f64) -> String {
    format!("{:.1} s", ms / 1000.0)
}

fn performance_table(canvas: &mut PdfCanvas, y: f32, performance: &Performance) {
    let columns = [MARGIN, MARGIN + 220.0, MARGIN + 340.0];
    canvas.fill_rect(MARGIN, y - 12.0, CONTENT_WIDTH, 18.0, PANEL);
    for (x, heading) in columns.iter().zip(["Metric", "Mobile", "Desktop"]) {
        canvas.text(*x + 6.0, y, Font::Bold, 10.0, TEXT, heading);
    }

    type Cell = fn(&PerformanceMetrics) -> String;
    let rows: [(&str, Cell); 6] = [
        ("Performance score", |m| format!("{}/100", m.score)),
        ("First Contentful Paint", |m| seconds(m.first_contentful_paint_ms)),
        ("Largest Contentful Paint", |m| seconds(m.largest_contentful_paint_ms)),
        ("Cumulative Layout Shift", |m| format!("{:.3}", m.cumulative_layout_shift)),
        ("Total Blocking Time", |m| format!("{:.0} ms", m.total_blocking_time_ms)),
        ("Speed Index", |m| seconds(m.speed_index_ms)),
    ];

    let mut y = y + 18.0;
    for (label, cell) in rows {
        canvas.text(columns[0] + 6.0, y, Font::Regular, 10.0, TEXT, label);
        for (x, metrics) in columns[1..].iter().zip([&performance.mobile, &performance.desktop]) {
            let value = metrics.as_ref().map(cell).unwrap_or_else(|| "-".to_string());
            canvas.text(*x + 6.0, y, Font::Regular, 10.0, TEXT, &value);
        }
        canvas.line((MARGIN, y + 5.0), (MARGIN + CONTENT_WIDTH, y + 5.0), RULE, 0.5);
        y += 16.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Headings, ImageInfo, ScanPayload};
    use chrono::TimeZone;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    fn example_scan() -> Scan {
        Scan {
            id: 7,
            user_id: "u1".to_string(),
            url: "https://example.com".to_string(),
            created_at: Utc::now(),
            payload: ScanPayload {
                seo: SeoData {
                    score: 72,
                    title: Some("Example Domain".to_string()),
                    meta_description: None,
                    headings: Headings {
                        h1: vec!["Example Domain".to_string()],
                        ..Default::default()
                    },
                    images: vec![
                        ImageInfo {
                            src: "/hero.png".to_string(),
                            alt: None,
                        },
                        ImageInfo {
                            src: "/logo.png".to_string(),
                            alt: Some("Logo".to_string()),
                        },
                    ],
                    word_count: 28,
                    internal_links: 0,
                    external_links: 1,
                },
                performance: Some(Performance {
                    mobile: Some(PerformanceMetrics {
                        score: 91,
                        first_contentful_paint_ms: 900.0,
                        ..Default::default()
                    }),
                    desktop: None,
                }),
                ai: None,
            },
        }
    }

    #[test]
    fn page_templates_have_fixed_length() {
        assert_eq!(sections(false).len(), 5);
        assert_eq!(sections(true).len(), 7);
        assert_eq!(
            sections(true),
            vec![
                Section::Cover,
                Section::Contents,
                Section::Summary,
                Section::Technical,
                Section::AiAnalysis,
                Section::Comparison,
                Section::Conclusion,
            ]
        );
    }

    #[test]
    fn predicted_score_is_capped() {
        assert_eq!(predicted_score(72), 95);
        assert_eq!(predicted_score(40), 70);
        assert_eq!(predicted_score(250), 95);
    }

    #[test]
    fn example_scan_renders_traditional_report() {
        let scan = example_scan();
        let doc = render_seo_report(&scan, false, None, Utc::now());

        assert_eq!(doc.pages, 5);
        assert!(!doc.sections.contains(&"AI Analysis"));
        assert_eq!(doc.sections.last(), Some(&"Conclusion"));
        assert!(doc.bytes.starts_with(b"%PDF-"));
        assert!(contains(&doc.bytes, "/Count 5"));
        assert!(contains(&doc.bytes, "(Fix critical technical SEO issues)"));
        assert!(contains(&doc.bytes, "(95)"));

        let recs = recommendations(&scan.payload.seo, scan.payload.performance.as_ref());
        assert_eq!(recs[0], "Fix critical technical SEO issues");
        assert!(recs.contains(&"Add alt text to 1 image".to_string()));
        assert!(!recs.contains(&"Improve mobile page speed".to_string()));
    }

    #[test]
    fn ai_report_keeps_page_count_without_analysis() {
        let scan = example_scan();
        let doc = render_seo_report(&scan, true, None, Utc::now());
        assert_eq!(doc.pages, 7);
        assert!(contains(&doc.bytes, "(AI analysis is not available for this scan.)"));

        let analysis = AiAnalysis {
            summary: "The page is thin and lacks a description.".to_string(),
            recommendations: vec!["Write a meta description".to_string()],
            optimized_title: Some("Example Domain: Reserved Names for Documentation".to_string()),
            optimized_meta_description: None,
            keywords: vec!["example domain".to_string()],
        };
        let doc = render_seo_report(&scan, true, Some(&analysis), Utc::now());
        assert_eq!(doc.pages, 7);
        assert!(contains(&doc.bytes, "(Write a meta description)"));
    }

    #[test]
    fn footer_carries_generation_date() {
        let generated_at = Utc.with_ymd_and_hms(2031, 2, 3, 9, 30, 0).unwrap();
        let doc = render_seo_report(&example_scan(), false, None, generated_at);
        assert!(contains(
            &doc.bytes,
            "(SEO Analysis Report | https://example.com | Generated 2031-02-03 09:30 UTC)"
        ));
    }

    #[test]
    fn same_scan_renders_same_structure() {
        let scan = example_scan();
        let first = render_seo_report(&scan, true, None, Utc::now());
        let second = render_seo_report(&scan, true, None, Utc::now() + chrono::Duration::hours(1));
        assert_eq!(first.pages, second.pages);
        assert_eq!(first.sections, second.sections);
    }

    #[test]
    fn clean_page_gets_maintenance_advice() {
        let seo = SeoData {
            score: 96,
            title: Some("A well sized title for a healthy landing page".to_string()),
            meta_description: Some("d".repeat(150)),
            headings: Headings {
                h1: vec!["Welcome".to_string()],
                ..Default::default()
            },
            images: vec![],
            word_count: 1200,
            internal_links: 10,
            external_links: 2,
        };
        assert_eq!(
            recommendations(&seo, None),
            vec!["Maintain current SEO practices".to_string()]
        );
    }
}
