//! Absolute-position drawing on fixed-size pages.
//!
//! Coordinates are given from the top-left corner of the page, in points,
//! with `y` growing downwards. Text `y` is the baseline. Everything is
//! converted to PDF user space (bottom-left origin) when written.

use chrono::{DateTime, Datelike, Timelike, Utc};
use pdf_writer::{Content, Date, Name, Pdf, Rect, Ref, Str, TextStr};

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];

    fn resource(&self) -> Name<'static> {
        match self {
            Font::Regular => Name(b"F1"),
            Font::Bold => Name(b"F2"),
            Font::Oblique => Name(b"F3"),
        }
    }

    fn base_font(&self) -> Name<'static> {
        match self {
            Font::Regular => Name(b"Helvetica"),
            Font::Bold => Name(b"Helvetica-Bold"),
            Font::Oblique => Name(b"Helvetica-Oblique"),
        }
    }
}

/// Metadata written into the document information dictionary and the footer.
/// The footer line is followed by the generation time on every page.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub footer: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct PdfCanvas {
    pages: Vec<Content>,
}

impl PdfCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_page(&mut self) {
        self.pages.push(Content::new());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current(&mut self) -> &mut Content {
        if self.pages.is_empty() {
            self.new_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        let bytes = encode_winansi(text);
        let content = self.current();
        content.begin_text();
        content.set_fill_rgb(color.0, color.1, color.2);
        content.set_font(font.resource(), size);
        content.next_line(x, PAGE_HEIGHT - y);
        content.show(Str(&bytes));
        content.end_text();
    }

    /// Horizontally centred text, using an average glyph width of half the font size.
    pub fn text_centered(&mut self, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        let approx_width = text.chars().count() as f32 * size * 0.5;
        let x = ((PAGE_WIDTH - approx_width) / 2.0).max(0.0);
        self.text(x, y, font, size, color, text);
    }

    /// Filled box whose top-left corner is at (`x`, `y`).
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let content = self.current();
        content.save_state();
        content.set_fill_rgb(color.0, color.1, color.2);
        content.rect(x, PAGE_HEIGHT - y - height, width, height);
        content.fill_nonzero();
        content.restore_state();
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb, line_width: f32) {
        let content = self.current();
        content.save_state();
        content.set_stroke_rgb(color.0, color.1, color.2);
        content.set_line_width(line_width);
        content.rect(x, PAGE_HEIGHT - y - height, width, height);
        content.stroke();
        content.restore_state();
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, line_width: f32) {
        let content = self.current();
        content.save_state();
        content.set_stroke_rgb(color.0, color.1, color.2);
        content.set_line_width(line_width);
        content.move_to(from.0, PAGE_HEIGHT - from.1);
        content.line_to(to.0, PAGE_HEIGHT - to.1);
        content.stroke();
        content.restore_state();
    }

    /// Draw page footers and serialize the document.
    pub fn finish(mut self, info: &DocumentInfo) -> Vec<u8> {
        let total = self.pages.len();
        let footer_color = Rgb(0.45, 0.45, 0.45);
        let footer = encode_winansi(&format!(
            "{} | Generated {}",
            info.footer,
            info.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        for index in 0..total {
            let page = &mut self.pages[index];
            let label = encode_winansi(&format!("Page {} of {}", index + 1, total));
            page.begin_text();
            page.set_fill_rgb(footer_color.0, footer_color.1, footer_color.2);
            page.set_font(Font::Regular.resource(), 8.0);
            page.next_line(50.0, 28.0);
            page.show(Str(&footer));
            page.end_text();
            page.begin_text();
            page.set_font(Font::Regular.resource(), 8.0);
            page.next_line(PAGE_WIDTH - 110.0, 28.0);
            page.show(Str(&label));
            page.end_text();
        }

        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();
        let fonts: Vec<(Font, Ref)> = Font::ALL.iter().map(|f| (*f, alloc())).collect();
        let page_ids: Vec<(Ref, Ref)> = (0..total).map(|_| (alloc(), alloc())).collect();

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().map(|(page_id, _)| *page_id))
            .count(total as i32);

        for (font, font_id) in &fonts {
            pdf.type1_font(*font_id)
                .base_font(font.base_font())
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        for (content, (page_id, content_id)) in self.pages.into_iter().zip(page_ids.iter().copied()) {
            {
                let mut page = pdf.page(page_id);
                page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT))
                    .parent(pages_id)
                    .contents(content_id);
                let mut resources = page.resources();
                let mut font_dict = resources.fonts();
                for (font, font_id) in &fonts {
                    font_dict.pair(font.resource(), *font_id);
                }
            }
            pdf.stream(content_id, &content.finish());
        }

        let stamp = info.generated_at;
        pdf.document_info(info_id)
            .title(TextStr(&info.title))
            .producer(TextStr("seo-reporter"))
            .creation_date(
                Date::new(stamp.year() as u16)
                    .month(stamp.month() as u8)
                    .day(stamp.day() as u8)
                    .hour(stamp.hour() as u8)
                    .minute(stamp.minute() as u8)
                    .second(stamp.second() as u8)
                    .utc_offset_hour(0),
            );

        pdf.finish()
    }
}

/// Map text onto the WinAnsi code page used by the standard fonts.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\t' | '\n' | '\r' => b' ',
            _ => b'?',
        })
        .collect()
}
