//! PDF report rendering and the compose pipeline around it.

mod canvas;
mod composer;
mod content_plan;
mod layout;
mod seo;

pub use composer::{ComposeRequest, ComposedReport, ReportComposer};
pub use content_plan::{plan_page_count, render_content_plan};
pub use layout::{split_lines, truncate};
pub use seo::{predicted_score, recommendations, render_seo_report, sections, Section};

/// A finished PDF and the page structure it was drawn with.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub pages: u32,
    /// Title of every page, in order.
    pub sections: Vec<&'static str>,
}
