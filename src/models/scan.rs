use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored crawl of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub id: i64,
    pub user_id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: ScanPayload,
}

/// The analysed fields of a scan. Stored as JSON next to the scan row and
/// validated against this shape when read back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanPayload {
    pub seo: SeoData,
    #[serde(default)]
    pub performance: Option<Performance>,
    #[serde(default)]
    pub ai: Option<AiAnalysis>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeoData {
    pub score: u8,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub headings: Headings,
    #[serde(default)]
    pub images: Vec<ImageInfo>,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub internal_links: u32,
    #[serde(default)]
    pub external_links: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Headings {
    #[serde(default)]
    pub h1: Vec<String>,
    #[serde(default)]
    pub h2: Vec<String>,
    #[serde(default)]
    pub h3: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
}

impl ImageInfo {
    pub fn missing_alt(&self) -> bool {
        self.alt.as_deref().map(str::trim).unwrap_or("").is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Performance {
    #[serde(default)]
    pub mobile: Option<PerformanceMetrics>,
    #[serde(default)]
    pub desktop: Option<PerformanceMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub score: u8,
    #[serde(default)]
    pub first_contentful_paint_ms: f64,
    #[serde(default)]
    pub largest_contentful_paint_ms: f64,
    #[serde(default)]
    pub cumulative_layout_shift: f64,
    #[serde(default)]
    pub total_blocking_time_ms: f64,
    #[serde(default)]
    pub speed_index_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub optimized_title: Option<String>,
    #[serde(default)]
    pub optimized_meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SeoData {
    pub fn images_missing_alt(&self) -> usize {
        self.images.iter().filter(|img| img.missing_alt()).count()
    }

    pub fn title_len(&self) -> usize {
        self.title.as_deref().map(|t| t.chars().count()).unwrap_or(0)
    }

    pub fn meta_description_len(&self) -> usize {
        self.meta_description
            .as_deref()
            .map(|m| m.chars().count())
            .unwrap_or(0)
    }
}

/// Input for storing a freshly analysed page.
#[derive(Debug, Clone)]
pub struct NewScan {
    pub user_id: String,
    pub url: String,
    pub payload: ScanPayload,
}
