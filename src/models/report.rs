use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub user_id: String,
    /// Page URL for SEO reports, topic for content plans.
    pub source: String,
    pub kind: ReportKind,
    pub file_name: String,
    pub storage_path: String,
    pub file_url: String,
    pub pages: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: String,
    pub source: String,
    pub kind: ReportKind,
    pub file_name: String,
    pub storage_path: String,
    pub file_url: String,
    pub pages: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Seo,
    AiEnhanced,
    ContentPlan,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Seo => "seo",
            ReportKind::AiEnhanced => "ai_enhanced",
            ReportKind::ContentPlan => "content_plan",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Seo => "SEO Analysis Report",
            ReportKind::AiEnhanced => "AI-Enhanced SEO Report",
            ReportKind::ContentPlan => "Content Plan Report",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seo" => Ok(ReportKind::Seo),
            "ai_enhanced" => Ok(ReportKind::AiEnhanced),
            "content_plan" => Ok(ReportKind::ContentPlan),
            other => Err(AppError::InvalidRecord(format!("unknown report kind '{}'", other))),
        }
    }
}

/// What the caller asked to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    Seo,
    ContentPlan,
}
