use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::SeoAdvisor;
use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::{
    validate_user_id, AiAnalysis, Feature, NewReport, ReportKind, ReportType, Scan,
};
use crate::services::{ObjectStore, QuotaService};

use super::content_plan::render_content_plan;
use super::seo::render_seo_report;
use super::RenderedDocument;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Body of a report generation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub scan_id: Option<i64>,
    #[serde(default)]
    pub include_ai: Option<bool>,
    #[serde(default)]
    pub report_type: Option<ReportType>,
    #[serde(default)]
    pub main_topic: Option<String>,
}

enum Target {
    Scan { scan_id: Option<i64>, url: Option<String> },
    ContentPlan { main_topic: String },
}

impl ComposeRequest {
    fn target(&self) -> Result<Target> {
        validate_user_id(&self.user_id)?;
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        match self.report_type.unwrap_or_default() {
            ReportType::Seo => {
                let url = non_blank(&self.url);
                if self.scan_id.is_none() && url.is_none() {
                    return Err(AppError::Validation(
                        "scan_id or url is required".to_string(),
                    ));
                }
                Ok(Target::Scan {
                    scan_id: self.scan_id,
                    url,
                })
            }
            ReportType::ContentPlan => non_blank(&self.main_topic)
                .map(|main_topic| Target::ContentPlan { main_topic })
                .ok_or_else(|| {
                    AppError::Validation("main_topic is required for content plan reports".to_string())
                }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposedReport {
    pub report_id: i64,
    pub file_url: String,
    pub file_name: String,
    pub pages: u32,
    pub kind: ReportKind,
    pub report_type: ReportType,
}

/// Turns a stored scan or content plan into a PDF, stores it and records it.
pub struct ReportComposer {
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn ObjectStore>,
    quota: Arc<dyn QuotaService>,
    advisor: Option<Arc<SeoAdvisor>>,
}

impl ReportComposer {
    pub fn new(
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn ObjectStore>,
        quota: Arc<dyn QuotaService>,
        advisor: Option<Arc<SeoAdvisor>>,
    ) -> Self {
        Self {
            records,
            storage,
            quota,
            advisor,
        }
    }

    pub async fn compose(&self, request: ComposeRequest) -> Result<ComposedReport> {
        let target = request.target()?;
        let user_id = request.user_id.trim();
        let report_type = request.report_type.unwrap_or_default();

        self.quota
            .check(user_id, Feature::Pdf)
            .await?
            .require(Feature::Pdf)?;

        let generated_at = Utc::now();
        let (document, kind, source, file_name) = match target {
            Target::Scan { scan_id, url } => {
                let scan = self
                    .records
                    .find_scan(user_id, scan_id, url.as_deref())
                    .await?
                    .ok_or_else(|| AppError::NotFound("Scan".to_string()))?;
                let include_ai = request.include_ai.unwrap_or(false);
                let ai = if include_ai {
                    self.ai_content(&scan).await
                } else {
                    None
                };
                let document = render_seo_report(&scan, include_ai, ai.as_ref(), generated_at);
                let kind = if include_ai {
                    ReportKind::AiEnhanced
                } else {
                    ReportKind::Seo
                };
                let file_name = format!(
                    "seo-report-{}-{}.pdf",
                    slug(&host_of(&scan.url)),
                    stamp(generated_at)
                );
                (document, kind, scan.url, file_name)
            }
            Target::ContentPlan { main_topic } => {
                let plan = self
                    .records
                    .find_content_plan(user_id, &main_topic)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Content plan".to_string()))?;
                let document = render_content_plan(&plan, generated_at);
                let file_name = format!(
                    "content-plan-{}-{}.pdf",
                    slug(&plan.main_topic),
                    stamp(generated_at)
                );
                (document, ReportKind::ContentPlan, plan.main_topic, file_name)
            }
        };

        let RenderedDocument { bytes, pages, .. } = document;
        let storage_path = format!("{}/{}", user_id, file_name);
        let size = bytes.len();
        let file_url = self
            .storage
            .upload(&storage_path, bytes, PDF_CONTENT_TYPE)
            .await?;

        let new_report = NewReport {
            user_id: user_id.to_string(),
            source,
            kind,
            file_name: file_name.clone(),
            storage_path: storage_path.clone(),
            file_url: file_url.clone(),
            pages,
            generated_at,
        };
        let report = match self.records.insert_report(new_report).await {
            Ok(report) => report,
            Err(e) => {
                if let Err(cleanup) = self.storage.remove(&storage_path).await {
                    warn!("Failed to remove orphaned object {}: {}", storage_path, cleanup);
                }
                return Err(e);
            }
        };

        if let Err(e) = self.quota.increment(user_id, Feature::Pdf).await {
            warn!("Failed to record pdf usage for {}: {}", user_id, e);
        }

        info!(
            "Generated {} report {} ({} pages, {} bytes) for {}",
            kind, report.id, pages, size, user_id
        );

        Ok(ComposedReport {
            report_id: report.id,
            file_url,
            file_name,
            pages,
            kind,
            report_type,
        })
    }

    /// Stored analysis first, otherwise a fresh one from the advisor when
    /// configured and allowed. `None` renders the "not available" notice.
    async fn ai_content(&self, scan: &Scan) -> Option<AiAnalysis> {
        if let Some(ai) = &scan.payload.ai {
            return Some(ai.clone());
        }
        let advisor = self.advisor.as_ref()?;

        match self.quota.check(&scan.user_id, Feature::Ai).await {
            Ok(status) if status.allowed => {}
            Ok(status) => {
                info!(
                    "AI quota exhausted for {} on the {} plan, rendering without analysis",
                    scan.user_id, status.plan
                );
                return None;
            }
            Err(e) => {
                warn!("AI quota check failed for {}: {}", scan.user_id, e);
                return None;
            }
        }

        match advisor.analyze(scan).await {
            Ok(analysis) => {
                if let Err(e) = self.quota.increment(&scan.user_id, Feature::Ai).await {
                    warn!("Failed to record ai usage for {}: {}", scan.user_id, e);
                }
                Some(analysis)
            }
            Err(e) => {
                warn!(
                    "AI analysis with {} failed for scan {}: {}",
                    advisor.model_version(),
                    scan.id,
                    e
                );
                None
            }
        }
    }
}

fn host_of(page_url: &str) -> String {
    url::Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| page_url.to_string())
}

/// Lowercase ASCII words joined by dashes, for file names.
fn slug(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
        if out.len() >= 40 {
            break;
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S-%6f").to_string()
}
