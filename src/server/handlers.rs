use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::{
    validate_user_id, ContentPlan, Feature, NewContentPlan, NewScan, Report, ReportKind, ReportType,
    Scan,
};
use crate::report::ComposeRequest;
use crate::services::parse_page_url;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub file_url: String,
    pub report_id: i64,
    pub file_name: String,
    pub pages: u32,
    pub report_type: ReportType,
    pub kind: ReportKind,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    #[serde(default)]
    pub user_id: String,
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn require_user(user_id: &str) -> Result<String> {
    validate_user_id(user_id).map(str::to_string)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
    }))
}

pub async fn create_report(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ComposeRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>> {
    let request = body(payload)?;
    let report = state.composer.compose(request).await?;
    Ok(Json(ReportResponse {
        success: true,
        file_url: report.file_url,
        report_id: report.report_id,
        file_name: report.file_name,
        pages: report.pages,
        report_type: report.report_type,
        kind: report.kind,
    }))
}

pub async fn list_reports(
    State(state): State<AppState>,
    query: std::result::Result<Query<ReportsQuery>, QueryRejection>,
) -> Result<Json<Vec<Report>>> {
    let Query(query) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let user_id = require_user(&query.user_id)?;
    Ok(Json(state.repository.list_reports(&user_id).await?))
}

pub async fn create_scan(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Scan>)> {
    let request = body(payload)?;
    let user_id = require_user(&request.user_id)?;
    let url = parse_page_url(&request.url)?;

    state
        .quota
        .check(&user_id, Feature::Scan)
        .await?
        .require(Feature::Scan)?;

    let payload = state.scanner.scan(url.as_str()).await?;
    let scan = state
        .repository
        .insert_scan(NewScan {
            user_id: user_id.clone(),
            url: url.to_string(),
            payload,
        })
        .await?;

    if let Err(e) = state.quota.increment(&user_id, Feature::Scan).await {
        warn!("Failed to record scan usage for {}: {}", user_id, e);
    }

    Ok((StatusCode::CREATED, Json(scan)))
}

pub async fn create_content_plan(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewContentPlan>, JsonRejection>,
) -> Result<(StatusCode, Json<ContentPlan>)> {
    let mut plan = body(payload)?;
    plan.user_id = require_user(&plan.user_id)?;
    plan.main_topic = plan.main_topic.trim().to_string();
    if plan.main_topic.is_empty() {
        return Err(AppError::Validation("main_topic is required".to_string()));
    }
    if let Some(item) = plan.items.iter().find(|item| item.title.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "content plan item on {} has no title",
            item.date
        )));
    }

    let plan = state.repository.insert_content_plan(plan).await?;
    tracing::info!(
        "Stored content plan {} with {} items for {}",
        plan.id,
        plan.items.len(),
        plan.user_id
    );
    Ok((StatusCode::CREATED, Json(plan)))
}
