use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Usage limit reached for {feature} on the {plan} plan")]
    QuotaExceeded {
        feature: String,
        plan: String,
        remaining: Option<u32>,
    },

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Quota service error: {0}")]
    QuotaService(String),

    #[error("AI API error: {0}")]
    AiApi(String),

    #[error("PageSpeed API error: {0}")]
    PageSpeed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape of every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(rename = "limitExceeded", skip_serializing_if = "Option::is_none")]
    pub limit_exceeded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::info!("Request rejected ({}): {}", status.as_u16(), self);
        }

        let body = match &self {
            AppError::QuotaExceeded {
                plan, remaining, ..
            } => ErrorBody {
                error: self.to_string(),
                plan: Some(plan.clone()),
                limit_exceeded: Some(true),
                remaining: *remaining,
            },
            _ => ErrorBody {
                error: self.to_string(),
                plan: None,
                limit_exceeded: None,
                remaining: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(
            AppError::Validation("user_id is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("Scan".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::QuotaExceeded {
                feature: "pdf".into(),
                plan: "free".into(),
                remaining: Some(0),
            }
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Storage("bucket missing".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn quota_body_carries_plan_and_flag() {
        let err = AppError::QuotaExceeded {
            feature: "pdf".into(),
            plan: "free".into(),
            remaining: Some(0),
        };
        let body = ErrorBody {
            error: err.to_string(),
            plan: Some("free".into()),
            limit_exceeded: Some(true),
            remaining: Some(0),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["limitExceeded"], true);
        assert_eq!(json["plan"], "free");
        assert_eq!(json["remaining"], 0);

        let plain = serde_json::to_value(ErrorBody {
            error: "boom".into(),
            plan: None,
            limit_exceeded: None,
            remaining: None,
        })
        .unwrap();
        assert!(plain.get("plan").is_none());
        assert!(plain.get("limitExceeded").is_none());
    }
}
