use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::QuotaConfig;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{validate_user_id, Feature};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub allowed: bool,
    pub plan: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub used: u32,
    #[serde(default)]
    pub remaining: Option<u32>,
}

impl QuotaStatus {
    /// Turn a refusal into the error callers hand back to the client.
    pub fn require(self, feature: Feature) -> Result<Self> {
        if self.allowed {
            Ok(self)
        } else {
            Err(AppError::QuotaExceeded {
                feature: feature.as_str().to_string(),
                plan: self.plan,
                remaining: self.remaining,
            })
        }
    }
}

/// Per-user allowance for gated features.
#[async_trait]
pub trait QuotaService: Send + Sync {
    async fn check(&self, user_id: &str, feature: Feature) -> Result<QuotaStatus>;

    async fn increment(&self, user_id: &str, feature: Feature) -> Result<()>;
}

/// Monthly usage counted in the local database against the configured plans.
pub struct LocalQuota {
    repository: Arc<Repository>,
    config: QuotaConfig,
}

impl LocalQuota {
    pub fn new(repository: Arc<Repository>, config: QuotaConfig) -> Self {
        Self { repository, config }
    }

    /// Put a user on one of the configured plans. Takes effect on the next check.
    pub async fn assign_plan(&self, user_id: &str, plan: &str) -> Result<()> {
        let user_id = validate_user_id(user_id)?;
        let plan = plan.trim();
        if self.config.plan_limits(plan).is_none() {
            let mut known: Vec<&str> = self.config.plans.keys().map(String::as_str).collect();
            known.sort_unstable();
            return Err(AppError::Validation(format!(
                "unknown plan '{}', expected one of: {}",
                plan,
                known.join(", ")
            )));
        }
        self.repository.set_plan(user_id, plan).await?;
        tracing::info!("Assigned {} to the {} plan", user_id, plan);
        Ok(())
    }

    fn current_period() -> String {
        Utc::now().format("%Y-%m").to_string()
    }
}

#[async_trait]
impl QuotaService for LocalQuota {
    async fn check(&self, user_id: &str, feature: Feature) -> Result<QuotaStatus> {
        let plan = self
            .repository
            .get_plan(user_id)
            .await?
            .unwrap_or_else(|| self.config.default_plan.clone());

        let limits = self.config.plan_limits(&plan).ok_or_else(|| {
            AppError::QuotaService(format!("user {} is on unknown plan '{}'", user_id, plan))
        })?;

        let limit = match feature {
            Feature::Pdf => limits.pdf,
            Feature::Ai => limits.ai,
            Feature::Scan => limits.scan,
        };

        let used = self
            .repository
            .count_usage(user_id, feature, &Self::current_period())
            .await?;
        let remaining = limit.map(|limit| limit.saturating_sub(used));

        Ok(QuotaStatus {
            allowed: remaining.is_none_or(|r| r > 0),
            plan,
            limit,
            used,
            remaining,
        })
    }

    async fn increment(&self, user_id: &str, feature: Feature) -> Result<()> {
        self.repository
            .record_usage(user_id, feature, &Self::current_period())
            .await
    }
}

#[derive(Debug, Serialize)]
struct UsageRequest<'a> {
    user_id: &'a str,
    feature: &'a str,
}

/// Client for a hosted plan/usage service.
pub struct RemoteQuota {
    client: Client,
    base_url: String,
}

impl RemoteQuota {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, endpoint: &str, user_id: &str, feature: Feature) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .json(&UsageRequest {
                user_id,
                feature: feature.as_str(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::QuotaService(format!(
                "{} returned {}: {}",
                endpoint, status, error_text
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl QuotaService for RemoteQuota {
    async fn check(&self, user_id: &str, feature: Feature) -> Result<QuotaStatus> {
        let response = self.post("check", user_id, feature).await?;
        Ok(response.json().await?)
    }

    async fn increment(&self, user_id: &str, feature: Feature) -> Result<()> {
        self.post("increment", user_id, feature).await?;
        Ok(())
    }
}
