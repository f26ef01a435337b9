use std::collections::HashMap;
use std::time::Duration;

use futures::future;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Performance, PerformanceMetrics};

const PAGESPEED_API_URL: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    Mobile,
    Desktop,
}

impl Strategy {
    fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageSpeedResponse {
    lighthouse_result: LighthouseResult,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    categories: Categories,
    #[serde(default)]
    audits: HashMap<String, Audit>,
}

#[derive(Debug, Deserialize)]
struct Categories {
    performance: Category,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Audit {
    numeric_value: Option<f64>,
}

pub struct PageSpeedClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PageSpeedClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_endpoint(PAGESPEED_API_URL, api_key)
    }

    pub fn with_endpoint(endpoint: &str, api_key: Option<String>) -> Result<Self> {
        // Lighthouse runs routinely take longer than 30s.
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    pub async fn run(&self, url: &str, strategy: Strategy) -> Result<PerformanceMetrics> {
        let mut query = vec![
            ("url", url.to_string()),
            ("strategy", strategy.as_str().to_string()),
            ("category", "performance".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        let response = self.client.get(&self.endpoint).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::PageSpeed(format!("{} ({}): {}", strategy.as_str(), status, error_text)));
        }

        let body: PageSpeedResponse = response.json().await?;
        Ok(metrics_from_response(body))
    }

    /// Query mobile and desktop together. A failed run yields `None` for that side.
    pub async fn measure(&self, url: &str) -> Performance {
        let (mobile, desktop) = future::join(
            self.run(url, Strategy::Mobile),
            self.run(url, Strategy::Desktop),
        )
        .await;

        let keep = |result: Result<PerformanceMetrics>, strategy: Strategy| match result {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::warn!("PageSpeed {} run failed for {}: {}", strategy.as_str(), url, e);
                None
            }
        };

        Performance {
            mobile: keep(mobile, Strategy::Mobile),
            desktop: keep(desktop, Strategy::Desktop),
        }
    }
}

fn metrics_from_response(body: PageSpeedResponse) -> PerformanceMetrics {
    let result = body.lighthouse_result;
    let audit = |name: &str| {
        result
            .audits
            .get(name)
            .and_then(|a| a.numeric_value)
            .unwrap_or(0.0)
    };

    PerformanceMetrics {
        score: (result.categories.performance.score.unwrap_or(0.0) * 100.0)
            .round()
            .clamp(0.0, 100.0) as u8,
        first_contentful_paint_ms: audit("first-contentful-paint"),
        largest_contentful_paint_ms: audit("largest-contentful-paint"),
        cumulative_layout_shift: audit("cumulative-layout-shift"),
        total_blocking_time_ms: audit("total-blocking-time"),
        speed_index_ms: audit("speed-index"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_score_and_audits() {
        let body: PageSpeedResponse = serde_json::from_str(
            r#"{
                "lighthouseResult": {
                    "categories": { "performance": { "score": 0.874 } },
                    "audits": {
                        "first-contentful-paint": { "numericValue": 1200.5 },
                        "largest-contentful-paint": { "numericValue": 2500.0 },
                        "cumulative-layout-shift": { "numericValue": 0.05 },
                        "total-blocking-time": { "numericValue": 150.0 },
                        "speed-index": { "numericValue": 3100.0 },
                        "unrelated": { "score": 1 }
                    }
                }
            }"#,
        )
        .unwrap();

        let metrics = metrics_from_response(body);
        assert_eq!(metrics.score, 87);
        assert_eq!(metrics.first_contentful_paint_ms, 1200.5);
        assert_eq!(metrics.cumulative_layout_shift, 0.05);
        assert_eq!(metrics.speed_index_ms, 3100.0);
    }

    #[test]
    fn missing_score_counts_as_zero() {
        let body: PageSpeedResponse = serde_json::from_str(
            r#"{ "lighthouseResult": { "categories": { "performance": { "score": null } } } }"#,
        )
        .unwrap();
        let metrics = metrics_from_response(body);
        assert_eq!(metrics.score, 0);
        assert_eq!(metrics.largest_contentful_paint_ms, 0.0);
    }

    #[tokio::test]
    async fn measure_swallows_failures() {
        // Nothing listens on this port, so both requests fail fast.
        let client = PageSpeedClient::with_endpoint("http://127.0.0.1:9/runPagespeed", None).unwrap();
        let performance = client.measure("https://example.com").await;
        assert!(performance.mobile.is_none());
        assert!(performance.desktop.is_none());
    }
}
