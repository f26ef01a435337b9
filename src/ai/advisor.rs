use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{AiAnalysis, Scan};

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Produces the AI analysis section for scans that were stored without one.
pub struct SeoAdvisor {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl SeoAdvisor {
    pub fn new(api_key: String, base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub async fn analyze(&self, scan: &Scan) -> Result<AiAnalysis> {
        let system_prompt = r#"You are an SEO consultant reviewing a crawled web page.
Respond with a single JSON object with these fields:
"summary" (2-3 sentences), "recommendations" (array of at most 8 short actions),
"optimized_title" (30-60 characters), "optimized_meta_description" (120-160 characters),
"keywords" (array of at most 8 target keywords)."#;

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: describe_scan(scan),
                },
            ],
            temperature: 0.4,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::AiApi(format!("API error: {}", error_text)));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| AppError::AiApi("No content returned from API".to_string()))?;

        parse_analysis(&content)
    }

    pub fn model_version(&self) -> &str {
        &self.model
    }
}

fn describe_scan(scan: &Scan) -> String {
    let seo = &scan.payload.seo;
    let mut lines = vec![
        format!("URL: {}", scan.url),
        format!("Current score: {}/100", seo.score),
        format!("Title: {}", seo.title.as_deref().unwrap_or("(missing)")),
        format!(
            "Meta description: {}",
            seo.meta_description.as_deref().unwrap_or("(missing)")
        ),
        format!("H1: {}", seo.headings.h1.join(" | ")),
        format!("H2: {}", seo.headings.h2.iter().take(10).cloned().collect::<Vec<_>>().join(" | ")),
        format!(
            "Images: {} total, {} without alt text",
            seo.images.len(),
            seo.images_missing_alt()
        ),
        format!("Word count: {}", seo.word_count),
    ];
    if let Some(mobile) = scan.payload.performance.as_ref().and_then(|p| p.mobile.as_ref()) {
        lines.push(format!("Mobile performance score: {}", mobile.score));
    }
    lines.join("\n")
}

/// Parse the model's JSON answer, tolerating a surrounding code fence.
fn parse_analysis(content: &str) -> Result<AiAnalysis> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(json)
        .map_err(|e| AppError::AiApi(format!("Unparseable analysis: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain = r#"{"summary":"Solid page.","recommendations":["Add alt text"],"keywords":["seo"]}"#;
        let analysis = parse_analysis(plain).unwrap();
        assert_eq!(analysis.summary, "Solid page.");
        assert_eq!(analysis.recommendations, vec!["Add alt text".to_string()]);
        assert!(analysis.optimized_title.is_none());

        let fenced = format!("```json\n{}\n```", plain);
        assert_eq!(parse_analysis(&fenced).unwrap(), analysis);
    }

    #[test]
    fn rejects_prose_answers() {
        let err = parse_analysis("Sure! Here are some ideas.").unwrap_err();
        assert!(matches!(err, AppError::AiApi(_)));
    }

    #[test]
    fn prompt_mentions_missing_fields() {
        let scan = Scan {
            id: 1,
            user_id: "u1".to_string(),
            url: "https://example.com".to_string(),
            created_at: chrono::Utc::now(),
            payload: Default::default(),
        };
        let prompt = describe_scan(&scan);
        assert!(prompt.contains("URL: https://example.com"));
        assert!(prompt.contains("Title: (missing)"));
    }
}
