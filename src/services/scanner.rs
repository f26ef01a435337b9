use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Headings, ImageInfo, Performance, ScanPayload, SeoData};

use super::pagespeed::PageSpeedClient;

const USER_AGENT_STRING: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Crawls a single page and scores what it finds.
pub struct Scanner {
    client: Client,
    pagespeed: Option<PageSpeedClient>,
    extractor: PageExtractor,
}

impl Scanner {
    pub fn new(pagespeed: Option<PageSpeedClient>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            pagespeed,
            extractor: PageExtractor::new()?,
        })
    }

    pub async fn scan(&self, page_url: &str) -> Result<ScanPayload> {
        let url = parse_page_url(page_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));

        let response = self
            .client
            .get(url.as_str())
            .headers(headers)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch {}: HTTP {}", url, response.status()).into());
        }

        let final_url = response.url().clone();
        let html = response.text().await?;
        let mut seo = self.extractor.extract(&html, &final_url);

        let performance = match &self.pagespeed {
            Some(client) => Some(client.measure(url.as_str()).await),
            None => None,
        };

        seo.score = score_page(&seo, performance.as_ref());
        tracing::info!("Scanned {} (score {})", url, seo.score);

        Ok(ScanPayload {
            seo,
            performance,
            ai: None,
        })
    }
}

pub fn parse_page_url(page_url: &str) -> Result<Url> {
    let url = Url::parse(page_url.trim())
        .map_err(|e| AppError::Validation(format!("invalid url '{}': {}", page_url, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(AppError::Validation(format!(
            "url must be an http(s) address: '{}'",
            page_url
        ))),
    }
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| AppError::Other(e.into()))
}

/// Regex-based extraction of the on-page SEO fields.
pub struct PageExtractor {
    title: Regex,
    meta_description: Regex,
    meta_description_reversed: Regex,
    h1: Regex,
    h2: Regex,
    h3: Regex,
    img: Regex,
    src: Regex,
    alt: Regex,
    link: Regex,
    tag: Regex,
}

impl PageExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            title: pattern(r"(?is)<title[^>]*>(.*?)</title>")?,
            meta_description: pattern(
                r#"(?is)<meta[^>]*name=["']description["'][^>]*content=["']([^"']*)["']"#,
            )?,
            meta_description_reversed: pattern(
                r#"(?is)<meta[^>]*content=["']([^"']*)["'][^>]*name=["']description["']"#,
            )?,
            h1: pattern(r"(?is)<h1\b[^>]*>(.*?)</h1>")?,
            h2: pattern(r"(?is)<h2\b[^>]*>(.*?)</h2>")?,
            h3: pattern(r"(?is)<h3\b[^>]*>(.*?)</h3>")?,
            img: pattern(r"(?is)<img\b[^>]*>")?,
            src: pattern(r#"(?is)\ssrc=["']([^"']*)["']"#)?,
            alt: pattern(r#"(?is)\salt=["']([^"']*)["']"#)?,
            link: pattern(r#"(?is)<a\b[^>]*href=["']([^"']+)["']"#)?,
            tag: pattern(r"(?s)<[^>]+>")?,
        })
    }

    pub fn extract(&self, html: &str, base: &Url) -> SeoData {
        let title = self
            .title
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| self.clean_text(m.as_str()))
            .filter(|t| !t.is_empty());

        let meta_description = self
            .meta_description
            .captures(html)
            .or_else(|| self.meta_description_reversed.captures(html))
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str().trim()))
            .filter(|m| !m.is_empty());

        let headings = Headings {
            h1: self.collect_text(&self.h1, html),
            h2: self.collect_text(&self.h2, html),
            h3: self.collect_text(&self.h3, html),
        };

        let images = self
            .img
            .find_iter(html)
            .filter_map(|tag| {
                let tag = tag.as_str();
                let src = self.src.captures(tag)?.get(1)?.as_str().to_string();
                let alt = self
                    .alt
                    .captures(tag)
                    .and_then(|c| c.get(1))
                    .map(|m| decode_entities(m.as_str()));
                Some(ImageInfo { src, alt })
            })
            .collect();

        let (internal_links, external_links) = self.count_links(html, base);

        SeoData {
            score: 0,
            title,
            meta_description,
            headings,
            images,
            word_count: count_words(html),
            internal_links,
            external_links,
        }
    }

    fn collect_text(&self, re: &Regex, html: &str) -> Vec<String> {
        re.captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| self.clean_text(m.as_str()))
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Strip nested tags and collapse whitespace.
    fn clean_text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        decode_entities(&collapsed)
    }

    fn count_links(&self, html: &str, base: &Url) -> (u32, u32) {
        let mut internal = 0;
        let mut external = 0;
        for href in self.link.captures_iter(html).filter_map(|c| c.get(1)) {
            let href = href.as_str().trim();
            if href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("javascript:")
            {
                continue;
            }
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            if resolved.host_str() == base.host_str() {
                internal += 1;
            } else {
                external += 1;
            }
        }
        (internal, external)
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn count_words(html: &str) -> u32 {
    match html2text::from_read(html.as_bytes(), 120) {
        Ok(text) => text
            .split_whitespace()
            .filter(|w| w.chars().any(char::is_alphanumeric))
            .count() as u32,
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            0
        }
    }
}

/// Deduction-based score in 0..=100.
pub fn score_page(seo: &SeoData, performance: Option<&Performance>) -> u8 {
    let mut score: i32 = 100;

    match seo.title_len() {
        0 => score -= 20,
        30..=60 => {}
        _ => score -= 5,
    }

    match seo.meta_description_len() {
        0 => score -= 15,
        120..=160 => {}
        _ => score -= 5,
    }

    if seo.headings.h1.len() != 1 {
        score -= 10;
    }

    score -= (seo.images_missing_alt() as i32 * 2).min(10);

    if seo.word_count < 300 {
        score -= 10;
    }

    if let Some(mobile) = performance.and_then(|p| p.mobile.as_ref()) {
        if mobile.score < 50 {
            score -= 10;
        }
    }

    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PerformanceMetrics;

    const PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <title>  Rust PDF reports &amp; SEO audits for busy teams  </title>
  <meta content="Generate paginated SEO reports." name="description">
</head>
<body>
  <h1>Reports <em>that</em> ship</h1>
  <h2>Why</h2><h2>How</h2>
  <h3>Details</h3>
  <img src="/logo.png" alt="Company logo">
  <img src="/hero.jpg">
  <img src="/spacer.gif" alt="">
  <a href="/pricing">Pricing</a>
  <a href="https://example.com/blog">Blog</a>
  <a href="https://other.org/">Partner</a>
  <a href="mailto:hi@example.com">Mail</a>
  <a href="#top">Top</a>
</body>
</html>"##;

    #[test]
    fn extracts_on_page_fields() {
        let extractor = PageExtractor::new().unwrap();
        let base = Url::parse("https://example.com/").unwrap();
        let seo = extractor.extract(PAGE, &base);

        assert_eq!(
            seo.title.as_deref(),
            Some("Rust PDF reports & SEO audits for busy teams")
        );
        assert_eq!(
            seo.meta_description.as_deref(),
            Some("Generate paginated SEO reports.")
        );
        assert_eq!(seo.headings.h1, vec!["Reports that ship".to_string()]);
        assert_eq!(seo.headings.h2.len(), 2);
        assert_eq!(seo.headings.h3, vec!["Details".to_string()]);
        assert_eq!(seo.images.len(), 3);
        assert_eq!(seo.images_missing_alt(), 2);
        assert_eq!(seo.internal_links, 2);
        assert_eq!(seo.external_links, 1);
        assert!(seo.word_count >= 6);
    }

    #[test]
    fn scoring_applies_deductions() {
        let perfect = SeoData {
            score: 0,
            title: Some("A title that is comfortably long enough".to_string()),
            meta_description: Some("m".repeat(140)),
            headings: Headings {
                h1: vec!["Only one".to_string()],
                ..Default::default()
            },
            images: vec![],
            word_count: 800,
            internal_links: 0,
            external_links: 0,
        };
        assert_eq!(score_page(&perfect, None), 100);

        let mut weak = perfect.clone();
        weak.title = None;
        weak.meta_description = None;
        weak.headings.h1.clear();
        weak.word_count = 20;
        weak.images = (0..8)
            .map(|i| ImageInfo {
                src: format!("/{}.png", i),
                alt: None,
            })
            .collect();
        let slow = Performance {
            mobile: Some(PerformanceMetrics {
                score: 20,
                ..Default::default()
            }),
            desktop: None,
        };
        // 100 - 20 - 15 - 10 - 10 (capped alt) - 10 - 10
        assert_eq!(score_page(&weak, Some(&slow)), 25);
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(parse_page_url("https://example.com").is_ok());
        assert!(matches!(
            parse_page_url("ftp://example.com"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(parse_page_url("not a url"), Err(AppError::Validation(_))));
    }
}
