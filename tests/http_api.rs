use std::collections::HashMap;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_test::assert_ok;
use tower::util::ServiceExt;

use seo_report_composer::config::{Config, PlanLimits, QuotaConfig, StorageConfig};
use seo_report_composer::models::{ImageInfo, NewScan, Scan, ScanPayload, SeoData};
use seo_report_composer::server::{self, AppState};

const BASE_URL: &str = "http://localhost:8787";

struct TestContext {
    temp_dir: TempDir,
    state: AppState,
    app: axum::Router,
}

async fn build_test_context(pdf_limit: Option<u32>) -> TestContext {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let config = Config {
        db_path: temp_dir.path().join("reports.db").to_string_lossy().to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        public_base_url: BASE_URL.to_string(),
        openai_api_key: None,
        openai_base_url: "http://127.0.0.1:9/v1".to_string(),
        openai_model: "test-model".to_string(),
        pagespeed_api_key: None,
        storage: StorageConfig::Local {
            dir: temp_dir.path().join("files").to_string_lossy().to_string(),
        },
        quota: QuotaConfig {
            remote_url: None,
            default_plan: "free".to_string(),
            plans: HashMap::from([(
                "free".to_string(),
                PlanLimits {
                    pdf: pdf_limit,
                    ai: Some(0),
                    scan: Some(0),
                },
            )]),
        },
    };

    let state = assert_ok!(AppState::new(&config).await);
    let app = server::router(state.clone());

    TestContext {
        temp_dir,
        state,
        app,
    }
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, bytes.to_vec())
}

async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.unwrap_or(Value::Null).to_string()))
        .expect("request should build");

    let (status, bytes) = send(app, req).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, json)
}

async fn seed_example_scan(ctx: &TestContext) -> Scan {
    ctx.state
        .repository
        .insert_scan(NewScan {
            user_id: "u1".to_string(),
            url: "https://example.com/".to_string(),
            payload: ScanPayload {
                seo: SeoData {
                    score: 72,
                    title: Some("Example Domain".to_string()),
                    images: vec![ImageInfo {
                        src: "https://example.com/hero.png".to_string(),
                        alt: None,
                    }],
                    word_count: 28,
                    ..Default::default()
                },
                performance: None,
                ai: None,
            },
        })
        .await
        .expect("scan should be stored")
}

fn plan_items(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let intent = if i % 2 == 0 { "informational" } else { "commercial" };
            json!({
                "date": format!("2026-04-{:02}", i + 1),
                "title": format!("Guide {} to structured data for product pages and rich results", i),
                "keyword": "structured data",
                "secondary_keywords": ["schema.org", "rich results"],
                "intent": intent,
                "length": 1500
            })
        })
        .collect()
}

#[tokio::test]
async fn health_reports_ok() {
    let ctx = build_test_context(Some(3)).await;
    let (status, body) = request_json(&ctx.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn generates_traditional_report_for_stored_scan() {
    let ctx = build_test_context(Some(3)).await;
    let scan = seed_example_scan(&ctx).await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/reports",
        Some(json!({ "user_id": "u1", "scan_id": scan.id })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["pages"], 5);
    assert_eq!(body["report_type"], "seo");
    assert_eq!(body["kind"], "seo");
    let file_name = body["file_name"].as_str().expect("file name");
    assert!(file_name.starts_with("seo-report-example-com-"));
    assert_eq!(
        body["file_url"],
        format!("{}/files/u1/{}", BASE_URL, file_name)
    );

    let stored = ctx.temp_dir.path().join("files").join("u1").join(file_name);
    let bytes = std::fs::read(&stored).expect("report file should exist");
    assert!(bytes.starts_with(b"%PDF-"));

    let req = Request::builder()
        .uri(format!("/files/u1/{}", file_name))
        .body(Body::empty())
        .expect("request should build");
    let (status, served) = send(&ctx.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, bytes);

    let (status, reports) = request_json(&ctx.app, "GET", "/api/reports?user_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    let reports = reports.as_array().expect("report list");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["kind"], "seo");
    assert_eq!(reports[0]["source"], "https://example.com/");
    assert_eq!(reports[0]["id"], body["report_id"]);
}

#[tokio::test]
async fn url_lookup_and_ai_flag_produce_seven_pages() {
    let ctx = build_test_context(None).await;
    seed_example_scan(&ctx).await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/reports",
        Some(json!({ "user_id": "u1", "url": "https://example.com/", "include_ai": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["pages"], 7);
    assert_eq!(body["kind"], "ai_enhanced");
    assert_eq!(body["report_type"], "seo");
}

#[tokio::test]
async fn missing_user_id_is_a_bad_request() {
    let ctx = build_test_context(Some(3)).await;
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/reports",
        Some(json!({ "url": "https://example.com/" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_id is required");
    assert!(body.get("limitExceeded").is_none());
}

fn count_pdfs(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .map(|path| {
            if path.is_dir() {
                count_pdfs(&path)
            } else {
                usize::from(path.extension().is_some_and(|ext| ext == "pdf"))
            }
        })
        .sum()
}

#[tokio::test]
async fn user_ids_that_are_paths_are_rejected() {
    let ctx = build_test_context(Some(3)).await;
    seed_example_scan(&ctx).await;

    for user_id in ["..", "alice/../bob", "../other-bucket", "a\\b"] {
        let (status, body) = request_json(
            &ctx.app,
            "POST",
            "/api/reports",
            Some(json!({ "user_id": user_id, "url": "https://example.com/" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{user_id}: {body}");
        assert!(body.get("limitExceeded").is_none());
    }

    let (status, _) =
        request_json(&ctx.app, "GET", "/api/reports?user_id=..", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(count_pdfs(ctx.temp_dir.path()), 0);
    let reports = ctx.state.repository.list_reports("u1").await.unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn exhausted_quota_is_forbidden_and_stores_nothing() {
    let ctx = build_test_context(Some(0)).await;
    let scan = seed_example_scan(&ctx).await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/reports",
        Some(json!({ "user_id": "u1", "scan_id": scan.id })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["limitExceeded"], true);
    assert_eq!(body["plan"], "free");
    assert_eq!(body["remaining"], 0);
    assert!(!ctx.temp_dir.path().join("files").join("u1").exists());

    let reports = ctx.state.repository.list_reports("u1").await.unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn scans_of_other_users_are_not_found() {
    let ctx = build_test_context(Some(3)).await;
    let scan = seed_example_scan(&ctx).await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/reports",
        Some(json!({ "user_id": "someone-else", "scan_id": scan.id })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Scan not found");
}

#[tokio::test]
async fn content_plan_flow_paginates_rows() {
    let ctx = build_test_context(Some(3)).await;

    let (status, plan) = request_json(
        &ctx.app,
        "POST",
        "/api/content-plans",
        Some(json!({
            "user_id": "u1",
            "main_topic": "Structured data",
            "items": plan_items(19),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{plan}");
    assert_eq!(plan["items"].as_array().map(Vec::len), Some(19));

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/reports",
        Some(json!({
            "user_id": "u1",
            "report_type": "content_plan",
            "main_topic": "Structured data",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["report_type"], "content_plan");
    assert_eq!(body["kind"], "content_plan");
    assert_eq!(body["pages"], 4);
    assert!(body["file_name"]
        .as_str()
        .is_some_and(|name| name.starts_with("content-plan-structured-data-")));
}

#[tokio::test]
async fn content_plan_with_unknown_intent_is_rejected() {
    let ctx = build_test_context(Some(3)).await;
    let mut items = plan_items(1);
    items[0]["intent"] = json!("curious");

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/content-plans",
        Some(json!({ "user_id": "u1", "main_topic": "Structured data", "items": items })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn scan_requests_are_validated_before_crawling() {
    let ctx = build_test_context(Some(3)).await;

    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/api/scans",
        Some(json!({ "user_id": "u1", "url": "ftp://example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Scan allowance is zero in the test plan
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/scans",
        Some(json!({ "user_id": "u1", "url": "https://example.com/" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["limitExceeded"], true);
}

#[tokio::test]
async fn listing_reports_requires_a_user() {
    let ctx = build_test_context(Some(3)).await;
    let (status, _) = request_json(&ctx.app, "GET", "/api/reports", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
