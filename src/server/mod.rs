//! HTTP surface: shared state, routes and middleware.

mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::ai::SeoAdvisor;
use crate::config::{Config, StorageConfig};
use crate::db::Repository;
use crate::error::Result;
use crate::report::ReportComposer;
use crate::services::{
    HttpObjectStore, LocalObjectStore, LocalQuota, ObjectStore, PageSpeedClient, QuotaService,
    RemoteQuota, Scanner,
};

/// Collaborators shared by every request. Built once from the config.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub quota: Arc<dyn QuotaService>,
    pub scanner: Arc<Scanner>,
    pub composer: Arc<ReportComposer>,
    /// Directory served under `/files` when reports are stored locally.
    pub files_dir: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);

        let quota: Arc<dyn QuotaService> = match &config.quota.remote_url {
            Some(url) => Arc::new(RemoteQuota::new(url)?),
            None => Arc::new(LocalQuota::new(repository.clone(), config.quota.clone())),
        };

        let (storage, files_dir): (Arc<dyn ObjectStore>, Option<PathBuf>) = match &config.storage {
            StorageConfig::Local { dir } => {
                let store = LocalObjectStore::new(dir, &config.public_base_url);
                let root = store.root().to_path_buf();
                (Arc::new(store), Some(root))
            }
            StorageConfig::Remote {
                url,
                bucket,
                api_key,
            } => (
                Arc::new(HttpObjectStore::new(url, bucket, api_key.clone())?),
                None,
            ),
        };

        let advisor = match &config.openai_api_key {
            Some(key) => Some(Arc::new(SeoAdvisor::new(
                key.clone(),
                &config.openai_base_url,
                &config.openai_model,
            )?)),
            None => {
                tracing::info!("No OpenAI key configured, AI reports will use stored analysis only");
                None
            }
        };

        let pagespeed = match &config.pagespeed_api_key {
            Some(key) => Some(PageSpeedClient::new(Some(key.clone()))?),
            None => None,
        };
        let scanner = Arc::new(Scanner::new(pagespeed)?);

        let composer = Arc::new(ReportComposer::new(
            repository.clone(),
            storage,
            quota.clone(),
            advisor,
        ));

        Ok(Self {
            repository,
            quota,
            scanner,
            composer,
            files_dir,
            started_at: Utc::now(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/reports",
            post(handlers::create_report).get(handlers::list_reports),
        )
        .route("/api/scans", post(handlers::create_scan))
        .route("/api/content-plans", post(handlers::create_content_plan));

    if let Some(dir) = &state.files_dir {
        router = router.nest_service("/files", ServeDir::new(dir));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
