mod repository;
mod schema;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContentPlan, NewReport, Report, Scan};

pub use repository::Repository;

/// Lookup of source records and persistence of finished reports.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `scan_id` takes precedence over `url`; by URL the newest scan wins.
    async fn find_scan(
        &self,
        user_id: &str,
        scan_id: Option<i64>,
        url: Option<&str>,
    ) -> Result<Option<Scan>>;

    async fn find_content_plan(&self, user_id: &str, main_topic: &str)
        -> Result<Option<ContentPlan>>;

    async fn insert_report(&self, report: NewReport) -> Result<Report>;
}
