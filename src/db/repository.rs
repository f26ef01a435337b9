use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{
    ContentPlan, ContentPlanItem, Feature, NewContentPlan, NewReport, NewScan, Report, Scan,
    ScanPayload,
};

use super::schema::SCHEMA;
use super::RecordStore;

pub struct Repository {
    conn: Connection,
}

/// Columns of a scan row before the payload is validated.
type RawScan = (i64, String, String, String, String);

/// Columns of a content plan item row before enums are parsed.
type RawItem = (String, String, String, String, String, u32, String);

/// Columns of a report row before the kind is parsed.
type RawReport = (i64, String, String, String, String, String, String, u32, String);

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Scan operations

    pub async fn insert_scan(&self, scan: NewScan) -> Result<Scan> {
        let payload = serde_json::to_string(&scan.payload)?;
        let created_at = Utc::now();
        let stamp = created_at.to_rfc3339();
        let (user_id, url) = (scan.user_id.clone(), scan.url.clone());
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO scans (user_id, url, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![user_id, url, payload, stamp],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(Scan {
            id,
            user_id: scan.user_id,
            url: scan.url,
            created_at,
            payload: scan.payload,
        })
    }

    pub async fn get_scan(&self, user_id: &str, scan_id: i64) -> Result<Option<Scan>> {
        let user_id = user_id.to_string();
        let raw = self
            .conn
            .call(move |conn| {
                let raw = conn
                    .query_row(
                        "SELECT id, user_id, url, payload, created_at FROM scans WHERE id = ?1 AND user_id = ?2",
                        params![scan_id, user_id],
                        raw_scan_from_row,
                    )
                    .optional()?;
                Ok(raw)
            })
            .await?;
        raw.map(scan_from_raw).transpose()
    }

    pub async fn latest_scan_for_url(&self, user_id: &str, url: &str) -> Result<Option<Scan>> {
        let user_id = user_id.to_string();
        let url = url.to_string();
        let raw = self
            .conn
            .call(move |conn| {
                let raw = conn
                    .query_row(
                        r#"SELECT id, user_id, url, payload, created_at FROM scans
                           WHERE user_id = ?1 AND url = ?2
                           ORDER BY id DESC LIMIT 1"#,
                        params![user_id, url],
                        raw_scan_from_row,
                    )
                    .optional()?;
                Ok(raw)
            })
            .await?;
        raw.map(scan_from_raw).transpose()
    }

    // Content plan operations

    pub async fn insert_content_plan(&self, plan: NewContentPlan) -> Result<ContentPlan> {
        let created_at = Utc::now();
        let stamp = created_at.to_rfc3339();
        let mut rows = Vec::with_capacity(plan.items.len());
        for item in &plan.items {
            rows.push((
                item.date.format("%Y-%m-%d").to_string(),
                item.title.clone(),
                item.keyword.clone(),
                serde_json::to_string(&item.secondary_keywords)?,
                item.intent.as_str(),
                item.length,
                item.status.as_str(),
            ));
        }
        let (user_id, main_topic) = (plan.user_id.clone(), plan.main_topic.clone());

        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO content_plans (user_id, main_topic, created_at) VALUES (?1, ?2, ?3)",
                    params![user_id, main_topic, stamp],
                )?;
                let plan_id = tx.last_insert_rowid();
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT INTO content_plan_items
                           (plan_id, position, publish_date, title, keyword, secondary_keywords, intent, length, status)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                    )?;
                    for (position, row) in rows.iter().enumerate() {
                        stmt.execute(params![
                            plan_id,
                            position as i64,
                            row.0,
                            row.1,
                            row.2,
                            row.3,
                            row.4,
                            row.5,
                            row.6,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(plan_id)
            })
            .await?;

        let mut items = plan.items;
        items.sort_by_key(|item| item.date);

        Ok(ContentPlan {
            id,
            user_id: plan.user_id,
            main_topic: plan.main_topic,
            created_at,
            items,
        })
    }

    pub async fn latest_content_plan(
        &self,
        user_id: &str,
        main_topic: &str,
    ) -> Result<Option<ContentPlan>> {
        let user_id = user_id.to_string();
        let main_topic = main_topic.to_string();
        let found = self
            .conn
            .call(move |conn| {
                let header = conn
                    .query_row(
                        r#"SELECT id, user_id, main_topic, created_at FROM content_plans
                           WHERE user_id = ?1 AND main_topic = ?2
                           ORDER BY id DESC LIMIT 1"#,
                        params![user_id, main_topic],
                        |row| {
                            Ok((
                                row.get::<_, i64>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some(header) = header else {
                    return Ok(None);
                };

                let mut stmt = conn.prepare(
                    r#"SELECT publish_date, title, keyword, secondary_keywords, intent, length, status
                       FROM content_plan_items WHERE plan_id = ?1
                       ORDER BY publish_date, position"#,
                )?;
                let items = stmt
                    .query_map(params![header.0], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<RawItem>, _>>()?;
                Ok(Some((header, items)))
            })
            .await?;

        let Some(((id, user_id, main_topic, created_at), raw_items)) = found else {
            return Ok(None);
        };

        let items = raw_items
            .into_iter()
            .map(item_from_raw)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ContentPlan {
            id,
            user_id,
            main_topic,
            created_at: parse_datetime(&created_at).unwrap_or_else(Utc::now),
            items,
        }))
    }

    // Report operations

    pub async fn insert_report(&self, report: NewReport) -> Result<Report> {
        let row = report.clone();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO reports (user_id, source, kind, file_name, storage_path, file_url, pages, generated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                    params![
                        row.user_id,
                        row.source,
                        row.kind.as_str(),
                        row.file_name,
                        row.storage_path,
                        row.file_url,
                        row.pages,
                        row.generated_at.to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(Report {
            id,
            user_id: report.user_id,
            source: report.source,
            kind: report.kind,
            file_name: report.file_name,
            storage_path: report.storage_path,
            file_url: report.file_url,
            pages: report.pages,
            generated_at: report.generated_at,
        })
    }

    pub async fn list_reports(&self, user_id: &str) -> Result<Vec<Report>> {
        let user_id = user_id.to_string();
        let raw = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, user_id, source, kind, file_name, storage_path, file_url, pages, generated_at
                       FROM reports WHERE user_id = ?1
                       ORDER BY generated_at DESC, id DESC"#,
                )?;
                let rows = stmt
                    .query_map(params![user_id], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                            row.get(8)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<RawReport>, _>>()?;
                Ok(rows)
            })
            .await?;

        raw.into_iter().map(report_from_raw).collect()
    }

    // Plan and usage tracking

    pub async fn get_plan(&self, user_id: &str) -> Result<Option<String>> {
        let user_id = user_id.to_string();
        let plan = self
            .conn
            .call(move |conn| {
                let plan = conn
                    .query_row(
                        "SELECT plan FROM subscriptions WHERE user_id = ?1",
                        params![user_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(plan)
            })
            .await?;
        Ok(plan)
    }

    pub async fn set_plan(&self, user_id: &str, plan: &str) -> Result<()> {
        let (user_id, plan) = (user_id.to_string(), plan.to_string());
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO subscriptions (user_id, plan) VALUES (?1, ?2)
                       ON CONFLICT(user_id) DO UPDATE SET
                           plan = excluded.plan,
                           updated_at = datetime('now')"#,
                    params![user_id, plan],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn count_usage(&self, user_id: &str, feature: Feature, period: &str) -> Result<u32> {
        let (user_id, period) = (user_id.to_string(), period.to_string());
        let count = self
            .conn
            .call(move |conn| {
                let count: u32 = conn.query_row(
                    "SELECT COUNT(*) FROM usage_events WHERE user_id = ?1 AND feature = ?2 AND period = ?3",
                    params![user_id, feature.as_str(), period],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    pub async fn record_usage(&self, user_id: &str, feature: Feature, period: &str) -> Result<()> {
        let (user_id, period) = (user_id.to_string(), period.to_string());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO usage_events (user_id, feature, period) VALUES (?1, ?2, ?3)",
                    params![user_id, feature.as_str(), period],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for Repository {
    async fn find_scan(
        &self,
        user_id: &str,
        scan_id: Option<i64>,
        url: Option<&str>,
    ) -> Result<Option<Scan>> {
        match (scan_id, url) {
            (Some(id), _) => self.get_scan(user_id, id).await,
            (None, Some(url)) => self.latest_scan_for_url(user_id, url).await,
            (None, None) => Ok(None),
        }
    }

    async fn find_content_plan(&self, user_id: &str, main_topic: &str) -> Result<Option<ContentPlan>> {
        self.latest_content_plan(user_id, main_topic).await
    }

    async fn insert_report(&self, report: NewReport) -> Result<Report> {
        Repository::insert_report(self, report).await
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn raw_scan_from_row(row: &Row) -> rusqlite::Result<RawScan> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn scan_from_raw((id, user_id, url, payload, created_at): RawScan) -> Result<Scan> {
    let payload: ScanPayload = serde_json::from_str(&payload)
        .map_err(|e| AppError::InvalidRecord(format!("scan {}: {}", id, e)))?;
    Ok(Scan {
        id,
        user_id,
        url,
        created_at: parse_datetime(&created_at).unwrap_or_else(Utc::now),
        payload,
    })
}

fn item_from_raw(
    (date, title, keyword, secondary, intent, length, status): RawItem,
) -> Result<ContentPlanItem> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| AppError::InvalidRecord(format!("content plan date '{}': {}", date, e)))?;
    Ok(ContentPlanItem {
        date,
        title,
        keyword,
        secondary_keywords: serde_json::from_str(&secondary)
            .map_err(|e| AppError::InvalidRecord(format!("secondary keywords: {}", e)))?,
        intent: intent.parse()?,
        length,
        status: status.parse()?,
    })
}

fn report_from_raw(
    (id, user_id, source, kind, file_name, storage_path, file_url, pages, generated_at): RawReport,
) -> Result<Report> {
    Ok(Report {
        id,
        user_id,
        source,
        kind: kind.parse()?,
        file_name,
        storage_path,
        file_url,
        pages,
        generated_at: parse_datetime(&generated_at).unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageInfo, ItemStatus, ReportKind, SearchIntent, SeoData};
    use tempfile::TempDir;

    async fn repository() -> (TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        (dir, repo)
    }

    fn new_scan(user_id: &str, url: &str, score: u8) -> NewScan {
        NewScan {
            user_id: user_id.to_string(),
            url: url.to_string(),
            payload: ScanPayload {
                seo: SeoData {
                    score,
                    title: Some("Example Domain".to_string()),
                    images: vec![ImageInfo {
                        src: "/logo.png".to_string(),
                        alt: None,
                    }],
                    ..Default::default()
                },
                performance: None,
                ai: None,
            },
        }
    }

    fn item(date: &str, title: &str) -> ContentPlanItem {
        ContentPlanItem {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            title: title.to_string(),
            keyword: "rust seo".to_string(),
            secondary_keywords: vec!["pdf".to_string()],
            intent: SearchIntent::Informational,
            length: 1200,
            status: ItemStatus::Planned,
        }
    }

    #[tokio::test]
    async fn scan_lookup_respects_owner_and_recency() {
        let (_dir, repo) = repository().await;
        let first = repo.insert_scan(new_scan("u1", "https://example.com", 60)).await.unwrap();
        let second = repo.insert_scan(new_scan("u1", "https://example.com", 72)).await.unwrap();
        repo.insert_scan(new_scan("u2", "https://example.com", 10)).await.unwrap();

        let latest = repo
            .find_scan("u1", None, Some("https://example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.payload.seo.score, 72);
        assert_eq!(latest.payload.seo.images_missing_alt(), 1);

        let by_id = repo.find_scan("u1", Some(first.id), None).await.unwrap().unwrap();
        assert_eq!(by_id.payload.seo.score, 60);

        assert!(repo.find_scan("u2", Some(first.id), None).await.unwrap().is_none());
        assert!(repo.find_scan("u1", None, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn content_plan_items_come_back_in_date_order() {
        let (_dir, repo) = repository().await;
        repo.insert_content_plan(NewContentPlan {
            user_id: "u1".to_string(),
            main_topic: "rust".to_string(),
            items: vec![
                item("2026-03-10", "Third"),
                item("2026-03-01", "First"),
                item("2026-03-05", "Second"),
            ],
        })
        .await
        .unwrap();

        let plan = repo.latest_content_plan("u1", "rust").await.unwrap().unwrap();
        let titles: Vec<_> = plan.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert_eq!(plan.items[0].secondary_keywords, vec!["pdf".to_string()]);
        assert!(repo.latest_content_plan("u1", "go").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reports_are_listed_newest_first() {
        let (_dir, repo) = repository().await;
        for (i, kind) in [ReportKind::Seo, ReportKind::ContentPlan].into_iter().enumerate() {
            repo.insert_report(NewReport {
                user_id: "u1".to_string(),
                source: "https://example.com".to_string(),
                kind,
                file_name: format!("report-{}.pdf", i),
                storage_path: format!("u1/report-{}.pdf", i),
                file_url: format!("http://localhost/files/u1/report-{}.pdf", i),
                pages: 5,
                generated_at: Utc::now() + chrono::Duration::seconds(i as i64),
            })
            .await
            .unwrap();
        }

        let reports = repo.list_reports("u1").await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].kind, ReportKind::ContentPlan);
        assert!(repo.list_reports("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn usage_is_counted_per_feature_and_period() {
        let (_dir, repo) = repository().await;
        repo.record_usage("u1", Feature::Pdf, "2026-10").await.unwrap();
        repo.record_usage("u1", Feature::Pdf, "2026-10").await.unwrap();
        repo.record_usage("u1", Feature::Ai, "2026-10").await.unwrap();
        repo.record_usage("u1", Feature::Pdf, "2026-09").await.unwrap();

        assert_eq!(repo.count_usage("u1", Feature::Pdf, "2026-10").await.unwrap(), 2);
        assert_eq!(repo.count_usage("u1", Feature::Ai, "2026-10").await.unwrap(), 1);
        assert_eq!(repo.count_usage("u2", Feature::Pdf, "2026-10").await.unwrap(), 0);

        assert!(repo.get_plan("u1").await.unwrap().is_none());
        repo.set_plan("u1", "pro").await.unwrap();
        repo.set_plan("u1", "agency").await.unwrap();
        assert_eq!(repo.get_plan("u1").await.unwrap().as_deref(), Some("agency"));
    }
}
