use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPlan {
    pub id: i64,
    pub user_id: String,
    pub main_topic: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ContentPlanItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPlanItem {
    pub date: NaiveDate,
    pub title: String,
    pub keyword: String,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    pub intent: SearchIntent,
    /// Target length in words.
    pub length: u32,
    #[serde(default)]
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchIntent {
    Informational,
    Commercial,
    Transactional,
    Navigational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Planned,
    InProgress,
    Published,
}

impl SearchIntent {
    pub const ALL: [SearchIntent; 4] = [
        SearchIntent::Informational,
        SearchIntent::Commercial,
        SearchIntent::Transactional,
        SearchIntent::Navigational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchIntent::Informational => "informational",
            SearchIntent::Commercial => "commercial",
            SearchIntent::Transactional => "transactional",
            SearchIntent::Navigational => "navigational",
        }
    }
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 3] = [
        ItemStatus::Planned,
        ItemStatus::InProgress,
        ItemStatus::Published,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Planned => "planned",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Published => "published",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Planned => "Planned",
            ItemStatus::InProgress => "In progress",
            ItemStatus::Published => "Published",
        }
    }
}

impl fmt::Display for SearchIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchIntent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchIntent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| AppError::InvalidRecord(format!("unknown search intent '{}'", s)))
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::InvalidRecord(format!("unknown item status '{}'", s)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContentPlan {
    pub user_id: String,
    pub main_topic: String,
    #[serde(default)]
    pub items: Vec<ContentPlanItem>,
}
