use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Externally reachable base URL, used to build links to locally stored files.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    pub pagespeed_api_key: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        #[serde(default = "default_storage_dir")]
        dir: String,
    },
    Remote {
        url: String,
        #[serde(default = "default_bucket")]
        bucket: String,
        api_key: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Remote plan service. When unset, usage is tracked in the local database.
    pub remote_url: Option<String>,

    #[serde(default = "default_plan")]
    pub default_plan: String,

    #[serde(default = "default_plans")]
    pub plans: HashMap<String, PlanLimits>,
}

/// Monthly allowance per feature. A missing value means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub pdf: Option<u32>,
    pub ai: Option<u32>,
    pub scan: Option<u32>,
}

fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seo-reporter");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
}

fn default_db_path() -> String {
    data_dir().join("reports.db").to_string_lossy().to_string()
}

fn default_storage_dir() -> String {
    data_dir().join("files").to_string_lossy().to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_bucket() -> String {
    "reports".to_string()
}

fn default_plan() -> String {
    "free".to_string()
}

fn default_plans() -> HashMap<String, PlanLimits> {
    HashMap::from([
        (
            "free".to_string(),
            PlanLimits {
                pdf: Some(3),
                ai: Some(5),
                scan: Some(10),
            },
        ),
        (
            "pro".to_string(),
            PlanLimits {
                pdf: Some(100),
                ai: Some(200),
                scan: Some(500),
            },
        ),
        ("agency".to_string(), PlanLimits::default()),
    ])
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            dir: default_storage_dir(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            default_plan: default_plan(),
            plans: default_plans(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            public_base_url: default_public_base_url(),
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            pagespeed_api_key: None,
            storage: StorageConfig::default(),
            quota: QuotaConfig::default(),
        }
    }
}

impl Config {
    /// Load the config from the default location, writing defaults on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config.with_env_overrides())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config.with_env_overrides())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("seo-reporter")
            .join("config.toml")
    }

    /// Secrets may live in the environment instead of the file.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("PAGESPEED_API_KEY") {
            self.pagespeed_api_key = Some(key);
        }
        if let StorageConfig::Remote { api_key, .. } = &mut self.storage {
            if let Ok(key) = std::env::var("STORAGE_API_KEY") {
                *api_key = Some(key);
            }
        }
        self
    }
}

impl QuotaConfig {
    pub fn plan_limits(&self, plan: &str) -> Option<&PlanLimits> {
        self.plans.get(plan)
    }
}
