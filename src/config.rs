//! Service configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

use crate::types::PageId;

const DEFAULT_STORE_DB: &str = "page_webhook";
const DEFAULT_STORE_COLLECTION: &str = "webhook_logs";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_WEBHOOK_PATH: &str = "/webhook";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_FORWARD_TIMEOUT_SECS: u64 = 15;

/// Configuration errors. Any of them aborts startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Immutable service configuration, shared behind `Arc` once loaded.
#[derive(Debug, Clone)]
pub struct Config {
    // Platform
    pub verify_token: String,
    pub page_id: PageId,
    pub page_access_token: Option<String>,
    pub app_secret: Option<String>,

    // Store
    pub store_uri: String,
    pub store_db: String,
    pub store_collection: String,
    pub store_timeout: Duration,

    // Server
    pub port: u16,
    pub webhook_paths: Vec<String>,

    // Forwarding
    pub forward_url: Option<String>,
    pub forward_api_key: Option<String>,
    pub forward_timeout: Duration,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            verify_token: required("VERIFY_TOKEN")?,
            page_id: PageId::new(required("PAGE_ID")?),
            page_access_token: get("PAGE_ACCESS_TOKEN"),
            app_secret: get("APP_SECRET"),
            store_uri: required("STORE_URI")?,
            store_db: get("STORE_DB").unwrap_or_else(|| DEFAULT_STORE_DB.to_string()),
            store_collection: get("STORE_COLLECTION")
                .unwrap_or_else(|| DEFAULT_STORE_COLLECTION.to_string()),
            store_timeout: Duration::from_millis(parse_or(
                "STORE_TIMEOUT_MS",
                get("STORE_TIMEOUT_MS"),
                DEFAULT_STORE_TIMEOUT_MS,
            )?),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            webhook_paths: webhook_paths(get("WEBHOOK_PATHS"))?,
            forward_url: get("FORWARD_URL"),
            forward_api_key: get("FORWARD_API_KEY"),
            forward_timeout: Duration::from_secs(parse_or(
                "FORWARD_TIMEOUT_SECS",
                get("FORWARD_TIMEOUT_SECS"),
                DEFAULT_FORWARD_TIMEOUT_SECS,
            )?),
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => preview(v),
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  PAGE_ID: {}", self.page_id);
        tracing::info!("  VERIFY_TOKEN: {}", preview(&self.verify_token));
        tracing::info!("  PAGE_ACCESS_TOKEN: {}", preview_opt(&self.page_access_token));
        tracing::info!("  APP_SECRET: {}", preview_opt(&self.app_secret));
        tracing::info!("  STORE: {}/{}", self.store_db, self.store_collection);
        tracing::info!("  WEBHOOK_PATHS: {}", self.webhook_paths.join(","));
        tracing::info!(
            "  FORWARD_URL: {}",
            self.forward_url.as_deref().unwrap_or("<not set>")
        );
        tracing::info!("  FORWARD_API_KEY: {}", preview_opt(&self.forward_api_key));
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Splits a comma-separated path list. Every path must start with `/`.
///
/// Repeated paths are kept once, in first-seen order.
fn webhook_paths(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(vec![DEFAULT_WEBHOOK_PATH.to_string()]);
    };

    let mut paths: Vec<String> = Vec::new();
    for path in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !paths.iter().any(|seen| seen == path) {
            paths.push(path.to_string());
        }
    }
    if paths.is_empty() || paths.iter().any(|p| !p.starts_with('/') || p == "/health") {
        return Err(ConfigError::Invalid {
            key: "WEBHOOK_PATHS",
            value,
        });
    }
    Ok(paths)
}
