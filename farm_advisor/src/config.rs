//! Application configuration: parsing, normalization, and loading.
//!
//! `farm_advisor.toml` describes where the database lives, which external
//! services to talk to, and the tuning knobs of the cache and the submission
//! pipeline. Secrets never live in this file; they are read from the
//! environment by the provider constructors (`FARM_API_KEY`,
//! `WEATHER_API_KEY`).
//!
//! ```toml
//! [database]
//! url = "farm.db"
//!
//! [timezone]
//! name = "Africa/Nairobi"
//!
//! [auth]
//! base_url = "https://project.example.co"
//!
//! [storage]
//! backend = "http"
//! base_url = "https://project.example.co"
//! bucket = "crop-images"
//!
//! [classifier]
//! endpoint = "https://classifier.example.com/predict"
//! requests_per_minute = 30
//! ```
//!
//! Entrypoints: [`load_config_str`] and [`load_config_path`]. Both normalize
//! (trim, strip trailing slashes) and validate before returning.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use chrono_tz::Tz;
use farm_data_ingestor::{models::image::MAX_IMAGE_BYTES, providers::openweather::provider::DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};

use crate::tz::parse_tz;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseCfg,
    #[serde(default)]
    pub timezone: TimezoneCfg,
    pub auth: AuthCfg,
    pub storage: StorageCfg,
    pub classifier: ClassifierCfg,
    #[serde(default)]
    pub weather: WeatherCfg,
    #[serde(default)]
    pub cache: CacheCfg,
    #[serde(default)]
    pub pipeline: PipelineCfg,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseCfg {
    /// SQLite file path (or `:memory:`).
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimezoneCfg {
    /// IANA zone used for calendar-day filters.
    #[serde(default = "default_tz")]
    pub name: String,
}

impl Default for TimezoneCfg {
    fn default() -> Self {
        Self { name: default_tz() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthCfg {
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Storage REST API.
    #[default]
    Http,
    /// Local directory; handy for development.
    Fs,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageCfg {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Service URL (http) or public URL prefix (fs).
    pub base_url: Option<String>,
    /// Directory holding the objects (fs only).
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierCfg {
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub requests_per_minute: Option<u32>,
}

impl ClassifierCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherCfg {
    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

impl Default for WeatherCfg {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheCfg {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_history_ttl_secs")]
    pub history_ttl_secs: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            history_ttl_secs: default_history_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineCfg {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_tz() -> String {
    "UTC".to_string()
}
fn default_bucket() -> String {
    "crop-images".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_weather_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_ttl_secs() -> u64 {
    30
}
fn default_history_ttl_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_step_ms() -> u64 {
    1000
}
fn default_max_file_bytes() -> u64 {
    MAX_IMAGE_BYTES
}

fn clean_url(url: &mut String, what: &str) -> anyhow::Result<()> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("{what} cannot be empty");
    }
    *url = trimmed.to_string();
    Ok(())
}

impl AppConfig {
    pub fn tz(&self) -> anyhow::Result<Tz> {
        parse_tz(&self.timezone.name)
    }
}

/// Trims and validates a parsed configuration in place.
pub fn normalize_config(cfg: &mut AppConfig) -> anyhow::Result<()> {
    cfg.database.url = cfg.database.url.trim().to_string();
    if cfg.database.url.is_empty() {
        bail!("database.url cannot be empty");
    }

    cfg.timezone.name = cfg.timezone.name.trim().to_string();
    cfg.tz().context("timezone.name")?;

    clean_url(&mut cfg.auth.base_url, "auth.base_url")?;
    clean_url(&mut cfg.weather.base_url, "weather.base_url")?;

    let endpoint = cfg.classifier.endpoint.trim();
    if endpoint.is_empty() {
        bail!("classifier.endpoint cannot be empty");
    }
    cfg.classifier.endpoint = endpoint.to_string();
    if cfg.classifier.timeout_secs == 0 {
        bail!("classifier.timeout_secs must be at least 1");
    }
    if cfg.classifier.requests_per_minute == Some(0) {
        bail!("classifier.requests_per_minute must be at least 1");
    }

    let storage = &mut cfg.storage;
    storage.bucket = storage.bucket.trim().to_string();
    match storage.backend {
        StorageBackend::Http => {
            if storage.bucket.is_empty() {
                bail!("storage.bucket cannot be empty");
            }
            let url = storage
                .base_url
                .as_mut()
                .context("storage.base_url is required for the http backend")?;
            clean_url(url, "storage.base_url")?;
        }
        StorageBackend::Fs => {
            let root = storage
                .root
                .as_ref()
                .context("storage.root is required for the fs backend")?;
            let url = storage
                .base_url
                .get_or_insert_with(|| format!("file://{}", root.display()));
            clean_url(url, "storage.base_url")?;
        }
    }

    if cfg.pipeline.max_attempts == 0 {
        bail!("pipeline.max_attempts must be at least 1");
    }
    if cfg.pipeline.max_file_bytes == 0 {
        bail!("pipeline.max_file_bytes must be positive");
    }
    Ok(())
}

/// Parse + normalize from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AppConfig> {
    let mut cfg: AppConfig =
        shared_utils::config::parse_toml(toml_str).context("failed to parse config TOML")?;
    normalize_config(&mut cfg).context("invalid configuration")?;
    Ok(cfg)
}

/// Parse + normalize from a file path.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [database]
        url = " farm.db "

        [auth]
        base_url = "https://project.example.co/"

        [storage]
        base_url = "https://project.example.co"

        [classifier]
        endpoint = "https://classifier.example.com/predict"
    "#;

    #[test]
    fn defaults_fill_in() {
        let cfg = load_config_str(MINIMAL).unwrap();
        assert_eq!(cfg.database.url, "farm.db");
        assert_eq!(cfg.auth.base_url, "https://project.example.co");
        assert_eq!(cfg.timezone.name, "UTC");
        assert_eq!(cfg.storage.backend, StorageBackend::Http);
        assert_eq!(cfg.storage.bucket, "crop-images");
        assert_eq!(cfg.classifier.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.cache.ttl_secs, 30);
        assert_eq!(cfg.cache.history_ttl_secs, 60);
        assert_eq!(cfg.pipeline.max_attempts, 3);
        assert_eq!(cfg.pipeline.backoff_step_ms, 1000);
        assert_eq!(cfg.pipeline.max_file_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = format!("{MINIMAL}\n[cache]\nttl = 5\n");
        assert!(load_config_str(&text).is_err());
    }

    #[test]
    fn bad_timezone_is_rejected() {
        let text = format!("{MINIMAL}\n[timezone]\nname = \"Mars/Olympus\"\n");
        let err = load_config_str(&text).unwrap_err();
        assert!(format!("{err:#}").contains("timezone.name"));
    }

    #[test]
    fn fs_backend_needs_root_and_derives_url() {
        let text = r#"
            [database]
            url = "farm.db"
            [auth]
            base_url = "http://localhost:9999"
            [storage]
            backend = "fs"
            root = "/var/lib/farm/objects"
            [classifier]
            endpoint = "http://localhost:8080/predict"
        "#;
        let cfg = load_config_str(text).unwrap();
        assert_eq!(cfg.storage.base_url.as_deref(), Some("file:///var/lib/farm/objects"));

        let missing_root = text.replace("root = \"/var/lib/farm/objects\"", "");
        assert!(load_config_str(&missing_root).is_err());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let text = format!("{MINIMAL}\n[pipeline]\nmax_attempts = 0\n");
        assert!(load_config_str(&text).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farm_advisor.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        assert!(load_config_path(&path).is_ok());
        assert!(load_config_path(dir.path().join("missing.toml")).is_err());
    }
}
