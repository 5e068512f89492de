//! Wires configuration into live services.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use farm_data_ingestor::{
    models::session::Session,
    providers::{
        AuthProvider, CropClassifier, ObjectStorage, WeatherProvider,
        classifier_rest::provider::{ClassifierSettings, RestClassifier},
        gotrue::GoTrueAuth,
        object_storage::{FsObjectStorage, HttpObjectStorage},
        openweather::provider::OpenWeatherProvider,
    },
};
use secrecy::SecretString;
use shared_utils::env::get_env_var;

use crate::{
    clock::{Clock, SystemClock},
    config::{AppConfig, StorageBackend},
    pipeline::{LinearBackoff, PipelineSettings, SubmissionPipeline},
    records::{RecordService, RecordStore, SqliteRecordStore},
    session::SessionManager,
};

/// The signed-in side of the application: records, sessions and the
/// submission pipeline. Weather lookups need no account and are built
/// separately with [`build_weather`].
pub struct App {
    pub config: AppConfig,
    pub records: Arc<RecordService>,
    pub sessions: SessionManager,
    pub pipeline: SubmissionPipeline,
}

impl App {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = open_store(&config)?;
        let records = Arc::new(build_records(&config, store.clone(), Arc::clone(&clock))?);
        let sessions = SessionManager::new(build_auth(&config)?, store);
        let pipeline = build_pipeline(&config, records.clone(), clock)?;
        Ok(Self {
            config,
            records,
            sessions,
            pipeline,
        })
    }

    /// Signs in with `FARM_EMAIL` / `FARM_PASSWORD`.
    pub async fn sign_in_from_env(&self) -> anyhow::Result<Arc<Session>> {
        let (email, password) = credentials_from_env()?;
        let session = self.sessions.sign_in(&email, &password).await?;
        Ok(session)
    }
}

pub fn credentials_from_env() -> anyhow::Result<(String, SecretString)> {
    let email = get_env_var("FARM_EMAIL")?;
    let password = SecretString::new(get_env_var("FARM_PASSWORD")?.into());
    Ok((email, password))
}

pub fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteRecordStore>> {
    let store = SqliteRecordStore::open(&config.database.url)
        .with_context(|| format!("open database {}", config.database.url))?;
    Ok(Arc::new(store))
}

pub fn build_records(
    config: &AppConfig,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<RecordService> {
    let ttl = seconds(config.cache.ttl_secs).context("cache.ttl_secs")?;
    let history_ttl = seconds(config.cache.history_ttl_secs).context("cache.history_ttl_secs")?;
    Ok(RecordService::new(store, clock, ttl, history_ttl))
}

pub fn build_auth(config: &AppConfig) -> anyhow::Result<Arc<dyn AuthProvider>> {
    let auth = GoTrueAuth::new(&config.auth.base_url).context("build auth client")?;
    Ok(Arc::new(auth))
}

pub fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    let cfg = &config.storage;
    let base_url = cfg
        .base_url
        .as_deref()
        .context("storage.base_url is not set")?;
    let storage: Arc<dyn ObjectStorage> = match cfg.backend {
        StorageBackend::Http => Arc::new(
            HttpObjectStorage::new(base_url, cfg.bucket.as_str()).context("build storage client")?,
        ),
        StorageBackend::Fs => {
            let root = cfg.root.as_ref().context("storage.root is not set")?;
            Arc::new(FsObjectStorage::new(root, base_url))
        }
    };
    Ok(storage)
}

pub fn build_classifier(config: &AppConfig) -> anyhow::Result<Arc<dyn CropClassifier>> {
    let settings = ClassifierSettings {
        timeout: config.classifier.timeout(),
        requests_per_minute: config.classifier.requests_per_minute,
        ..ClassifierSettings::new(&config.classifier.endpoint)
    };
    let classifier = RestClassifier::new(settings).context("build classifier client")?;
    Ok(Arc::new(classifier))
}

pub fn build_weather(config: &AppConfig) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let weather = OpenWeatherProvider::new(&config.weather.base_url).context("build weather client")?;
    Ok(Arc::new(weather))
}

pub fn build_pipeline(
    config: &AppConfig,
    records: Arc<RecordService>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<SubmissionPipeline> {
    let settings = PipelineSettings {
        max_attempts: config.pipeline.max_attempts,
        max_file_bytes: config.pipeline.max_file_bytes,
    };
    let backoff = LinearBackoff::new(Duration::from_millis(config.pipeline.backoff_step_ms));
    Ok(
        SubmissionPipeline::new(build_storage(config)?, build_classifier(config)?, records)
            .with_backoff(Arc::new(backoff))
            .with_clock(clock)
            .with_settings(settings),
    )
}

fn seconds(secs: u64) -> anyhow::Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("duration out of range")
}
