//! Persisted soil samples and crop analyses.
//!
//! The store traits ([`SoilStore`], [`AnalysisStore`], [`ProfileStore`],
//! [`ChangeSource`]) are the seam between the core and persistence. Every
//! call that touches user rows takes the caller's [`Session`]; the
//! implementation derives the ownership filter from it and never accepts a
//! user id from anywhere else.
//!
//! [`SqliteRecordStore`] is the Diesel/SQLite implementation;
//! [`RecordService`] layers the query cache and invalidation on top.

pub mod rows;
pub mod service;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farm_data_ingestor::models::session::{Session, UserIdentity};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{soil::SoilMeasurements, tz::DayRange};

pub use service::{ChangeFeed, RecordError, RecordService};
pub use sqlite::SqliteRecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTable {
    SoilData,
    Crops,
}

impl RecordTable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SoilData => "soil_data",
            Self::Crops => "crops",
        }
    }
}

/// A stored soil sample. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    pub id: i32,
    pub user_id: String,
    pub location: String,
    pub measurements: SoilMeasurements,
    pub soil_type: String,
    pub recommendations: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Classifier output plus the stored artifact, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnalysisRecord {
    pub crop_name: Option<String>,
    pub disease_detected: Option<String>,
    pub confidence: f64,
    pub recommendation_text: String,
    pub image_url: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// A stored crop analysis. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i32,
    pub user_id: String,
    pub crop_name: Option<String>,
    pub disease_detected: Option<String>,
    pub confidence: f64,
    pub recommendation_text: String,
    pub image_url: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// Denormalized copy of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilQuery {
    /// Bounds on `recorded_at`, inclusive.
    pub range: Option<DayRange>,
    pub location: Option<String>,
    pub soil_type: Option<String>,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisQuery {
    /// Bounds on `created_at`, inclusive.
    pub range: Option<DayRange>,
    pub crop_name: Option<String>,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

/// Published after every successful insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordChange {
    pub table: RecordTable,
    pub user_id: String,
    pub id: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// A stored row could not be decoded.
    #[error("corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("value rejected by the store: {0}")]
    Invalid(String),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait SoilStore: Send + Sync {
    async fn insert_soil(
        &self,
        session: &Session,
        sample: &crate::soil::NewSoilSample,
        recommendations: &[String],
        recorded_at: DateTime<Utc>,
    ) -> Result<SoilSample, StoreError>;

    async fn query_soil(&self, session: &Session, query: &SoilQuery) -> Result<Vec<SoilSample>, StoreError>;
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn insert_analysis(
        &self,
        session: &Session,
        record: &NewAnalysisRecord,
    ) -> Result<AnalysisRecord, StoreError>;

    async fn query_analyses(
        &self,
        session: &Session,
        query: &AnalysisQuery,
    ) -> Result<Vec<AnalysisRecord>, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Creates the profile row on first sight of a user; existing rows are
    /// left untouched.
    async fn ensure_profile(&self, user: &UserIdentity, name: Option<&str>) -> Result<UserProfile, StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;
}

/// Source of [`RecordChange`] notifications.
pub trait ChangeSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<RecordChange>;
}

/// Everything the record service needs from persistence.
pub trait RecordStore: SoilStore + AnalysisStore + ProfileStore + ChangeSource {}

impl<T: SoilStore + AnalysisStore + ProfileStore + ChangeSource> RecordStore for T {}
