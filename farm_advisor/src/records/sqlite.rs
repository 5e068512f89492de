use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use farm_data_ingestor::models::session::{Session, UserIdentity};
use tokio::sync::broadcast;

use super::{
    AnalysisQuery, AnalysisRecord, AnalysisStore, ChangeSource, NewAnalysisRecord, ProfileStore,
    RecordChange, RecordTable, SoilQuery, SoilSample, SoilStore, SortOrder, StoreError, UserProfile,
    rows::{CropRow, NewCropRow, NewSoilRow, SoilRow, UserRow},
};
use crate::{
    db::{connection::connect_sqlite, migrate},
    schema::{crops, soil_data, users},
    soil::NewSoilSample,
    tz,
};

/// Buffered change notifications per subscriber before it starts lagging.
const CHANGE_CAPACITY: usize = 64;

/// Record store over a single SQLite connection.
///
/// Diesel is synchronous, so every call runs on the blocking pool while
/// holding the connection mutex.
pub struct SqliteRecordStore {
    conn: Arc<Mutex<SqliteConnection>>,
    changes: broadcast::Sender<RecordChange>,
}

impl SqliteRecordStore {
    /// Opens the database at `url` and applies pending migrations.
    pub fn open(url: &str) -> anyhow::Result<Self> {
        let mut conn = connect_sqlite(url)?;
        migrate::run_pending(&mut conn).context("apply migrations")?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: SqliteConnection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            changes,
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut guard)
        })
        .await?
    }

    fn publish(&self, table: RecordTable, user_id: &str, id: i32) {
        // No subscribers is fine.
        let _ = self.changes.send(RecordChange {
            table,
            user_id: user_id.to_string(),
            id,
        });
    }
}

#[async_trait]
impl SoilStore for SqliteRecordStore {
    async fn insert_soil(
        &self,
        session: &Session,
        sample: &NewSoilSample,
        recommendations: &[String],
        recorded_at: DateTime<Utc>,
    ) -> Result<SoilSample, StoreError> {
        let user_id = session.user_id().to_string();
        let sample = sample.clone();
        let recommendations = recommendations.to_vec();

        let saved = self
            .with_conn(move |conn| {
                let row = NewSoilRow::new(&user_id, &sample, &recommendations, recorded_at)?;
                let stored: SoilRow = diesel::insert_into(soil_data::table)
                    .values(&row)
                    .returning(SoilRow::as_returning())
                    .get_result(conn)?;
                SoilSample::try_from(stored)
            })
            .await?;

        tracing::info!(id = saved.id, user_id = %saved.user_id, "Recorded soil sample");
        self.publish(RecordTable::SoilData, &saved.user_id, saved.id);
        Ok(saved)
    }

    async fn query_soil(&self, session: &Session, query: &SoilQuery) -> Result<Vec<SoilSample>, StoreError> {
        let user_id = session.user_id().to_string();
        let query = query.clone();

        self.with_conn(move |conn| {
            let mut q = soil_data::table
                .filter(soil_data::user_id.eq(user_id))
                .select(SoilRow::as_select())
                .into_boxed();

            if let Some(range) = query.range {
                q = q
                    .filter(soil_data::recorded_at.ge(tz::to_rfc3339_millis(range.start)))
                    .filter(soil_data::recorded_at.le(tz::to_rfc3339_millis(range.end)));
            }
            if let Some(location) = query.location {
                q = q.filter(soil_data::location.eq(location));
            }
            if let Some(soil_type) = query.soil_type {
                q = q.filter(soil_data::soil_type.eq(soil_type));
            }
            q = match query.order {
                SortOrder::Desc => q.order((soil_data::recorded_at.desc(), soil_data::id.desc())),
                SortOrder::Asc => q.order((soil_data::recorded_at.asc(), soil_data::id.asc())),
            };
            if let Some(limit) = query.limit {
                q = q.limit(limit);
            }

            let rows: Vec<SoilRow> = q.load(conn)?;
            rows.into_iter().map(SoilSample::try_from).collect()
        })
        .await
    }
}

#[async_trait]
impl AnalysisStore for SqliteRecordStore {
    async fn insert_analysis(
        &self,
        session: &Session,
        record: &NewAnalysisRecord,
    ) -> Result<AnalysisRecord, StoreError> {
        let user_id = session.user_id().to_string();
        let record = record.clone();

        let saved = self
            .with_conn(move |conn| {
                let row = NewCropRow::new(&user_id, &record)?;
                let stored: CropRow = diesel::insert_into(crops::table)
                    .values(&row)
                    .returning(CropRow::as_returning())
                    .get_result(conn)?;
                AnalysisRecord::try_from(stored)
            })
            .await?;

        tracing::info!(id = saved.id, user_id = %saved.user_id, path = %saved.file_path, "Recorded crop analysis");
        self.publish(RecordTable::Crops, &saved.user_id, saved.id);
        Ok(saved)
    }

    async fn query_analyses(
        &self,
        session: &Session,
        query: &AnalysisQuery,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let user_id = session.user_id().to_string();
        let query = query.clone();

        self.with_conn(move |conn| {
            let mut q = crops::table
                .filter(crops::user_id.eq(user_id))
                .select(CropRow::as_select())
                .into_boxed();

            if let Some(range) = query.range {
                q = q
                    .filter(crops::created_at.ge(tz::to_rfc3339_millis(range.start)))
                    .filter(crops::created_at.le(tz::to_rfc3339_millis(range.end)));
            }
            if let Some(crop_name) = query.crop_name {
                q = q.filter(crops::crop_name.eq(crop_name));
            }
            q = match query.order {
                SortOrder::Desc => q.order((crops::created_at.desc(), crops::id.desc())),
                SortOrder::Asc => q.order((crops::created_at.asc(), crops::id.asc())),
            };
            if let Some(limit) = query.limit {
                q = q.limit(limit);
            }

            let rows: Vec<CropRow> = q.load(conn)?;
            rows.into_iter().map(AnalysisRecord::try_from).collect()
        })
        .await
    }
}

#[async_trait]
impl ProfileStore for SqliteRecordStore {
    async fn ensure_profile(&self, user: &UserIdentity, name: Option<&str>) -> Result<UserProfile, StoreError> {
        let row = UserRow {
            id: user.id.clone(),
            email: user.email.clone(),
            name: name
                .or(user.name.as_deref())
                .unwrap_or_default()
                .trim()
                .to_string(),
            created_at: tz::to_rfc3339_millis(Utc::now()),
        };

        self.with_conn(move |conn| {
            let inserted = diesel::insert_into(users::table)
                .values(&row)
                .on_conflict(users::id)
                .do_nothing()
                .execute(conn)?;
            if inserted > 0 {
                tracing::info!(user_id = %row.id, "Created user profile");
            }
            let stored: UserRow = users::table
                .find(&row.id)
                .select(UserRow::as_select())
                .first(conn)?;
            UserProfile::try_from(stored)
        })
        .await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let stored: Option<UserRow> = users::table
                .find(user_id)
                .select(UserRow::as_select())
                .first(conn)
                .optional()?;
            stored.map(UserProfile::try_from).transpose()
        })
        .await
    }
}

impl ChangeSource for SqliteRecordStore {
    fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}
