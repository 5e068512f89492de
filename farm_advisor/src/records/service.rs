use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use farm_data_ingestor::models::session::Session;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{
    AnalysisQuery, AnalysisRecord, AnalysisStore, NewAnalysisRecord, RecordChange, RecordStore,
    RecordTable, SoilQuery, SoilSample, StoreError,
};
use crate::{
    cache::{CacheKey, QueryCache},
    clock::Clock,
    soil::{InvalidSoilInput, NewSoilSample, SoilInput},
};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Invalid(#[from] InvalidSoilInput),

    #[error("Failed to save record")]
    Save(#[source] StoreError),

    #[error("Failed to load data")]
    Load(#[source] StoreError),
}

/// Cached, invalidating front of a [`RecordStore`].
///
/// Listings are cached per user and query shape. Writes made through the
/// service drop the writer's cached listings of the table written to.
pub struct RecordService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    soil_cache: QueryCache<Vec<SoilSample>>,
    analysis_cache: QueryCache<Vec<AnalysisRecord>>,
    ttl: Duration,
    history_ttl: Duration,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, ttl: Duration, history_ttl: Duration) -> Self {
        Self {
            store,
            soil_cache: QueryCache::new(Arc::clone(&clock)),
            analysis_cache: QueryCache::new(Arc::clone(&clock)),
            clock,
            ttl,
            history_ttl,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn history_ttl(&self) -> Duration {
        self.history_ttl
    }

    /// Validates a raw form and records it.
    pub async fn record_soil_input(&self, session: &Session, input: &SoilInput) -> Result<SoilSample, RecordError> {
        let sample = input.parse()?;
        self.record_soil(session, &sample).await
    }

    /// Stores a sample together with its recommendations, stamped now.
    pub async fn record_soil(&self, session: &Session, sample: &NewSoilSample) -> Result<SoilSample, RecordError> {
        let recommendations = sample.recommendations();
        let saved = self
            .store
            .insert_soil(session, sample, &recommendations, self.clock.now())
            .await
            .map_err(RecordError::Save)?;
        self.soil_cache
            .invalidate(RecordTable::SoilData.as_str(), session.user_id());
        Ok(saved)
    }

    pub async fn list_soil(&self, session: &Session, query: &SoilQuery) -> Result<Arc<Vec<SoilSample>>, RecordError> {
        self.list_soil_for(session, query, self.ttl).await
    }

    pub async fn list_soil_for(
        &self,
        session: &Session,
        query: &SoilQuery,
        ttl: Duration,
    ) -> Result<Arc<Vec<SoilSample>>, RecordError> {
        let key = CacheKey::new(RecordTable::SoilData.as_str(), session.user_id(), query);
        self.soil_cache
            .get_or_try_insert(key, ttl, || self.store.query_soil(session, query))
            .await
            .map_err(RecordError::Load)
    }

    pub async fn list_analyses(
        &self,
        session: &Session,
        query: &AnalysisQuery,
    ) -> Result<Arc<Vec<AnalysisRecord>>, RecordError> {
        self.list_analyses_for(session, query, self.ttl).await
    }

    pub async fn list_analyses_for(
        &self,
        session: &Session,
        query: &AnalysisQuery,
        ttl: Duration,
    ) -> Result<Arc<Vec<AnalysisRecord>>, RecordError> {
        let key = CacheKey::new(RecordTable::Crops.as_str(), session.user_id(), query);
        self.analysis_cache
            .get_or_try_insert(key, ttl, || self.store.query_analyses(session, query))
            .await
            .map_err(RecordError::Load)
    }

    /// Live inserts into `table` made by the session's user.
    pub fn subscribe(&self, session: &Session, table: RecordTable) -> ChangeFeed {
        ChangeFeed {
            rx: self.store.subscribe(),
            table,
            user_id: session.user_id().to_string(),
        }
    }
}

/// Writes through the service invalidate the cache, so the submission
/// pipeline persists through it rather than the raw store.
#[async_trait]
impl AnalysisStore for RecordService {
    async fn insert_analysis(
        &self,
        session: &Session,
        record: &NewAnalysisRecord,
    ) -> Result<AnalysisRecord, StoreError> {
        let saved = self.store.insert_analysis(session, record).await?;
        self.analysis_cache
            .invalidate(RecordTable::Crops.as_str(), session.user_id());
        Ok(saved)
    }

    async fn query_analyses(
        &self,
        session: &Session,
        query: &AnalysisQuery,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        self.store.query_analyses(session, query).await
    }
}

/// Change notifications for one table, restricted to one user.
pub struct ChangeFeed {
    rx: broadcast::Receiver<RecordChange>,
    table: RecordTable,
    user_id: String,
}

impl ChangeFeed {
    /// Waits for the next matching change. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<RecordChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.table == self.table && change.user_id == self.user_id => {
                    return Some(change);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, table = self.table.as_str(), "Change feed lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
