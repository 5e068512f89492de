#![allow(dead_code)]

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use farm_advisor::{
    db::{connection, migrate},
    pipeline::Sleeper,
    records::{AnalysisQuery, AnalysisRecord, AnalysisStore, NewAnalysisRecord, SqliteRecordStore, StoreError},
    soil::{NewSoilSample, SoilMeasurements},
};
use farm_data_ingestor::{
    models::{
        classification::Classification,
        image::ImageUpload,
        session::{Session, UserIdentity},
    },
    providers::{CropClassifier, ObjectStorage, ProviderError},
};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub path: String,
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("farm.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

/// A migrated store over a fresh temp database.
pub fn setup_store() -> (TestDb, Arc<SqliteRecordStore>) {
    let (db, conn) = setup_db();
    (db, Arc::new(SqliteRecordStore::from_connection(conn)))
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn user(id: &str) -> UserIdentity {
    UserIdentity {
        id: id.to_string(),
        email: format!("{id}@farm.test"),
        name: None,
    }
}

pub fn session(user_id: &str) -> Session {
    Session::new(user(user_id), format!("token-{user_id}"))
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn soil_sample(location: &str, soil_type: &str) -> NewSoilSample {
    NewSoilSample {
        location: location.to_string(),
        measurements: SoilMeasurements::midpoint(),
        soil_type: soil_type.to_string(),
    }
}

pub fn analysis(file_path: &str, created_at: DateTime<Utc>) -> NewAnalysisRecord {
    NewAnalysisRecord {
        crop_name: Some("Maize".into()),
        disease_detected: Some("Leaf Blight".into()),
        confidence: 0.87,
        recommendation_text: "Remove infected leaves and apply fungicide.".into(),
        image_url: format!("https://cdn.farm.test/{file_path}"),
        file_path: file_path.to_string(),
        created_at,
    }
}

pub fn jpeg(len: usize) -> ImageUpload {
    ImageUpload::new("leaf.jpg", "image/jpeg", vec![0xAB; len])
}

pub fn healthy() -> Classification {
    Classification {
        disease: None,
        confidence: 0.93,
        recommendation: "Crop looks healthy.".into(),
        crop_name: Some("Tomato".into()),
    }
}

/// Object storage that records every call. Upload outcomes can be scripted;
/// unscripted calls succeed.
#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<String>>,
    pub removes: Mutex<Vec<String>>,
    pub upload_failures: Mutex<VecDeque<ProviderError>>,
    pub fail_remove: bool,
}

impl FakeStorage {
    pub fn failing_uploads(n: usize) -> Self {
        let failures = (0..n)
            .map(|i| ProviderError::Api {
                status: 503,
                message: format!("storage unavailable #{}", i + 1),
            })
            .collect();
        Self {
            upload_failures: Mutex::new(failures),
            ..Default::default()
        }
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn removes(&self) -> Vec<String> {
        self.removes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, path: &str, _bytes: &[u8], _content_type: &str) -> Result<(), ProviderError> {
        self.uploads.lock().unwrap().push(path.to_string());
        match self.upload_failures.lock().unwrap().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.farm.test/{path}")
    }

    async fn remove(&self, path: &str) -> Result<(), ProviderError> {
        self.removes.lock().unwrap().push(path.to_string());
        if self.fail_remove {
            return Err(ProviderError::Internal("remove failed".into()));
        }
        Ok(())
    }
}

/// Classifier that replays a script of outcomes, then keeps answering
/// with the fallback.
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<Classification, String>>>,
    fallback: Result<Classification, String>,
    pub calls: Mutex<u32>,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<Result<Classification, String>>, fallback: Result<Classification, String>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(0),
        }
    }

    pub fn always(outcome: Result<Classification, String>) -> Self {
        Self::new(Vec::new(), outcome)
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CropClassifier for ScriptedClassifier {
    async fn classify(&self, _image: &ImageUpload) -> Result<Classification, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(|message| ProviderError::Api { status: 503, message })
    }
}

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Analysis store that counts inserts and can be told to fail them.
#[derive(Default)]
pub struct MemoryAnalysisStore {
    pub inserted: Mutex<Vec<AnalysisRecord>>,
    pub fail: bool,
}

impl MemoryAnalysisStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn inserted(&self) -> Vec<AnalysisRecord> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn insert_analysis(
        &self,
        session: &Session,
        record: &NewAnalysisRecord,
    ) -> Result<AnalysisRecord, StoreError> {
        if self.fail {
            return Err(StoreError::Invalid("disk full".into()));
        }
        let mut rows = self.inserted.lock().unwrap();
        let saved = AnalysisRecord {
            id: rows.len() as i32 + 1,
            user_id: session.user_id().to_string(),
            crop_name: record.crop_name.clone(),
            disease_detected: record.disease_detected.clone(),
            confidence: record.confidence,
            recommendation_text: record.recommendation_text.clone(),
            image_url: record.image_url.clone(),
            file_path: record.file_path.clone(),
            created_at: record.created_at,
        };
        rows.push(saved.clone());
        Ok(saved)
    }

    async fn query_analyses(
        &self,
        session: &Session,
        _query: &AnalysisQuery,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        Ok(self
            .inserted()
            .into_iter()
            .filter(|r| r.user_id == session.user_id())
            .collect())
    }
}
