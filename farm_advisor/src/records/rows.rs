//! Diesel row types and their mapping to the domain records.
//!
//! Timestamps are stored as RFC-3339 UTC strings with millisecond precision;
//! soil recommendations as a JSON array.

use diesel::prelude::*;

use super::{AnalysisRecord, NewAnalysisRecord, SoilSample, StoreError, UserProfile};
use crate::{
    schema::{crops, soil_data, users},
    soil::{NewSoilSample, SoilMeasurements},
    tz,
};

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = soil_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SoilRow {
    pub id: i32,
    pub user_id: String,
    pub location: String,
    pub ph_level: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub organic_matter: f64,
    pub moisture: f64,
    pub soil_type: String,
    pub recommendations: String,
    pub recorded_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = soil_data)]
pub struct NewSoilRow<'a> {
    pub user_id: &'a str,
    pub location: &'a str,
    pub ph_level: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub organic_matter: f64,
    pub moisture: f64,
    pub soil_type: &'a str,
    pub recommendations: String,
    pub recorded_at: String,
}

impl<'a> NewSoilRow<'a> {
    pub fn new(
        user_id: &'a str,
        sample: &'a NewSoilSample,
        recommendations: &[String],
        recorded_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self, StoreError> {
        let m = &sample.measurements;
        let values = [m.ph, m.nitrogen, m.phosphorus, m.potassium, m.organic_matter, m.moisture];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(StoreError::Invalid("soil measurements must be finite".into()));
        }
        let recommendations = serde_json::to_string(recommendations)
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        Ok(Self {
            user_id,
            location: &sample.location,
            ph_level: m.ph,
            nitrogen: m.nitrogen,
            phosphorus: m.phosphorus,
            potassium: m.potassium,
            organic_matter: m.organic_matter,
            moisture: m.moisture,
            soil_type: &sample.soil_type,
            recommendations,
            recorded_at: tz::to_rfc3339_millis(recorded_at),
        })
    }
}

fn corrupt(table: &'static str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        table,
        message: e.to_string(),
    }
}

impl TryFrom<SoilRow> for SoilSample {
    type Error = StoreError;

    fn try_from(row: SoilRow) -> Result<Self, Self::Error> {
        Ok(SoilSample {
            id: row.id,
            user_id: row.user_id,
            location: row.location,
            measurements: SoilMeasurements {
                ph: row.ph_level,
                nitrogen: row.nitrogen,
                phosphorus: row.phosphorus,
                potassium: row.potassium,
                organic_matter: row.organic_matter,
                moisture: row.moisture,
            },
            soil_type: row.soil_type,
            recommendations: serde_json::from_str(&row.recommendations).map_err(|e| corrupt("soil_data", e))?,
            recorded_at: tz::parse_ts_to_utc(&row.recorded_at).map_err(|e| corrupt("soil_data", e))?,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crops)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CropRow {
    pub id: i32,
    pub user_id: String,
    pub crop_name: Option<String>,
    pub disease_detected: Option<String>,
    pub confidence: f64,
    pub recommendations: String,
    pub image_url: String,
    pub file_path: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crops)]
pub struct NewCropRow<'a> {
    pub user_id: &'a str,
    pub crop_name: Option<&'a str>,
    pub disease_detected: Option<&'a str>,
    pub confidence: f64,
    pub recommendations: &'a str,
    pub image_url: &'a str,
    pub file_path: &'a str,
    pub created_at: String,
}

impl<'a> NewCropRow<'a> {
    pub fn new(user_id: &'a str, record: &'a NewAnalysisRecord) -> Result<Self, StoreError> {
        if !(0.0..=1.0).contains(&record.confidence) {
            return Err(StoreError::Invalid(format!(
                "confidence {} is outside [0, 1]",
                record.confidence
            )));
        }
        Ok(Self {
            user_id,
            crop_name: record.crop_name.as_deref(),
            disease_detected: record.disease_detected.as_deref(),
            confidence: record.confidence,
            recommendations: &record.recommendation_text,
            image_url: &record.image_url,
            file_path: &record.file_path,
            created_at: tz::to_rfc3339_millis(record.created_at),
        })
    }
}

impl TryFrom<CropRow> for AnalysisRecord {
    type Error = StoreError;

    fn try_from(row: CropRow) -> Result<Self, Self::Error> {
        Ok(AnalysisRecord {
            id: row.id,
            user_id: row.user_id,
            crop_name: row.crop_name,
            disease_detected: row.disease_detected,
            confidence: row.confidence,
            recommendation_text: row.recommendations,
            image_url: row.image_url,
            file_path: row.file_path,
            created_at: tz::parse_ts_to_utc(&row.created_at).map_err(|e| corrupt("crops", e))?,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: row.id,
            email: row.email,
            name: row.name,
            created_at: tz::parse_ts_to_utc(&row.created_at).map_err(|e| corrupt("users", e))?,
        })
    }
}
