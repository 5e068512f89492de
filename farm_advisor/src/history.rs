//! Combined, newest-first view over soil samples and crop analyses.

use std::{cmp::Reverse, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use farm_data_ingestor::models::session::Session;
use serde::Serialize;

use crate::{
    records::{AnalysisQuery, AnalysisRecord, RecordError, RecordService, SoilQuery, SoilSample, SortOrder},
    tz::DayRange,
};

/// How many calendar days before today the history shows by default.
pub const DEFAULT_HISTORY_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySource {
    #[default]
    All,
    Soil,
    Crop,
}

impl HistorySource {
    fn includes_soil(self) -> bool {
        matches!(self, Self::All | Self::Soil)
    }

    fn includes_crops(self) -> bool {
        matches!(self, Self::All | Self::Crop)
    }
}

impl FromStr for HistorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "soil" => Ok(Self::Soil),
            "crop" | "crops" => Ok(Self::Crop),
            other => Err(format!("unknown history source `{other}` (expected all, soil or crop)")),
        }
    }
}

impl fmt::Display for HistorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Soil => "soil",
            Self::Crop => "crop",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "record", rename_all = "lowercase")]
pub enum HistoryEntry {
    Soil(SoilSample),
    Crop(AnalysisRecord),
}

impl HistoryEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Soil(s) => s.recorded_at,
            Self::Crop(c) => c.created_at,
        }
    }

    pub fn source(&self) -> HistorySource {
        match self {
            Self::Soil(_) => HistorySource::Soil,
            Self::Crop(_) => HistorySource::Crop,
        }
    }

    /// Soil advice joined into one paragraph, or the classifier's advice.
    pub fn recommendation_text(&self) -> String {
        match self {
            Self::Soil(s) => s.recommendations.join(" "),
            Self::Crop(c) => c.recommendation_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryQuery {
    pub source: HistorySource,
    pub range: DayRange,
}

/// Unions both record kinds, newest first, keeping only `source`.
///
/// The sort is stable, so entries with equal timestamps keep soil before
/// crop in input order.
pub fn merge_history(soil: &[SoilSample], crops: &[AnalysisRecord], source: HistorySource) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = Vec::with_capacity(soil.len() + crops.len());
    if source.includes_soil() {
        entries.extend(soil.iter().cloned().map(HistoryEntry::Soil));
    }
    if source.includes_crops() {
        entries.extend(crops.iter().cloned().map(HistoryEntry::Crop));
    }
    entries.sort_by_key(|e| Reverse(e.timestamp()));
    entries
}

/// Loads the history listing through the record service's cache using the
/// longer history TTL.
pub async fn load_history(
    records: &RecordService,
    session: &Session,
    query: &HistoryQuery,
) -> Result<Vec<HistoryEntry>, RecordError> {
    let ttl = records.history_ttl();

    let soil = if query.source.includes_soil() {
        let q = SoilQuery {
            range: Some(query.range),
            order: SortOrder::Desc,
            ..Default::default()
        };
        Some(records.list_soil_for(session, &q, ttl).await?)
    } else {
        None
    };

    let crops = if query.source.includes_crops() {
        let q = AnalysisQuery {
            range: Some(query.range),
            order: SortOrder::Desc,
            ..Default::default()
        };
        Some(records.list_analyses_for(session, &q, ttl).await?)
    } else {
        None
    };

    let entries = merge_history(
        soil.as_deref().map(Vec::as_slice).unwrap_or_default(),
        crops.as_deref().map(Vec::as_slice).unwrap_or_default(),
        query.source,
    );
    tracing::debug!(count = entries.len(), source = %query.source, "Loaded history");
    Ok(entries)
}
