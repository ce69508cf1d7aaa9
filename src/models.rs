use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::classifier::Verdict;

/// The durable unit of output. One row per successful prediction, keyed by
/// `id`; immutable once persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: String,
    pub result: String,
    pub suggestion: String,
    pub created_at: String,
}

impl PredictionRecord {
    /// Builds a fresh record: new UUIDv4 id, current UTC time in ISO-8601
    /// with millisecond precision, label and suggestion taken from the
    /// verdict.
    pub fn new(verdict: Verdict) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            result: verdict.label().to_string(),
            suggestion: verdict.suggestion().to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: PredictionRecord,
}

impl PredictResponse {
    pub fn new(data: PredictionRecord) -> Self {
        Self {
            status: "success",
            message: "Model is predicted successfully",
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub history: PredictionRecord,
}

#[derive(Debug, Serialize)]
pub struct HistoriesResponse {
    pub status: &'static str,
    pub data: Vec<HistoryEntry>,
}

impl HistoriesResponse {
    pub fn new(records: Vec<PredictionRecord>) -> Self {
        Self {
            status: "success",
            data: records
                .into_iter()
                .map(|record| HistoryEntry {
                    id: record.id.clone(),
                    history: record,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailResponse {
    pub status: &'static str,
    pub message: String,
}

impl FailResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: message.into(),
        }
    }
}
