//! Wire types for the SearchService HTTP contract.
//!
//! Response types are lenient: optional fields default, unknown fields are
//! ignored. Request types serialize exactly the fields the service expects.

use serde::{Deserialize, Serialize};

/// Opaque document identifier assigned by the service.
pub type DocumentId = i64;

/// Dataset identifier assigned by the service.
pub type DatasetId = i64;

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    /// `null` selects the service's default dataset.
    pub dataset_id: Option<DatasetId>,
}

/// Response of `POST /search`. `results` and `scores` are index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<DocumentId>,
    #[serde(default)]
    pub scores: Vec<f64>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub total_found: Option<u64>,
}

/// Response of `GET /documents/{id}` and each entry of `GET /documents`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
}

impl Document {
    /// The label shown for a result: its first tag.
    pub fn title(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

/// One entry of `GET /datasets`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
    pub data_type: String,
    pub total_records: u64,
    pub created_at: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Format classification computed by the service for an upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatDetected {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResult {
    pub dataset_id: DatasetId,
    pub name: String,
    pub data_type: String,
    pub total_records: u64,
    pub format_detected: FormatDetected,
    #[serde(default)]
    pub sample_records: Vec<serde_json::Value>,
}

/// Error body returned by the service on a failed upload.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The human-readable `detail`, if it is a non-empty string.
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Response of `GET /`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: Option<String>,
}
