use crate::error::SubmitError;
use crate::orchestrator::ProcessedRun;
use crate::workflow::Workflow;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub include_evidence: bool,
    pub user_agent: String,
    pub auto_save: bool,
    pub export_json: Option<std::path::PathBuf>,
    pub frames_dir: Option<std::path::PathBuf>,
}

/// A video accepted by the acquisition gate.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub name: String,
    pub mime: String,
    pub payload: Bytes,
}

impl MediaFile {
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// One submission of a [`MediaFile`]. Never retried automatically.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub generation: u64,
    pub request_id: String,
    pub file: MediaFile,
    pub include_evidence: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Authentic,
    Manipulated,
    Indeterminate,
    /// Any verdict string the client does not know about.
    Unrecognized(String),
}

impl Category {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "REAL" => Category::Authentic,
            "FAKE" => Category::Manipulated,
            "SUSPICIOUS" => Category::Indeterminate,
            other => Category::Unrecognized(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Category::Authentic => "REAL",
            Category::Manipulated => "FAKE",
            Category::Indeterminate => "SUSPICIOUS",
            Category::Unrecognized(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceFrame {
    /// Inline image payload as returned by the service (usually a data URL).
    pub image: String,
    pub frame_index: i64,
    pub score: f64,
    pub is_key_detection: bool,
}

/// Service-side bookkeeping that accompanies a verdict when available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub cached: Option<bool>,
    pub video_hash: Option<String>,
    pub blockchain_tx_hash: Option<String>,
    pub blockchain_url: Option<String>,
    pub blockchain_verified: Option<bool>,
    pub analysis_duration_s: Option<f64>,
    pub original_filename: Option<String>,
    pub analysis_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub category: Category,
    pub confidence: f64,
    pub source_name: String,
    // Shared with the navigator so frame images are not copied per snapshot.
    pub evidence_frames: Arc<[EvidenceFrame]>,
    pub provenance: Provenance,
}

/// Success body of `POST /predict-video`.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub confidence: f64,
    pub filename: String,
    #[serde(default)]
    pub gradcam_frames: Option<Vec<GradcamFrame>>,
    #[serde(default)]
    pub cached: Option<bool>,
    #[serde(default)]
    pub video_hash: Option<String>,
    #[serde(default)]
    pub blockchain_tx_hash: Option<String>,
    #[serde(default)]
    pub blockchain_url: Option<String>,
    #[serde(default)]
    pub blockchain_verified: Option<bool>,
    #[serde(default)]
    pub analysis_duration: Option<f64>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub analysis_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradcamFrame {
    pub image: String,
    pub frame_number: i64,
    pub score: f64,
    #[serde(default)]
    pub detection_frame: bool,
}

/// Error body of any non-2xx response. `detail` is a string for handled
/// errors but may be a structured list for request validation failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl From<PredictResponse> for AnalysisResult {
    fn from(r: PredictResponse) -> Self {
        let frames: Vec<EvidenceFrame> = r
            .gradcam_frames
            .unwrap_or_default()
            .into_iter()
            .map(|f| EvidenceFrame {
                image: f.image,
                frame_index: f.frame_number,
                score: f.score,
                is_key_detection: f.detection_frame,
            })
            .collect();

        AnalysisResult {
            category: Category::from_wire(&r.prediction),
            confidence: r.confidence,
            source_name: r.filename,
            evidence_frames: frames.into(),
            provenance: Provenance {
                cached: r.cached,
                video_hash: r.video_hash,
                blockchain_tx_hash: r.blockchain_tx_hash,
                blockchain_url: r.blockchain_url,
                blockchain_verified: r.blockchain_verified,
                analysis_duration_s: r.analysis_duration,
                original_filename: r.original_filename,
                analysis_timestamp: r.analysis_timestamp,
            },
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub blockchain_connected: Option<bool>,
    #[serde(default)]
    pub database: Option<String>,
}

/// A verdict stored by the service, as returned by `GET /analysis/{hash}`
/// and inside `GET /history` pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub video_hash: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub prediction: String,
    pub confidence: f64,
    #[serde(default)]
    pub blockchain_tx_hash: Option<String>,
    #[serde(default)]
    pub blockchain_verified: Option<bool>,
    #[serde(default)]
    pub blockchain_url: Option<String>,
    #[serde(default)]
    pub analysis_timestamp: Option<String>,
    #[serde(default)]
    pub analysis_duration: Option<f64>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub gradcam_generated: Option<bool>,
}

/// Body of `GET /history?limit=&offset=`, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    #[serde(default)]
    pub analyses: Vec<StoredAnalysis>,
}

/// Body of `GET /blockchain/{tx_hash}`: the service's log entry plus a
/// receipt fetched from the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxStatus {
    #[serde(default)]
    pub id: Option<i64>,
    pub tx_hash: String,
    #[serde(default)]
    pub video_hash: Option<String>,
    #[serde(default)]
    pub is_fake: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub block_number: Option<u64>,
    /// `pending`, `confirmed` or `failed`.
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<String>,
    #[serde(default)]
    pub blockchain_receipt: TxReceipt,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxReceipt {
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub gas_used: Option<u64>,
    /// 1 for success, 0 for a reverted transaction.
    #[serde(default)]
    pub status: Option<i64>,
}

/// Body of `GET /stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub total_analyses: u64,
    pub fake_detected: u64,
    pub real_verified: u64,
    pub suspicious: i64,
    pub blockchain_verified: u64,
}

/// Persisted summary of one verdict. Evidence images are not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp_utc: String,
    pub base_url: String,
    pub request_id: String,
    pub source_name: String,
    pub file_size: u64,
    pub prediction: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<FrameRecord>,
    #[serde(default)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: i64,
    pub score: f64,
    pub is_key_detection: bool,
}

/// Events published by the controller to presentation layers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    // Box to keep AppEvent small; the workflow carries the file payload handle and result.
    Workflow(Box<Workflow>),
    Processed(Box<ProcessedRun>),
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    Opening { path: String },
    Dispatched { request_id: String, name: String },
    StaleDiscarded { generation: u64 },
    SubmissionFailed(SubmitError),
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Opening { path } => format!("Opening {path}"),
            InfoEvent::Dispatched { request_id, name } => {
                format!("Uploading {name} (request {request_id})")
            }
            InfoEvent::StaleDiscarded { generation } => {
                format!("Discarded late response for abandoned request #{generation}")
            }
            InfoEvent::SubmissionFailed(e) => format!("Analysis failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_categories_map_to_closed_set() {
        assert_eq!(Category::from_wire("REAL"), Category::Authentic);
        assert_eq!(Category::from_wire("FAKE"), Category::Manipulated);
        assert_eq!(Category::from_wire("SUSPICIOUS"), Category::Indeterminate);
        assert_eq!(
            Category::from_wire("real"),
            Category::Unrecognized("real".into())
        );
        assert_eq!(Category::from_wire("UNKNOWN").as_wire(), "UNKNOWN");
    }

    #[test]
    fn predict_response_preserves_frame_order() {
        let body = r#"{
            "prediction": "FAKE",
            "confidence": 0.91,
            "filename": "clip.mp4",
                        "cached": false,
            "video_hash": "abc123",
            "gradcam_frames": [
                {"image": "data:image/jpeg;base64,AAAA", "frame_number": 40, "score": 0.7, "detection_frame": false},
                {"image": "data:image/jpeg;base64,BBBB", "frame_number": 12, "score": 0.95, "detection_frame": true}
            ]
        }"#;
        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        let result = AnalysisResult::from(parsed);

        assert_eq!(result.category, Category::Manipulated);
        assert_eq!(result.source_name, "clip.mp4");
        assert_eq!(result.evidence_frames.len(), 2);
        assert_eq!(result.evidence_frames[0].frame_index, 40);
        assert_eq!(result.evidence_frames[1].frame_index, 12);
        assert!(result.evidence_frames[1].is_key_detection);
        assert_eq!(result.provenance.video_hash.as_deref(), Some("abc123"));
        assert_eq!(result.provenance.cached, Some(false));
    }

    #[test]
    fn missing_or_null_frames_become_empty() {
        let missing: PredictResponse =
            serde_json::from_str(r#"{"prediction":"REAL","confidence":0.5,"filename":"a.mp4"}"#)
                .unwrap();
        assert!(AnalysisResult::from(missing).evidence_frames.is_empty());

        let null: PredictResponse = serde_json::from_str(
            r#"{"prediction":"REAL","confidence":0.5,"filename":"a.mp4","gradcam_frames":null}"#,
        )
        .unwrap();
        assert!(AnalysisResult::from(null).evidence_frames.is_empty());
    }
}
