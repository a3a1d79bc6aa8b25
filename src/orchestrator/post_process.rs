//! Post-result processing utilities.
//!
//! Handles record building, auto-save, JSON export and evidence frame
//! extraction after a verdict arrives.

use crate::model::{AnalysisRecord, AnalysisResult, FrameRecord, MediaFile, RunConfig};
use crate::storage;
use std::path::PathBuf;
use tracing::warn;

/// Result of post-result processing, ready for presentation layers.
#[derive(Debug, Clone)]
pub struct ProcessedRun {
    pub record: AnalysisRecord,
    pub auto_saved_path: Option<PathBuf>,
    pub frame_paths: Vec<PathBuf>,
    pub messages: Vec<String>,
}

pub(crate) fn build_record(
    cfg: &RunConfig,
    request_id: &str,
    file: &MediaFile,
    result: &AnalysisResult,
) -> AnalysisRecord {
    AnalysisRecord {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        base_url: cfg.base_url.clone(),
        request_id: request_id.to_string(),
        source_name: result.source_name.clone(),
        file_size: file.size(),
        prediction: result.category.as_wire().to_string(),
        confidence: result.confidence,
        evidence: result
            .evidence_frames
            .iter()
            .map(|f| FrameRecord {
                frame_index: f.frame_index,
                score: f.score,
                is_key_detection: f.is_key_detection,
            })
            .collect(),
        provenance: result.provenance.clone(),
    }
}

/// Process a verdict: auto-save, export and write frames as configured.
/// Failures here are reported as messages and never fail the workflow.
pub(crate) fn process_result_completion(
    cfg: &RunConfig,
    request_id: &str,
    file: &MediaFile,
    result: &AnalysisResult,
) -> ProcessedRun {
    let record = build_record(cfg, request_id, file, result);
    let mut messages = Vec::new();

    let auto_saved_path = if cfg.auto_save {
        match storage::save_run(&record) {
            Ok(p) => {
                messages.push(format!("Saved: {}", p.display()));
                Some(p)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "auto-save failed");
                messages.push(format!("Save failed: {e:#}"));
                None
            }
        }
    } else {
        None
    };

    if let Some(export_path) = cfg.export_json.as_deref() {
        match storage::export_json(export_path, &record) {
            Ok(_) => messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    let mut frame_paths = Vec::new();
    if let Some(dir) = cfg.frames_dir.as_deref() {
        if result.evidence_frames.is_empty() {
            messages.push("No evidence frames to write".to_string());
        } else {
            match storage::write_frames(dir, &result.evidence_frames) {
                Ok(paths) => {
                    messages.push(format!(
                        "Wrote {} evidence frame(s) to {}",
                        paths.len(),
                        dir.display()
                    ));
                    frame_paths = paths;
                }
                Err(e) => messages.push(format!("Writing evidence frames failed: {e:#}")),
            }
        }
    }

    ProcessedRun {
        record,
        auto_saved_path,
        frame_paths,
        messages,
    }
}

/// Run `process_result_completion` on the blocking pool; saving and frame
/// extraction touch the filesystem once per frame.
pub(crate) async fn process_off_runtime(
    cfg: RunConfig,
    request_id: String,
    file: MediaFile,
    result: AnalysisResult,
) -> ProcessedRun {
    let fallback = build_record(&cfg, &request_id, &file, &result);
    match tokio::task::spawn_blocking(move || {
        process_result_completion(&cfg, &request_id, &file, &result)
    })
    .await
    {
        Ok(processed) => processed,
        Err(e) => {
            warn!(error = %e, "post-processing task failed");
            ProcessedRun {
                record: fallback,
                auto_saved_path: None,
                frame_paths: Vec::new(),
                messages: vec![format!("Post-processing failed: {e}")],
            }
        }
    }
}
