//! Text and JSON summary builders for CLI output.

use crate::interpret::{format_percent, present};
use crate::model::{
    AnalysisRecord, AnalysisResult, Category, HistoryPage, Provenance, ServiceStats,
    StoredAnalysis, TxStatus,
};
use crate::navigator::VisualizationNavigator;
use crate::orchestrator::ProcessedRun;
use serde::Serialize;
use std::path::PathBuf;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Machine-readable output for `--json`.
#[derive(Debug, Serialize)]
pub(crate) struct JsonSummary<'a> {
    pub headline: &'static str,
    pub confidence_text: String,
    pub key_detections: Vec<i64>,
    #[serde(flatten)]
    pub record: &'a AnalysisRecord,
    #[serde(skip_serializing_if = "no_files")]
    pub frame_files: &'a [PathBuf],
}

fn no_files(files: &&[PathBuf]) -> bool {
    files.is_empty()
}

pub(crate) fn provenance_lines(p: &Provenance) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(hash) = p.video_hash.as_deref() {
        lines.push(format!("Video hash: {hash}"));
    }
    if p.cached == Some(true) {
        let when = p.analysis_timestamp.as_deref().unwrap_or("-");
        let name = p.original_filename.as_deref().unwrap_or("-");
        lines.push(format!("Cached verdict from {when} (originally {name})"));
    }
    if let Some(tx) = p.blockchain_tx_hash.as_deref() {
        let state = match p.blockchain_verified {
            Some(true) => "verified",
            _ => "pending",
        };
        lines.push(format!("Blockchain record: {tx} ({state})"));
    }
    if let Some(url) = p.blockchain_url.as_deref() {
        lines.push(format!("Explorer: {url}"));
    }
    if let Some(secs) = p.analysis_duration_s {
        lines.push(format!("Analysis time: {secs:.2} s"));
    }
    lines
}

/// Build a text summary from a verdict and its evidence.
pub(crate) fn build_text_summary(
    result: &AnalysisResult,
    navigator: &VisualizationNavigator,
    processed: Option<&ProcessedRun>,
) -> TextSummary {
    let p = present(&result.category);
    let mut lines = vec![
        format!("File: {}", result.source_name),
        format!(
            "Verdict: {} ({})",
            p.headline,
            result.category.as_wire()
        ),
        format!("Confidence: {}", format_percent(result.confidence)),
    ];
    lines.extend(p.guidance.iter().map(|g| format!("  - {g}")));
    lines.extend(provenance_lines(&result.provenance));

    if navigator.has_evidence() {
        lines.push(format!("Evidence frames: {}", navigator.len()));
        for (i, f) in navigator.frames().iter().enumerate() {
            lines.push(format!(
                "  {:>2}. frame #{:<6} score {:>6}{}",
                i + 1,
                f.frame_index,
                format_percent(f.score),
                if f.is_key_detection { "  [key detection]" } else { "" }
            ));
        }
    } else {
        lines.push("Evidence frames: none".to_string());
    }

    if let Some(processed) = processed {
        for p in &processed.frame_paths {
            lines.push(format!("  wrote {}", p.display()));
        }
    }

    TextSummary { lines }
}

pub(crate) fn build_json_summary<'a>(
    result: &AnalysisResult,
    processed: &'a ProcessedRun,
) -> JsonSummary<'a> {
    JsonSummary {
        headline: present(&result.category).headline,
        confidence_text: format_percent(result.confidence),
        key_detections: result
            .evidence_frames
            .iter()
            .filter(|f| f.is_key_detection)
            .map(|f| f.frame_index)
            .collect(),
        record: &processed.record,
        frame_files: &processed.frame_paths,
    }
}

pub(crate) fn stored_analysis_lines(a: &StoredAnalysis) -> Vec<String> {
    let category = Category::from_wire(&a.prediction);
    let mut lines = vec![
        format!("Video hash: {}", a.video_hash),
        format!(
            "Verdict: {} ({})",
            present(&category).headline,
            category.as_wire()
        ),
        format!("Confidence: {}", format_percent(a.confidence)),
    ];
    if let Some(name) = a.filename.as_deref() {
        lines.push(format!("File: {name}"));
    }
    if let Some(when) = a.analysis_timestamp.as_deref() {
        lines.push(format!("Analyzed: {when}"));
    }
    if let Some(model) = a.model_version.as_deref() {
        lines.push(format!("Model: {model}"));
    }
    if let Some(tx) = a.blockchain_tx_hash.as_deref() {
        let state = if a.blockchain_verified == Some(true) {
            "verified"
        } else {
            "pending"
        };
        lines.push(format!("Blockchain record: {tx} ({state})"));
    }
    if let Some(url) = a.blockchain_url.as_deref() {
        lines.push(format!("Explorer: {url}"));
    }
    lines
}

pub(crate) fn tx_status_lines(t: &TxStatus) -> Vec<String> {
    let mut lines = vec![
        format!("Transaction: {}", t.tx_hash),
        format!("Status: {}", t.status),
    ];
    if let Some(hash) = t.video_hash.as_deref() {
        lines.push(format!("Video hash: {hash}"));
    }
    if let Some(fake) = t.is_fake {
        let verdict = if fake { "deepfake" } else { "authentic" };
        let confidence = t.confidence.map(format_percent).unwrap_or_else(|| "-".into());
        lines.push(format!("Recorded verdict: {verdict} ({confidence})"));
    }
    let r = &t.blockchain_receipt;
    if r.confirmed {
        let block = r
            .block_number
            .or(t.block_number)
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".into());
        let outcome = match r.status {
            Some(1) => "succeeded",
            Some(_) => "reverted",
            None => "unknown outcome",
        };
        lines.push(format!("Receipt: block {block}, {outcome}"));
        if let Some(gas) = r.gas_used {
            lines.push(format!("Gas used: {gas}"));
        }
    } else {
        lines.push("Receipt: not yet mined".to_string());
    }
    if let Some(at) = t.confirmed_at.as_deref() {
        lines.push(format!("Confirmed at: {at}"));
    }
    lines
}

pub(crate) fn history_page_lines(page: &HistoryPage) -> Vec<String> {
    let first = page.offset as u64 + 1;
    let mut lines = vec![if page.analyses.is_empty() {
        format!(
            "Service history: nothing after {} of {}",
            page.offset, page.total
        )
    } else {
        format!(
            "Service history: {}-{} of {}",
            first,
            first + page.analyses.len() as u64 - 1,
            page.total
        )
    }];
    for a in &page.analyses {
        let short: String = a.video_hash.chars().take(12).collect();
        lines.push(format!(
            "  {}  {:<10} {:>6}  {}  {}",
            a.analysis_timestamp.as_deref().unwrap_or("-"),
            a.prediction,
            format_percent(a.confidence),
            short,
            a.filename.as_deref().unwrap_or("-")
        ));
    }
    lines
}

pub(crate) fn stats_lines(s: &ServiceStats) -> Vec<String> {
    vec![
        format!("Total analyses: {}", s.total_analyses),
        format!("Deepfakes detected: {}", s.fake_detected),
        format!("Authentic verified: {}", s.real_verified),
        format!("Suspicious: {}", s.suspicious),
        format!("Blockchain verified: {}", s.blockchain_verified),
    ]
}
