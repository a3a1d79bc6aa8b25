//! Local history of verdicts and file exports.

use crate::model::{AnalysisRecord, EvidenceFrame};
use anyhow::{Context, Result};
use base64::Engine;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "veritrust-cli";

pub fn history_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("no local data directory on this platform")?;
    Ok(base.join(APP_DIR).join("history"))
}

fn record_file_name(record: &AnalysisRecord) -> String {
    format!(
        "analysis-{}-{}.json",
        record.timestamp_utc.replace(':', "-"),
        record.request_id
    )
}

/// Save a record to the default history location.
pub fn save_run(record: &AnalysisRecord) -> Result<PathBuf> {
    save_run_in(&history_dir()?, record)
}

pub fn save_run_in(dir: &Path, record: &AnalysisRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(record_file_name(record));
    export_json(&path, record)?;
    Ok(path)
}

pub fn export_json(path: &Path, record: &AnalysisRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(record)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Most recent records first. Unparseable files are skipped.
pub fn load_recent(limit: usize) -> Result<Vec<AnalysisRecord>> {
    load_recent_in(&history_dir()?, limit)
}

pub fn load_recent_in(dir: &Path, limit: usize) -> Result<Vec<AnalysisRecord>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("read {}", dir.display())),
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|x| x == "json"))
        .collect();
    // Timestamps in file names sort lexicographically.
    files.sort();
    files.reverse();

    Ok(files
        .into_iter()
        .filter_map(|p| std::fs::read(&p).ok())
        .filter_map(|b| serde_json::from_slice::<AnalysisRecord>(&b).ok())
        .take(limit)
        .collect())
}

fn split_inline_image(image: &str) -> Result<(&'static str, &str)> {
    match image.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .context("data URL without payload separator")?;
            let mime = header.split(';').next().unwrap_or_default();
            let ext = match mime {
                "image/png" => "png",
                "image/webp" => "webp",
                "image/gif" => "gif",
                _ => "jpg",
            };
            Ok((ext, data.trim()))
        }
        None => Ok(("jpg", image.trim())),
    }
}

/// Split an inline image into (extension, raw bytes). Accepts data URLs and
/// bare base64, which is treated as JPEG.
pub fn decode_inline_image(image: &str) -> Result<(&'static str, Vec<u8>)> {
    let (ext, payload) = split_inline_image(image)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("decode base64 image")?;
    Ok((ext, bytes))
}

/// Extension and decoded size of an inline image, computed from the
/// encoded length without decoding.
pub fn inline_image_info(image: &str) -> Result<(&'static str, usize)> {
    let (ext, payload) = split_inline_image(image)?;
    let pad = payload.bytes().rev().take_while(|b| *b == b'=').count();
    Ok((ext, (payload.len() - pad) * 3 / 4))
}

/// Write every evidence frame as an image file. Returns the written paths in
/// display order.
pub fn write_frames(dir: &Path, frames: &[EvidenceFrame]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    frames
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let (ext, bytes) = decode_inline_image(&f.image)
                .with_context(|| format!("frame {} (#{})", i + 1, f.frame_index))?;
            let path = dir.join(format!("frame_{:02}_{}.{ext}", i + 1, f.frame_index));
            std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}
