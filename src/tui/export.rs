use crate::model::AnalysisRecord;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

// Clipboard worker channel, started on first copy.
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Default export file name: timestamp plus the request id prefix.
pub fn export_file_name(r: &AnalysisRecord) -> String {
    format!(
        "veritrust-{}-{}.json",
        r.timestamp_utc.replace(':', "-").replace('T', "_"),
        r.request_id.chars().take(8).collect::<String>()
    )
}

/// Export a verdict record as JSON into the current directory.
/// Returns the absolute path of the exported file.
pub fn export_record_json(r: &AnalysisRecord) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(export_file_name(r));
    crate::storage::export_json(&path, r)?;
    Ok(path)
}

fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    // X11/Wayland serve the selection from this process; keep the
                    // instance alive long enough for clipboard managers to take it.
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue text for the clipboard worker. Never blocks the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;

    #[test]
    fn export_name_is_filesystem_safe() {
        let r = AnalysisRecord {
            timestamp_utc: "2026-03-04T05:06:07Z".into(),
            base_url: "http://localhost:8000".into(),
            request_id: "a1b2c3d4e5f6".into(),
            source_name: "clip.mp4".into(),
            file_size: 1,
            prediction: "REAL".into(),
            confidence: 0.5,
            evidence: Vec::new(),
            provenance: Provenance::default(),
        };
        assert_eq!(
            export_file_name(&r),
            "veritrust-2026-03-04_05-06-07Z-a1b2c3d4.json"
        );
    }

    #[test]
    fn export_name_handles_multibyte_request_ids() {
        let r = AnalysisRecord {
            timestamp_utc: "2026-03-04T05:06:07Z".into(),
            base_url: String::new(),
            request_id: "aéééé".into(),
            source_name: "clip.mp4".into(),
            file_size: 1,
            prediction: "FAKE".into(),
            confidence: 0.5,
            evidence: Vec::new(),
            provenance: Provenance::default(),
        };
        assert_eq!(
            export_file_name(&r),
            "veritrust-2026-03-04_05-06-07Z-aéééé.json"
        );
    }
}
