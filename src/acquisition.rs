//! Input acquisition: one validation gate fed by a file picker and a drop zone.

use crate::error::ValidationError;
use crate::model::MediaFile;
use bytes::Bytes;
use std::path::{Path, PathBuf};

const VIDEO_PREFIX: &str = "video/";

/// A raw file handle as delivered by an input adapter, before validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub mime: Option<String>,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted(MediaFile),
    Rejected(ValidationError),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }
}

/// Anything that turns a candidate into a validation outcome.
pub trait Acquire {
    fn submit(&self, candidate: Candidate) -> ValidationOutcome;
}

/// Accepts only candidates whose declared type is in the `video/` class.
/// Size and codec limits are left to the service.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaGate;

impl Acquire for MediaGate {
    fn submit(&self, candidate: Candidate) -> ValidationOutcome {
        let Some(mime) = candidate.mime else {
            return ValidationOutcome::Rejected(ValidationError::UnknownType {
                name: candidate.name,
            });
        };
        if !is_video_mime(&mime) {
            return ValidationOutcome::Rejected(ValidationError::NotVideo {
                name: candidate.name,
                mime,
            });
        }
        ValidationOutcome::Accepted(MediaFile {
            name: candidate.name,
            mime,
            payload: candidate.payload,
        })
    }
}

pub fn is_video_mime(mime: &str) -> bool {
    mime.get(..VIDEO_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(VIDEO_PREFIX))
}

/// File-picker adapter: reads a path from disk and declares its type from the
/// extension, the way a browser file input does.
pub struct FilePicker;

impl FilePicker {
    pub async fn open(path: &Path) -> Result<Candidate, ValidationError> {
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());
        Ok(Candidate {
            name,
            mime,
            payload: Bytes::from(payload),
        })
    }
}

/// Drop-zone adapter. `hovering` is transient feedback only and never gates
/// validation.
#[derive(Debug, Default, Clone)]
pub struct DropZone {
    hovering: bool,
}

impl DropZone {
    pub fn enter(&mut self) {
        self.hovering = true;
    }

    pub fn over(&mut self) {
        self.hovering = true;
    }

    pub fn leave(&mut self) {
        self.hovering = false;
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    /// Terminal drops arrive as pasted text; returns the first dropped path.
    pub fn drop(&mut self, text: &str) -> Result<PathBuf, ValidationError> {
        self.hovering = false;
        parse_dropped_paths(text)
            .into_iter()
            .next()
            .ok_or(ValidationError::Empty)
    }
}

/// Split pasted text into paths. Handles quoting, backslash escapes and
/// `file://` URIs as emitted by common terminal emulators.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut started = false;
    let mut chars = text.trim().chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => cur.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                started = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    cur.push(next);
                    started = true;
                }
            }
            (None, c) if c.is_whitespace() => {
                if started {
                    out.push(to_path(std::mem::take(&mut cur)));
                    started = false;
                }
            }
            (None, c) => {
                cur.push(c);
                started = true;
            }
        }
    }
    if started {
        out.push(to_path(cur));
    }
    out
}

fn to_path(token: String) -> PathBuf {
    match token.strip_prefix("file://") {
        Some(rest) => PathBuf::from(rest.replace("%20", " ")),
        None => PathBuf::from(token),
    }
}
