//! Error taxonomy for the verification workflow.
//!
//! Nothing here is fatal: every variant leaves the workflow in a state the
//! user can recover from by reselecting, resubmitting or resetting.

use std::time::Duration;
use thiserror::Error;

/// Shown whenever the service gave us nothing more specific to say.
pub const GENERIC_FAILURE: &str = "Error analyzing video. Please try again.";

/// Input was rejected before it reached the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} is not a video file (type: {mime})")]
    NotVideo { name: String, mime: String },
    #[error("{name} has no recognizable media type")]
    UnknownType { name: String },
    #[error("could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("nothing to open")]
    Empty,
}

/// A submission did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    /// Non-2xx with a structured `detail` message; shown verbatim.
    #[error("{0}")]
    Service(String),
    /// Network failure, non-2xx without a usable detail, or a malformed body.
    /// `reason` is for logs only.
    #[error("{GENERIC_FAILURE}")]
    Transport { status: Option<u16>, reason: String },
    #[error("Analysis timed out after {}. Please try again.", humantime::format_duration(*.0))]
    Timeout(Duration),
}

impl SubmitError {
    pub fn transport(reason: impl Into<String>) -> Self {
        SubmitError::Transport {
            status: None,
            reason: reason.into(),
        }
    }

    /// Diagnostic detail beyond the user-facing message.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            SubmitError::Transport {
                status: Some(code),
                reason,
            } => Some(format!("HTTP {code}: {reason}")),
            SubmitError::Transport { status: None, reason } => Some(reason.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_detail_is_shown_verbatim() {
        let e = SubmitError::Service("file too large".into());
        assert_eq!(e.to_string(), "file too large");
        assert_eq!(e.diagnostic(), None);
    }

    #[test]
    fn transport_hides_reason_behind_generic_message() {
        let e = SubmitError::Transport {
            status: Some(502),
            reason: "bad gateway".into(),
        };
        assert_eq!(e.to_string(), GENERIC_FAILURE);
        assert_eq!(e.diagnostic().as_deref(), Some("HTTP 502: bad gateway"));
    }

    #[test]
    fn timeout_names_the_limit() {
        let e = SubmitError::Timeout(Duration::from_secs(90));
        assert_eq!(
            e.to_string(),
            "Analysis timed out after 1m 30s. Please try again."
        );
    }
}
