mod client;

pub use client::AnalysisClient;

use crate::error::SubmitError;
use crate::model::{AnalysisRequest, AnalysisResult};
use rand::RngCore;
use std::time::Instant;
use tracing::{info, warn};

/// Generate a random identifier for one submission.
pub fn gen_request_id() -> String {
    let mut b = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut b);
    b.iter().map(|x| format!("{x:02x}")).collect()
}

/// Run one submission to completion. The client timeout also bounds the
/// whole exchange here so a stalled body read cannot hang the workflow.
pub async fn submit(
    client: &AnalysisClient,
    req: &AnalysisRequest,
) -> Result<AnalysisResult, SubmitError> {
    let started = Instant::now();
    info!(
        request_id = %req.request_id,
        generation = req.generation,
        file = %req.file.name,
        bytes = req.file.size(),
        "submitting video for analysis"
    );

    let outcome = match tokio::time::timeout(client.timeout, client.analyze(req)).await {
        Ok(res) => res,
        Err(_) => Err(SubmitError::Timeout(client.timeout)),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        Ok(r) => info!(
            request_id = %req.request_id,
            prediction = r.category.as_wire(),
            confidence = r.confidence,
            frames = r.evidence_frames.len(),
            elapsed_ms,
            "analysis completed"
        ),
        Err(e) => warn!(
            request_id = %req.request_id,
            error = %e,
            diagnostic = %e.diagnostic().unwrap_or_default(),
            elapsed_ms,
            "analysis failed"
        ),
    }
    outcome
}
