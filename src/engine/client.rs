use crate::error::SubmitError;
use crate::model::{
    AnalysisRequest, AnalysisResult, ErrorBody, HistoryPage, PredictResponse, RunConfig,
    ServiceHealth, ServiceStats, StoredAnalysis, TxStatus,
};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const PREDICT_PATH: &str = "predict-video";
const HEALTH_PATH: &str = "health";
const ANALYSIS_PATH: &str = "analysis";
const BLOCKCHAIN_PATH: &str = "blockchain";
const HISTORY_PATH: &str = "history";
const STATS_PATH: &str = "stats";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the inference service.
#[derive(Clone)]
pub struct AnalysisClient {
    pub http: reqwest::Client,
    pub base_url: Url,
    pub timeout: Duration,
}

impl AnalysisClient {
    pub fn new(cfg: &RunConfig) -> Result<Self> {
        let base_url = Url::parse(cfg.base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid base URL {:?}", cfg.base_url))?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(cfg.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url,
            timeout: cfg.timeout,
        })
    }

    // Segments are percent-encoded, so a hash can never escape its path slot.
    fn endpoint(&self, path: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path);
        }
        url
    }

    pub fn predict_url(&self, include_evidence: bool) -> Url {
        let mut url = self.endpoint(&[PREDICT_PATH]);
        if include_evidence {
            url.query_pairs_mut().append_pair("include_gradcam", "true");
        }
        url
    }

    pub fn health_url(&self) -> Url {
        self.endpoint(&[HEALTH_PATH])
    }

    pub fn lookup_url(&self, video_hash: &str) -> Url {
        self.endpoint(&[ANALYSIS_PATH, video_hash])
    }

    pub fn tx_url(&self, tx_hash: &str) -> Url {
        self.endpoint(&[BLOCKCHAIN_PATH, tx_hash])
    }

    pub fn history_url(&self, limit: u32, offset: u32) -> Url {
        let mut url = self.endpoint(&[HISTORY_PATH]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        url
    }

    /// Upload one file and parse the verdict.
    pub async fn analyze(&self, req: &AnalysisRequest) -> Result<AnalysisResult, SubmitError> {
        let file = &req.file;
        let part = Part::stream_with_length(Body::from(file.payload.clone()), file.size())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| SubmitError::transport(format!("invalid media type: {e}")))?;
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(self.predict_url(req.include_evidence))
            .header("x-request-id", &req.request_id)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        parse_predict_response(status, &body)
    }

    pub async fn health(&self) -> Result<ServiceHealth> {
        self.get_json(self.health_url(), "health check").await
    }

    /// Stored verdict for a video hash. The service answers 404 with
    /// "Analysis not found" for unknown hashes.
    pub async fn lookup(&self, video_hash: &str) -> Result<StoredAnalysis> {
        self.get_json(self.lookup_url(video_hash), "analysis lookup")
            .await
    }

    /// Current status of a blockchain record; the service refreshes it from
    /// the chain receipt before answering.
    pub async fn tx_status(&self, tx_hash: &str) -> Result<TxStatus> {
        self.get_json(self.tx_url(tx_hash), "transaction lookup")
            .await
    }

    pub async fn server_history(&self, limit: u32, offset: u32) -> Result<HistoryPage> {
        self.get_json(self.history_url(limit, offset), "history request")
            .await
    }

    pub async fn stats(&self) -> Result<ServiceStats> {
        self.get_json(self.endpoint(&[STATS_PATH]), "stats request")
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("{what} failed"))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("read {what} response"))?;
        if !status.is_success() {
            return Err(match service_detail(&body) {
                Some(detail) => anyhow::anyhow!("{what}: {detail}"),
                None => anyhow::anyhow!("{what} returned HTTP {status}"),
            });
        }
        serde_json::from_slice(&body).with_context(|| format!("parse {what} response"))
    }

    fn classify(&self, e: reqwest::Error) -> SubmitError {
        if e.is_timeout() {
            SubmitError::Timeout(self.timeout)
        } else {
            SubmitError::Transport {
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            }
        }
    }
}

/// Interpret a response from `POST /predict-video`.
pub fn parse_predict_response(
    status: StatusCode,
    body: &[u8],
) -> Result<AnalysisResult, SubmitError> {
    if !status.is_success() {
        return Err(error_from_body(status, body));
    }
    serde_json::from_slice::<PredictResponse>(body)
        .map(AnalysisResult::from)
        .map_err(|e| SubmitError::Transport {
            status: Some(status.as_u16()),
            reason: format!("malformed response body: {e}"),
        })
}

/// Non-blank string `detail` of an error body, if any.
fn service_detail(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|d| d.as_str().map(str::to_string))
        .filter(|d| !d.trim().is_empty())
}

/// Prefer the server's `detail` string; anything else is a generic failure.
pub fn error_from_body(status: StatusCode, body: &[u8]) -> SubmitError {
    match service_detail(body) {
        Some(d) => SubmitError::Service(d),
        None => SubmitError::Transport {
            status: Some(status.as_u16()),
            reason: String::from_utf8_lossy(body).chars().take(200).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GENERIC_FAILURE;
    use crate::model::Category;

    fn cfg(base_url: &str) -> RunConfig {
        RunConfig {
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
            include_evidence: true,
            user_agent: "test".into(),
            auto_save: false,
            export_json: None,
            frames_dir: None,
        }
    }

    #[test]
    fn urls_respect_base_path() {
        let c = AnalysisClient::new(&cfg("http://localhost:8000")).unwrap();
        assert_eq!(
            c.predict_url(true).as_str(),
            "http://localhost:8000/predict-video?include_gradcam=true"
        );
        assert_eq!(
            c.predict_url(false).as_str(),
            "http://localhost:8000/predict-video"
        );

        let c = AnalysisClient::new(&cfg("https://api.example.com/v1/")).unwrap();
        assert_eq!(c.health_url().as_str(), "https://api.example.com/v1/health");
    }

    #[test]
    fn lookup_urls_encode_their_keys() {
        let c = AnalysisClient::new(&cfg("http://localhost:8000/")).unwrap();
        assert_eq!(
            c.lookup_url("ab12").as_str(),
            "http://localhost:8000/analysis/ab12"
        );
        assert_eq!(
            c.tx_url("0xff/../stats").as_str(),
            "http://localhost:8000/blockchain/0xff%2F..%2Fstats"
        );
        assert_eq!(
            c.history_url(20, 40).as_str(),
            "http://localhost:8000/history?limit=20&offset=40"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(AnalysisClient::new(&cfg("not a url")).is_err());
    }

    #[test]
    fn success_body_is_parsed() {
        let r = parse_predict_response(
            StatusCode::OK,
            br#"{"prediction":"FAKE","confidence":0.972,"filename":"a.mp4"}"#,
        )
        .unwrap();
        assert_eq!(r.category, Category::Manipulated);
        assert_eq!(r.source_name, "a.mp4");
    }

    #[test]
    fn malformed_success_body_is_generic() {
        let e = parse_predict_response(StatusCode::OK, b"<html>oops</html>").unwrap_err();
        assert_eq!(e.to_string(), GENERIC_FAILURE);
    }

    #[test]
    fn detail_string_is_surfaced() {
        let e = error_from_body(
            StatusCode::PAYLOAD_TOO_LARGE,
            br#"{"detail":"File too large. Max: 500MB"}"#,
        );
        assert_eq!(e, SubmitError::Service("File too large. Max: 500MB".into()));
    }

    #[test]
    fn non_string_or_missing_detail_is_generic() {
        for body in [
            &br#"{"detail":[{"loc":["body","file"],"msg":"field required"}]}"#[..],
            br#"{"error":"x"}"#,
            br#"{"detail":"  "}"#,
            b"Internal Server Error",
            b"",
        ] {
            let e = error_from_body(StatusCode::INTERNAL_SERVER_ERROR, body);
            assert!(matches!(e, SubmitError::Transport { status: Some(500), .. }));
        }
    }
}
