//! HTTP client for communicating with vivad.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use viva_common::{
    AnswerRequest, AnswerResponse, ErrorBody, HealthResponse, MessageError, StartRequest,
    StartResponse, UploadResponse, SESSION_HEADER, UPLOAD_FIELD,
};

/// Client for the vivad HTTP API
pub struct VivaClient {
    http: reqwest::Client,
    base_url: String,
}

impl VivaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a topic exam; returns the first question and the session id.
    pub async fn start(&self, topic: Option<&str>) -> Result<StartResponse> {
        let request = StartRequest {
            topic: topic.map(str::to_string),
        };
        let resp = self
            .http
            .post(self.url("/api/start/"))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Cannot reach vivad at {}", self.base_url))?;

        decode(resp).await
    }

    pub async fn answer(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<AnswerResponse> {
        let request = AnswerRequest {
            question: question.to_string(),
            answer: answer.to_string(),
        };
        let resp = self
            .http
            .post(self.url("/api/answer/"))
            .header(SESSION_HEADER, session_id)
            .json(&request)
            .send()
            .await
            .context("Failed to send answer")?;

        decode(resp).await
    }

    /// Upload a PDF and start a document exam.
    pub async fn upload(&self, path: &Path) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let resp = self
            .http
            .post(self.url("/api/upload/"))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Cannot reach vivad at {}", self.base_url))?;

        decode(resp).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .http
            .get(self.url("/api/health"))
            .send()
            .await
            .with_context(|| format!("Cannot reach vivad at {}", self.base_url))?;

        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await.context("Failed to read response body")?;

    if !status.is_success() {
        return Err(anyhow!("{} ({})", error_message(&body), status));
    }

    serde_json::from_str(&body).context("Unexpected response from vivad")
}

/// Pull the human-readable message out of either error body shape.
pub fn error_message(body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<MessageError>(body) {
        return err.message;
    }
    if let Ok(err) = serde_json::from_str::<ErrorBody>(body) {
        return err.error;
    }
    body.trim().to_string()
}
