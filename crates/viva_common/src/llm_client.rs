//! Generation backends and the key-rotating client.
//!
//! A `GenerationBackend` performs one upstream call with one credential and
//! classifies failures. `RotatingClient` sits on top and walks the credential
//! pool when a key runs out of quota.

use crate::credentials::CredentialPool;
use crate::error::{GenerationError, VivaError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default Gemini REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default generation model
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// One text-completion call against an upstream provider.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, GenerationError>;
}

// ============================================================================
// Gemini
// ============================================================================

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Google Gemini `generateContent` backend.
pub struct GeminiBackend {
    http_client: reqwest::Client,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, VivaError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VivaError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Classify a non-success upstream reply.
pub fn classify_failure(status: u16, body: &str) -> GenerationError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") || body.contains("ResourceExhausted")
    {
        GenerationError::QuotaExceeded(format!("HTTP {}", status))
    } else {
        GenerationError::Fatal(format!("HTTP {}: {}", status, body.trim()))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        debug!("Gemini call [{}] ({} chars)", model, prompt.len());

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Fatal(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Fatal(format!("Invalid Gemini response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::Fatal("Gemini returned no text".to_string()));
        }

        Ok(text.to_string())
    }
}

// ============================================================================
// Fake backend for tests
// ============================================================================

/// A call recorded by `FakeBackend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub credential: String,
    pub model: String,
    pub prompt: String,
}

/// Scripted backend: replays queued replies in order and records each call.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeBackend {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: Result<String, GenerationError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FakeCall {
                credential: credential.to_string(),
                model: model.to_string(),
                prompt: prompt.to_string(),
            });

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Fatal("no scripted reply".to_string())))
    }
}

// ============================================================================
// Rotating client
// ============================================================================

/// Calls a backend, moving to the next credential whenever one hits quota.
///
/// At most one pass over the pool is made per call. The pool cursor is shared,
/// so the next call starts on whichever key last worked.
#[derive(Clone)]
pub struct RotatingClient {
    backend: Arc<dyn GenerationBackend>,
    pool: Arc<CredentialPool>,
    model: String,
    rotation_delay: Duration,
}

impl RotatingClient {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        pool: Arc<CredentialPool>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            pool,
            model: model.into(),
            rotation_delay: Duration::from_secs(1),
        }
    }

    /// Pause between a quota failure and the retry on the next key.
    pub fn with_rotation_delay(mut self, delay: Duration) -> Self {
        self.rotation_delay = delay;
        self
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn call(&self, prompt: &str) -> Result<String, VivaError> {
        let attempts = self.pool.len();

        for attempt in 1..=attempts {
            let index = self.pool.current_index();
            let credential = self.pool.key(index);

            match self.backend.generate(credential, &self.model, prompt).await {
                Ok(text) => return Ok(text),
                Err(GenerationError::QuotaExceeded(detail)) => {
                    let next = self.pool.rotate();
                    warn!(
                        "Quota hit on key #{} ({}), switching to key #{} of {}",
                        index + 1,
                        detail,
                        next + 1,
                        attempts
                    );
                    if attempt < attempts && !self.rotation_delay.is_zero() {
                        tokio::time::sleep(self.rotation_delay).await;
                    }
                }
                Err(GenerationError::Fatal(msg)) => {
                    error!("Upstream generation failed on key #{}: {}", index + 1, msg);
                    return Err(VivaError::Upstream(msg));
                }
            }
        }

        error!("All {} API keys exhausted", attempts);
        Err(VivaError::CredentialsExhausted { attempts })
    }
}
