//! Error taxonomy for the examiner.

/// Outcome of a single upstream generation attempt.
///
/// The rotation loop only retries `QuotaExceeded`; anything else ends the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    Fatal(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::QuotaExceeded(_))
    }
}

/// Errors surfaced by the examiner core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VivaError {
    #[error("no API credentials configured (set VIVA_API_KEYS)")]
    EmptyCredentialPool,

    #[error("all API keys exhausted after {attempts} attempts")]
    CredentialsExhausted { attempts: usize },

    #[error("upstream generation failed: {0}")]
    Upstream(String),

    #[error("{0}")]
    Extraction(String),

    #[error("no active session; start or upload first")]
    NoActiveSession,

    #[error("session already completed; start a new one")]
    SessionCompleted,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<GenerationError> for VivaError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::QuotaExceeded(msg) | GenerationError::Fatal(msg) => {
                VivaError::Upstream(msg)
            }
        }
    }
}
