//! HTTP wire types shared by vivad and vivactl.

use crate::parser::{Evaluation, Report};
use serde::{Deserialize, Serialize};

/// Header carrying the opaque session identifier
pub const SESSION_HEADER: &str = "x-session-id";

/// Multipart field holding the uploaded document
pub const UPLOAD_FIELD: &str = "pdf_file";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

/// Reply to `start`: the first question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// Reply to `answer`, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnswerResponse {
    Next {
        score: u32,
        feedback: String,
        ideal_answer: String,
        next_question: String,
    },
    Completed {
        score: u32,
        feedback: String,
        average_score: f64,
        report: Report,
    },
}

impl AnswerResponse {
    pub fn next(evaluation: Evaluation) -> Self {
        AnswerResponse::Next {
            score: evaluation.score,
            feedback: evaluation.feedback,
            ideal_answer: evaluation.ideal_answer,
            next_question: evaluation.next_question,
        }
    }

    pub fn completed(evaluation: Evaluation, average_score: f64, report: Report) -> Self {
        AnswerResponse::Completed {
            score: evaluation.score,
            feedback: evaluation.feedback,
            average_score,
            report,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, AnswerResponse::Completed { .. })
    }
}

/// Reply to `upload`: the first question about the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub status: String,
    pub session_id: String,
}

/// Error body used by `start` and `upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageError {
    pub message: String,
}

/// Error body used by `answer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub credentials: usize,
    pub active_sessions: usize,
}
