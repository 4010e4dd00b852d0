//! Exam sequencing: ask, grade, repeat, report.
//!
//! A session moves Idle -> InProgress on start/upload and InProgress ->
//! Completed on the answer that reaches `EXCHANGE_LIMIT`. Nothing leaves
//! Completed; a new start/upload simply replaces the session.
//!
//! The current question is not stored. Callers send it back with each answer.

use crate::session::{Session, SessionPhase, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use viva_common::prompts::{self, DEFAULT_CONTEXT_CHARS};
use viva_common::{
    parse_evaluation, parse_report, AnswerResponse, Evaluation, Report, RotatingClient, VivaError,
};

/// Knobs for the examiner, taken from `[exam]` and `[llm]` config.
#[derive(Debug, Clone)]
pub struct ExamSettings {
    pub context_chars: usize,
    pub default_topic: String,
    /// Pause before question and evaluation calls
    pub pre_call_delay: Duration,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            default_topic: "General CS".to_string(),
            pre_call_delay: Duration::from_secs(2),
        }
    }
}

pub struct Examiner {
    client: RotatingClient,
    store: Arc<dyn SessionStore>,
    settings: ExamSettings,
}

impl Examiner {
    pub fn new(client: RotatingClient, store: Arc<dyn SessionStore>, settings: ExamSettings) -> Self {
        Self {
            client,
            store,
            settings,
        }
    }

    pub fn client(&self) -> &RotatingClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    async fn pause(&self) {
        if !self.settings.pre_call_delay.is_zero() {
            tokio::time::sleep(self.settings.pre_call_delay).await;
        }
    }

    /// Begin a topic session and return its first question.
    pub async fn start(&self, session_id: &str, topic: Option<&str>) -> Result<String, VivaError> {
        let topic = topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.settings.default_topic.as_str());

        let session = Session::for_topic(topic);
        self.store.set(session_id, session.clone()).await;
        info!("Session {} started on topic '{}'", session_id, topic);

        self.generate_question(&session).await
    }

    /// Begin a document session from extracted text and return its first question.
    pub async fn start_document(&self, session_id: &str, text: &str) -> Result<String, VivaError> {
        let session = Session::for_document(text, self.settings.context_chars);
        self.store.set(session_id, session.clone()).await;
        info!(
            "Session {} started on uploaded document ({} chars kept)",
            session_id,
            session.context.as_deref().map_or(0, |c| c.chars().count())
        );

        self.generate_question(&session).await
    }

    /// Grade an answer and either ask the next question or close with a report.
    pub async fn answer(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<AnswerResponse, VivaError> {
        let mut session = self
            .store
            .get(session_id)
            .await
            .ok_or(VivaError::NoActiveSession)?;

        match session.phase {
            SessionPhase::Idle => return Err(VivaError::NoActiveSession),
            SessionPhase::Completed => return Err(VivaError::SessionCompleted),
            SessionPhase::InProgress => {}
        }

        let evaluation = self.evaluate(&session, question, answer).await;
        let count = session.record(question, answer, evaluation.score);
        self.store.set(session_id, session.clone()).await;

        if !session.is_completed() {
            info!("Session {}: answer {} graded {}", session_id, count, evaluation.score);
            return Ok(AnswerResponse::next(evaluation));
        }

        let report = self.generate_report(&session).await;
        info!(
            "Session {} completed after {} answers (grade {})",
            session_id, count, report.grade
        );
        Ok(AnswerResponse::completed(
            evaluation,
            session.average_score(),
            report,
        ))
    }

    async fn generate_question(&self, session: &Session) -> Result<String, VivaError> {
        self.pause().await;
        let prompt = prompts::question_prompt(session.exam_context(), self.settings.context_chars);
        self.client.call(&prompt).await
    }

    async fn evaluate(&self, session: &Session, question: &str, answer: &str) -> Evaluation {
        self.pause().await;
        let prompt = prompts::evaluation_prompt(
            session.exam_context(),
            question,
            answer,
            self.settings.context_chars,
        );

        match self.client.call(&prompt).await {
            Ok(reply) => parse_evaluation(&reply),
            Err(e) => {
                warn!("Evaluation call failed, using system-error grade: {}", e);
                Evaluation::system_error()
            }
        }
    }

    async fn generate_report(&self, session: &Session) -> Report {
        let prompt = prompts::report_prompt(&session.history_text());

        match self.client.call(&prompt).await {
            Ok(reply) => parse_report(&reply),
            Err(e) => {
                warn!("Report call failed, using fallback report: {}", e);
                Report::fallback()
            }
        }
    }
}
