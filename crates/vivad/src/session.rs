//! Per-session exam state and the store that holds it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use viva_common::prompts::{truncate_chars, ExamContext};
use viva_common::EXCHANGE_LIMIT;

/// Upper bound on the idle timeout (100 years)
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 3_600;

/// Topic recorded for document-mode sessions
pub const DOCUMENT_TOPIC: &str = "Uploaded Document";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    InProgress,
    Completed,
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub score: u32,
}

impl Exchange {
    pub fn history_line(&self) -> String {
        format!("Q: {}\nA: {}\nGrade: {}", self.question, self.answer, self.score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub topic: String,
    /// Document excerpt, already cut to the context budget
    pub context: Option<String>,
    pub question_count: u32,
    pub history: Vec<Exchange>,
    pub scores: Vec<u32>,
    pub phase: SessionPhase,
    pub last_active: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            topic: String::new(),
            context: None,
            question_count: 0,
            history: Vec::new(),
            scores: Vec::new(),
            phase: SessionPhase::Idle,
            last_active: Utc::now(),
        }
    }
}

impl Session {
    pub fn for_topic(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            phase: SessionPhase::InProgress,
            ..Self::default()
        }
    }

    pub fn for_document(text: &str, max_chars: usize) -> Self {
        Self {
            topic: DOCUMENT_TOPIC.to_string(),
            context: Some(truncate_chars(text, max_chars).to_string()),
            phase: SessionPhase::InProgress,
            ..Self::default()
        }
    }

    pub fn exam_context(&self) -> ExamContext<'_> {
        match &self.context {
            Some(text) => ExamContext::Document(text),
            None => ExamContext::Topic(&self.topic),
        }
    }

    /// Append an answered question and return the new count.
    ///
    /// Reaching the exchange limit moves the session to `Completed`.
    pub fn record(&mut self, question: &str, answer: &str, score: u32) -> u32 {
        self.history.push(Exchange {
            question: question.to_string(),
            answer: answer.to_string(),
            score,
        });
        self.scores.push(score);
        self.question_count += 1;

        if self.question_count >= EXCHANGE_LIMIT {
            self.phase = SessionPhase::Completed;
        }
        self.question_count
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    /// History flattened for the report prompt.
    pub fn history_text(&self) -> String {
        self.history
            .iter()
            .map(Exchange::history_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn average_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|&s| f64::from(s)).sum::<f64>() / self.scores.len() as f64
    }
}

/// Keyed session storage supplied by the transport layer.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<Session>;
    async fn set(&self, id: &str, session: Session);
    async fn reset(&self, id: &str);
    async fn len(&self) -> usize;
}

/// Default number of sessions held by `MemorySessionStore`
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// In-process LRU store with idle expiry.
///
/// Beyond `capacity` the least recently touched session is evicted, expired
/// or not.
pub struct MemorySessionStore {
    sessions: Mutex<LruCache<String, Session>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_secs: u64, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.last_active) > self.ttl
    }

    /// Drop every idle session, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| self.is_expired(s, now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.pop(id);
        }

        if !expired.is_empty() {
            debug!("Purged {} idle sessions", expired.len());
        }
        expired.len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(3_600, DEFAULT_MAX_SESSIONS)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;

        match sessions.get(id) {
            Some(s) if !self.is_expired(s, now) => return Some(s.clone()),
            Some(_) => {}
            None => return None,
        }

        debug!("Session {} expired", id);
        sessions.pop(id);
        None
    }

    async fn set(&self, id: &str, mut session: Session) {
        session.last_active = Utc::now();
        let mut sessions = self.sessions.lock().await;

        if let Some((evicted, _)) = sessions.push(id.to_string(), session) {
            if evicted != id {
                warn!("Session store full, evicted session {}", evicted);
            }
        }
    }

    async fn reset(&self, id: &str) {
        self.sessions.lock().await.pop(id);
    }

    /// Live sessions only; expired entries awaiting the sweep are not counted.
    async fn len(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .lock()
            .await
            .iter()
            .filter(|(_, s)| !self.is_expired(s, now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reaches_completed_on_limit() {
        let mut session = Session::for_topic("Databases");
        for i in 1..EXCHANGE_LIMIT {
            assert_eq!(session.record("q", "a", 50), i);
            assert_eq!(session.phase, SessionPhase::InProgress);
        }
        assert_eq!(session.record("q", "a", 50), EXCHANGE_LIMIT);
        assert!(session.is_completed());
    }

    #[test]
    fn test_history_text_format() {
        let mut session = Session::for_topic("Networks");
        session.record("What is TCP?", "A protocol", 60);
        session.record("What is UDP?", "Also a protocol", 40);
        assert_eq!(
            session.history_text(),
            "Q: What is TCP?\nA: A protocol\nGrade: 60\nQ: What is UDP?\nA: Also a protocol\nGrade: 40"
        );
        assert_eq!(session.average_score(), 50.0);
    }

    #[test]
    fn test_document_session_truncates_context() {
        let text = "x".repeat(5000);
        let session = Session::for_document(&text, 3000);
        assert_eq!(session.topic, DOCUMENT_TOPIC);
        assert_eq!(session.context.as_deref().map(|c| c.chars().count()), Some(3000));
        assert!(matches!(session.exam_context(), ExamContext::Document(_)));
    }

    #[tokio::test]
    async fn test_store_roundtrip_and_reset() {
        let store = MemorySessionStore::default();
        assert!(store.get("abc").await.is_none());

        store.set("abc", Session::for_topic("OS")).await;
        assert_eq!(store.get("abc").await.map(|s| s.topic), Some("OS".to_string()));
        assert_eq!(store.len().await, 1);

        store.reset("abc").await;
        assert!(store.get("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = MemorySessionStore::new(0, 16);
        store.set("old", Session::for_topic("OS")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        // expired but not yet swept: not reported as live
        assert_eq!(store.len().await, 0);
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped_on_access() {
        let store = MemorySessionStore::new(0, 16);
        store.set("old", Session::for_topic("OS")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert!(store.get("old").await.is_none());
        assert_eq!(store.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_store_evicts_least_recently_used_at_capacity() {
        let store = MemorySessionStore::new(3_600, 2);
        store.set("s1", Session::for_topic("OS")).await;
        store.set("s2", Session::for_topic("Networks")).await;

        // touching s1 makes s2 the eviction candidate
        assert!(store.get("s1").await.is_some());
        store.set("s3", Session::for_topic("Compilers")).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get("s1").await.is_some());
        assert!(store.get("s2").await.is_none());
        assert!(store.get("s3").await.is_some());
    }

    #[tokio::test]
    async fn test_many_starts_stay_within_capacity() {
        let store = MemorySessionStore::new(3_600, 100);
        for i in 0..1_000 {
            store.set(&format!("s{}", i), Session::for_topic("OS")).await;
        }

        assert_eq!(store.len().await, 100);
        assert!(store.get("s999").await.is_some());
        assert!(store.get("s0").await.is_none());
    }

    #[tokio::test]
    async fn test_zero_capacity_still_holds_one_session() {
        let store = MemorySessionStore::new(3_600, 0);
        store.set("only", Session::for_topic("OS")).await;
        assert!(store.get("only").await.is_some());
    }
}
