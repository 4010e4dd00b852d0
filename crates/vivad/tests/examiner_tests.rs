//! Examiner sequencing tests.
//!
//! These use FakeBackend and the in-memory session store, so no network or
//! delays are involved.

use std::sync::Arc;
use std::time::Duration;
use viva_common::parser::{FALLBACK_GRADE, FALLBACK_VERDICT};
use viva_common::{
    AnswerResponse, CredentialPool, FakeBackend, GenerationError, RotatingClient, VivaError,
    EXCHANGE_LIMIT,
};
use vivad::examiner::{ExamSettings, Examiner};
use vivad::session::{MemorySessionStore, SessionPhase, SessionStore, DOCUMENT_TOPIC};

const REPORT_JSON: &str = r#"{"grade":"B","strengths":["clear definitions"],"weaknesses":["scheduling"],"final_verdict":"Solid pass."}"#;

struct Harness {
    examiner: Examiner,
    backend: Arc<FakeBackend>,
    store: Arc<MemorySessionStore>,
}

fn harness(keys: &[&str]) -> Harness {
    let backend = Arc::new(FakeBackend::default());
    let pool = CredentialPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap();
    let client = RotatingClient::new(backend.clone(), Arc::new(pool), "test-model")
        .with_rotation_delay(Duration::ZERO);
    let store = Arc::new(MemorySessionStore::default());
    let settings = ExamSettings {
        pre_call_delay: Duration::ZERO,
        ..ExamSettings::default()
    };

    Harness {
        examiner: Examiner::new(client, store.clone(), settings),
        backend,
        store,
    }
}

fn reply(text: &str) -> Result<String, GenerationError> {
    Ok(text.to_string())
}

fn eval_reply(score: u32, n: u32) -> Result<String, GenerationError> {
    reply(&format!(
        "Score: {} || Feedback: Feedback {}. || IdealAnswer: Ideal {}. || Followup: Question {}?",
        score,
        n,
        n,
        n + 1
    ))
}

async fn phase(h: &Harness, id: &str) -> Option<SessionPhase> {
    h.store.get(id).await.map(|s| s.phase)
}

/// Start once, answer five times: only the fifth answer completes the session
#[tokio::test]
async fn test_five_answers_complete_the_session() {
    let h = harness(&["k1"]);
    assert_eq!(phase(&h, "s1").await, None);

    h.backend.push_reply(reply("What is a process?"));
    let first = h.examiner.start("s1", Some("Operating Systems")).await.unwrap();
    assert_eq!(first, "What is a process?");
    assert_eq!(phase(&h, "s1").await, Some(SessionPhase::InProgress));

    let mut question = first;
    for n in 1..EXCHANGE_LIMIT {
        h.backend.push_reply(eval_reply(60 + n, n));
        let response = h.examiner.answer("s1", &question, "my answer").await.unwrap();
        match response {
            AnswerResponse::Next {
                score,
                next_question,
                ..
            } => {
                assert_eq!(score, 60 + n);
                question = next_question;
            }
            other => panic!("answer {} completed early: {:?}", n, other),
        }
        assert_eq!(phase(&h, "s1").await, Some(SessionPhase::InProgress));
    }

    h.backend.push_reply(eval_reply(90, EXCHANGE_LIMIT));
    h.backend.push_reply(reply(REPORT_JSON));
    let last = h.examiner.answer("s1", &question, "final answer").await.unwrap();

    match last {
        AnswerResponse::Completed {
            score,
            report,
            average_score,
            ..
        } => {
            assert_eq!(score, 90);
            assert_eq!(report.grade, "B");
            assert_eq!(report.final_verdict, "Solid pass.");
            // 61 + 62 + 63 + 64 + 90
            assert!((average_score - 68.0).abs() < f64::EPSILON);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(phase(&h, "s1").await, Some(SessionPhase::Completed));

    // question + five evaluations + report
    let calls = h.backend.calls();
    assert_eq!(calls.len(), 7);
    let report_prompt = &calls[6].prompt;
    assert!(report_prompt.contains("Q: What is a process?\nA: my answer\nGrade: 61"));
    assert!(report_prompt.contains("A: final answer\nGrade: 90"));
}

#[tokio::test]
async fn test_answer_without_session_is_rejected() {
    let h = harness(&["k1"]);
    let err = h.examiner.answer("ghost", "q", "a").await.unwrap_err();
    assert_eq!(err, VivaError::NoActiveSession);
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn test_completed_session_is_not_resumed() {
    let h = harness(&["k1"]);
    h.backend.push_reply(reply("Q1"));
    h.examiner.start("s1", Some("Networks")).await.unwrap();

    for n in 1..=EXCHANGE_LIMIT {
        h.backend.push_reply(eval_reply(50, n));
    }
    h.backend.push_reply(reply(REPORT_JSON));
    for _ in 0..EXCHANGE_LIMIT {
        h.examiner.answer("s1", "q", "a").await.unwrap();
    }

    let calls_before = h.backend.call_count();
    let err = h.examiner.answer("s1", "q", "a").await.unwrap_err();
    assert_eq!(err, VivaError::SessionCompleted);
    assert_eq!(h.backend.call_count(), calls_before);
}

#[tokio::test]
async fn test_start_resets_an_in_progress_session() {
    let h = harness(&["k1"]);
    h.backend.push_reply(reply("Q1"));
    h.examiner.start("s1", Some("Compilers")).await.unwrap();
    h.backend.push_reply(eval_reply(70, 1));
    h.examiner.answer("s1", "Q1", "a").await.unwrap();
    assert_eq!(h.store.get("s1").await.unwrap().question_count, 1);

    h.backend.push_reply(reply("Fresh question"));
    h.examiner.start("s1", Some("Databases")).await.unwrap();

    let session = h.store.get("s1").await.unwrap();
    assert_eq!(session.topic, "Databases");
    assert_eq!(session.question_count, 0);
    assert!(session.history.is_empty());
    assert!(session.scores.is_empty());
}

#[tokio::test]
async fn test_blank_topic_uses_default() {
    let h = harness(&["k1"]);
    h.backend.push_reply(reply("Q1"));
    h.examiner.start("s1", Some("   ")).await.unwrap();

    assert_eq!(h.store.get("s1").await.unwrap().topic, "General CS");
    assert!(h.backend.calls()[0].prompt.contains("Topic: General CS"));
}

/// Document text is cut to the context budget before any prompt sees it
#[tokio::test]
async fn test_document_context_is_truncated_before_prompting() {
    let h = harness(&["k1"]);
    let text = format!("{}SECRET_TAIL", "word ".repeat(1000));

    h.backend.push_reply(reply("What does the document define?"));
    h.examiner.start_document("s1", &text).await.unwrap();

    let session = h.store.get("s1").await.unwrap();
    assert_eq!(session.topic, DOCUMENT_TOPIC);
    assert_eq!(session.context.as_deref().unwrap().chars().count(), 3000);

    h.backend.push_reply(eval_reply(40, 1));
    h.examiner.answer("s1", "What does the document define?", "x").await.unwrap();

    for call in h.backend.calls() {
        assert!(!call.prompt.contains("SECRET_TAIL"));
    }
    assert!(h.backend.calls()[1]
        .prompt
        .contains("Student is answering based on this document"));
}

#[tokio::test]
async fn test_failed_evaluation_still_counts() {
    let h = harness(&["k1"]);
    h.backend.push_reply(reply("Q1"));
    h.examiner.start("s1", Some("OS")).await.unwrap();

    h.backend
        .push_reply(Err(GenerationError::Fatal("HTTP 500: boom".to_string())));
    let response = h.examiner.answer("s1", "Q1", "a").await.unwrap();

    assert_eq!(
        response,
        AnswerResponse::Next {
            score: 0,
            feedback: "System Error".to_string(),
            ideal_answer: "Error".to_string(),
            next_question: "Error".to_string(),
        }
    );
    assert_eq!(h.store.get("s1").await.unwrap().question_count, 1);
}

#[tokio::test]
async fn test_malformed_report_falls_back() {
    let h = harness(&["k1"]);
    h.backend.push_reply(reply("Q1"));
    h.examiner.start("s1", Some("OS")).await.unwrap();

    for n in 1..=EXCHANGE_LIMIT {
        h.backend.push_reply(eval_reply(50, n));
    }
    h.backend.push_reply(reply("Overall a B, well done."));

    let mut last = None;
    for _ in 0..EXCHANGE_LIMIT {
        last = Some(h.examiner.answer("s1", "q", "a").await.unwrap());
    }

    match last.unwrap() {
        AnswerResponse::Completed { report, .. } => {
            assert_eq!(report.grade, FALLBACK_GRADE);
            assert_eq!(report.final_verdict, FALLBACK_VERDICT);
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exhausted_keys_fail_question_generation() {
    let h = harness(&["k1", "k2"]);
    h.backend
        .push_reply(Err(GenerationError::QuotaExceeded("HTTP 429".into())));
    h.backend
        .push_reply(Err(GenerationError::QuotaExceeded("HTTP 429".into())));

    let err = h.examiner.start("s1", Some("OS")).await.unwrap_err();
    assert_eq!(err, VivaError::CredentialsExhausted { attempts: 2 });
    assert_eq!(h.backend.call_count(), 2);
}
