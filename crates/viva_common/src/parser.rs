//! Reply parsing for evaluation and report calls.
//!
//! Evaluation replies follow a loose pipe-delimited format:
//!
//! ```text
//! reply    := field ( "||" field )*
//! field    := "Score:" int
//!           | "Feedback:" text
//!           | "IdealAnswer:" text
//!           | ("Followup:" | "Next Question:" | "Next:") text
//! text     := any characters up to the next "||", the next field marker, or end
//! ```
//!
//! Markers are case-insensitive, may appear in any order and may be missing.
//! Each field is searched for on its own and falls back to a fixed default,
//! so one bad field never spoils the others. Parsing never fails.
//!
//! Report replies are JSON, optionally wrapped in a markdown code fence.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_FEEDBACK: &str = "Feedback unavailable.";
pub const DEFAULT_IDEAL_ANSWER: &str = "N/A";
/// Used when the reply has no follow-up marker at all
pub const DEFAULT_NEXT_QUESTION: &str = "Let's move to the next topic.";
/// Used when the follow-up marker is present but empty or "undefined"
pub const FALLBACK_NEXT_QUESTION: &str = "Tell me about a key concept in this topic.";

pub const FALLBACK_GRADE: &str = "Completed";
pub const FALLBACK_STRENGTH: &str = "Completed 5 questions";
pub const FALLBACK_WEAKNESS: &str = "Review needed";
pub const FALLBACK_VERDICT: &str = "Good effort! Check the console for details.";

static SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Score:\s*([0-9]+)").expect("score regex")
});

static FEEDBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)Feedback:\s*(.*?)\s*(?:\|\||IdealAnswer:|Followup:|Next Question:|Next:|Score:|$)",
    )
    .expect("feedback regex")
});

static IDEAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)IdealAnswer:\s*(.*?)\s*(?:\|\||Followup:|Next Question:|Next:|Score:|Feedback:|$)",
    )
    .expect("ideal answer regex")
});

static FOLLOWUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)(?:Followup|Next Question|Next):\s*(.*?)\s*(?:\|\||Score:|Feedback:|IdealAnswer:|$)",
    )
    .expect("followup regex")
});

/// Structured result of grading one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u32,
    pub feedback: String,
    pub ideal_answer: String,
    pub next_question: String,
}

impl Evaluation {
    /// Stand-in used when the grading call itself failed.
    pub fn system_error() -> Self {
        Self {
            score: 0,
            feedback: "System Error".to_string(),
            ideal_answer: "Error".to_string(),
            next_question: "Error".to_string(),
        }
    }
}

/// Final summary produced once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub final_verdict: String,
}

impl Report {
    pub fn fallback() -> Self {
        Self {
            grade: FALLBACK_GRADE.to_string(),
            strengths: vec![FALLBACK_STRENGTH.to_string()],
            weaknesses: vec![FALLBACK_WEAKNESS.to_string()],
            final_verdict: FALLBACK_VERDICT.to_string(),
        }
    }
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

/// First integer after `Score:`, capped at 100. Zero when missing.
pub fn parse_score(text: &str) -> u32 {
    SCORE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        // only ASCII digits match, so a parse failure is an overflow
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX).min(100) as u32)
        .unwrap_or(0)
}

pub fn parse_feedback(text: &str) -> String {
    capture(&FEEDBACK_RE, text)
        .unwrap_or(DEFAULT_FEEDBACK)
        .to_string()
}

pub fn parse_ideal_answer(text: &str) -> String {
    capture(&IDEAL_RE, text)
        .unwrap_or(DEFAULT_IDEAL_ANSWER)
        .to_string()
}

pub fn parse_next_question(text: &str) -> String {
    let Some(caps) = FOLLOWUP_RE.captures(text) else {
        return DEFAULT_NEXT_QUESTION.to_string();
    };

    let next = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    if next.is_empty() || next.eq_ignore_ascii_case("undefined") {
        FALLBACK_NEXT_QUESTION.to_string()
    } else {
        next.to_string()
    }
}

/// Decode an evaluation reply. Missing fields take their defaults.
pub fn parse_evaluation(text: &str) -> Evaluation {
    let evaluation = Evaluation {
        score: parse_score(text),
        feedback: parse_feedback(text),
        ideal_answer: parse_ideal_answer(text),
        next_question: parse_next_question(text),
    };

    if !SCORE_RE.is_match(text) {
        warn!("Evaluation reply had no score marker, defaulting to 0");
    }

    evaluation
}

/// Remove a surrounding markdown code fence (with optional language tag).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let (first_line, remainder) = match rest.find('\n') {
                Some(nl) => (&rest[..nl], &rest[nl + 1..]),
                None => (rest, ""),
            };
            let tag = first_line.trim();
            if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                remainder
            } else if remainder.is_empty() {
                // single-line fence such as ```json{...}```
                first_line.trim_start_matches(|c: char| c.is_ascii_alphabetic())
            } else {
                rest
            }
        }
        None => trimmed,
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Outermost `{ ... }` span, for replies with prose around the JSON.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode a report reply, falling back to `Report::fallback()` on bad JSON.
pub fn parse_report(text: &str) -> Report {
    let cleaned = strip_code_fence(text);

    if let Ok(report) = serde_json::from_str::<Report>(cleaned) {
        return report;
    }

    if let Some(report) = extract_json_object(cleaned)
        .and_then(|json| serde_json::from_str::<Report>(json).ok())
    {
        return report;
    }

    warn!("Report reply was not valid JSON, using fallback report: {}", text);
    Report::fallback()
}
