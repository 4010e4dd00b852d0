//! Prompt templates for the three examiner calls.
//!
//! Every document excerpt is cut to a character budget before it is placed in
//! a prompt, so upstream prompt size stays bounded.

/// Default character budget for document excerpts
pub const DEFAULT_CONTEXT_CHARS: usize = 3000;

/// Where a question or evaluation draws its subject from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamContext<'a> {
    Topic(&'a str),
    Document(&'a str),
}

/// Return at most `max_chars` characters of `text`, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Render the question-generation prompt.
pub fn question_prompt(context: ExamContext<'_>, max_chars: usize) -> String {
    match context {
        ExamContext::Document(text) => format!(
            r#"Act as an expert examiner.
I have uploaded a document. Here is a snippet:
"{}..."

Task: Ask ONE specific viva question based on this text.
Constraint: Keep it under 20 words. Do not give the answer."#,
            truncate_chars(text, max_chars)
        ),
        ExamContext::Topic(topic) => format!(
            r#"Act as a strict but fair computer science professor.
Topic: {topic}
Task: Ask ONE short, conceptual interview question about {topic}.
Constraint: Keep it under 20 words. Do not give the answer."#
        ),
    }
}

/// Render the answer-evaluation prompt.
///
/// The reply format is the one `parser::parse_evaluation` reads.
pub fn evaluation_prompt(
    context: ExamContext<'_>,
    question: &str,
    answer: &str,
    max_chars: usize,
) -> String {
    let context_line = match context {
        ExamContext::Document(text) => format!(
            "Context: Student is answering based on this document:\n{}",
            truncate_chars(text, max_chars)
        ),
        ExamContext::Topic(topic) => {
            format!("Context: This is a viva exam specifically on the topic: '{topic}'.")
        }
    };

    format!(
        r#"Act as a strict Examiner.
{context_line}
Current Question: "{question}"
Student Answer: "{answer}"

Task:
1. Grade it (0-100).
2. Give 1 sentence of feedback.
3. Provide the IDEAL correct answer (max 1 sentence).
4. Ask a short FOLLOW-UP question.

CRITICAL: Use this format strictly:
Score: [num] || Feedback: [text] || IdealAnswer: [text] || Followup: [text]"#
    )
}

/// Render the final report prompt over the flattened session history.
pub fn report_prompt(history: &str) -> String {
    format!(
        r#"Act as a Senior Professor.
Review this viva session history:
{history}

Task: Generate a final performance report.
Return ONLY JSON:
{{
    "grade": "A/B/C/F",
    "strengths": ["point1", "point2"],
    "weaknesses": ["point1", "point2"],
    "final_verdict": "One sentence summary."
}}"#
    )
}
