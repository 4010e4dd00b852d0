//! Terminal output for exams, reports and health.

use owo_colors::OwoColorize;
use viva_common::{HealthResponse, Report, EXCHANGE_LIMIT};

const SEPARATOR: &str = "----------------------------------------";

/// Colour band for a 0-100 score
fn score_label(score: u32) -> String {
    let text = format!("{}/100", score);
    if score >= 75 {
        text.bright_green().to_string()
    } else if score >= 50 {
        text.yellow().to_string()
    } else {
        text.bright_red().to_string()
    }
}

pub fn display_question(number: u32, question: &str) {
    println!();
    println!(
        "{} {}",
        format!("[Q{}/{}]", number, EXCHANGE_LIMIT).cyan().bold(),
        question
    );
}

pub fn display_evaluation(score: u32, feedback: &str, ideal_answer: Option<&str>) {
    println!();
    println!("Score:    {}", score_label(score));
    println!("Feedback: {}", feedback);
    if let Some(ideal) = ideal_answer {
        println!("Ideal:    {}", ideal.dimmed());
    }
}

pub fn display_report(average_score: f64, report: &Report) {
    println!();
    println!("{}", SEPARATOR.dimmed());
    println!("{}", "[FINAL REPORT]".bold());
    println!("Grade:   {}", report.grade.bright_cyan().bold());
    println!("Average: {:.1}", average_score);

    if !report.strengths.is_empty() {
        println!();
        println!("{}", "Strengths".green());
        for item in &report.strengths {
            println!("  + {}", item);
        }
    }
    if !report.weaknesses.is_empty() {
        println!();
        println!("{}", "Weaknesses".yellow());
        for item in &report.weaknesses {
            println!("  - {}", item);
        }
    }

    println!();
    println!("{}", report.final_verdict);
    println!("{}", SEPARATOR.dimmed());
}

pub fn display_health(health: &HealthResponse) {
    println!("[{}] vivad v{}", health.status.bright_green(), health.version);
    println!("  uptime:          {}s", health.uptime_seconds);
    println!("  api keys:        {}", health.credentials);
    println!("  active sessions: {}", health.active_sessions);
}

pub fn display_error(message: &str) {
    eprintln!();
    eprintln!("[ERROR] {}", message.red());
    eprintln!();
}
