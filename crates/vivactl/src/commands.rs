//! Command implementations for vivactl.

use crate::client::VivaClient;
use crate::output;
use anyhow::{bail, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use viva_common::AnswerResponse;

type StdinLines = Lines<BufReader<Stdin>>;

pub async fn exam(client: &VivaClient, topic: Option<&str>) -> Result<()> {
    let start = client.start(topic).await?;
    println!("Session {}", start.session_id.dimmed());
    run_exam(client, &start.session_id, start.message).await
}

pub async fn upload(client: &VivaClient, file: &Path) -> Result<()> {
    let upload = client.upload(file).await?;
    println!(
        "Uploaded {} (session {})",
        file.display(),
        upload.session_id.dimmed()
    );
    run_exam(client, &upload.session_id, upload.message).await
}

pub async fn health(client: &VivaClient) -> Result<()> {
    let health = client.health().await?;
    output::display_health(&health);
    Ok(())
}

async fn read_answer(lines: &mut StdinLines) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        match lines.next_line().await? {
            None => return Ok(None),
            Some(line) if line.trim() == ":quit" => return Ok(None),
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => return Ok(Some(line.trim().to_string())),
        }
    }
}

/// Ask, answer and grade until the daemon reports completion.
async fn run_exam(client: &VivaClient, session_id: &str, first_question: String) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut question = first_question;
    let mut number = 1;

    println!("{}", "Answer each question, or type :quit to stop.".dimmed());

    loop {
        output::display_question(number, &question);
        let Some(answer) = read_answer(&mut lines).await? else {
            println!("Exam abandoned.");
            return Ok(());
        };

        match client.answer(session_id, &question, &answer).await? {
            AnswerResponse::Next {
                score,
                feedback,
                ideal_answer,
                next_question,
            } => {
                output::display_evaluation(score, &feedback, Some(&ideal_answer));
                question = next_question;
                number += 1;
            }
            AnswerResponse::Completed {
                score,
                feedback,
                average_score,
                report,
            } => {
                output::display_evaluation(score, &feedback, None);
                output::display_report(average_score, &report);
                return Ok(());
            }
        }

        if number > viva_common::EXCHANGE_LIMIT {
            bail!("daemon kept asking after {} answers", viva_common::EXCHANGE_LIMIT);
        }
    }
}
