/*
[INPUT]:  Terminal input via dialoguer
[OUTPUT]: Clarification replies and login credentials
[POS]:    CLI interactive prompts
[UPDATE]: When prompt choices or credential flow change
*/

use anyhow::{Context, Result};
use async_trait::async_trait;
use casegen_adapter::{ClarificationReply, TaskId};
use console::style;
use dialoguer::{Input, Password, Select, theme::ColorfulTheme};

/// Source of answers for clarification requests.
///
/// `Ok(None)` leaves the task waiting; it can be answered later with
/// `casegen clarify`.
#[async_trait]
pub trait ClarificationPrompter: Send + Sync {
    async fn ask(&self, task_id: TaskId, question: &str) -> Result<Option<ClarificationReply>>;
}

/// Interactive prompter on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

#[async_trait]
impl ClarificationPrompter for DialoguerPrompter {
    async fn ask(&self, task_id: TaskId, question: &str) -> Result<Option<ClarificationReply>> {
        let question = question.to_string();
        // dialoguer blocks on stdin
        tokio::task::spawn_blocking(move || ask_blocking(task_id, &question))
            .await
            .context("clarification prompt panicked")?
    }
}

fn ask_blocking(task_id: TaskId, question: &str) -> Result<Option<ClarificationReply>> {
    let theme = ColorfulTheme::default();
    println!(
        "\n{} {}",
        style(format!("Task {task_id} needs clarification:")).bold().yellow(),
        question
    );

    let choices = [
        "Answer",
        "Skip (continue without clarifying)",
        "Stop generation",
        "Later",
    ];
    let selection = Select::with_theme(&theme)
        .with_prompt("Reply")
        .items(&choices)
        .default(0)
        .interact()?;

    let reply = match selection {
        0 => {
            let answer: String = Input::with_theme(&theme)
                .with_prompt("Your answer")
                .validate_with(|input: &String| {
                    if input.trim().is_empty() {
                        Err("answer cannot be blank")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()?;
            Some(ClarificationReply::answer(answer))
        }
        1 => Some(ClarificationReply::Skip),
        2 => Some(ClarificationReply::Stop),
        _ => None,
    };
    Ok(reply)
}

/// Ask for whichever credential is missing
pub fn prompt_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Result<(String, String)> {
    let theme = ColorfulTheme::default();
    let username = match username {
        Some(username) => username,
        None => Input::with_theme(&theme)
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::with_theme(&theme)
            .with_prompt("Password")
            .interact()?,
    };
    Ok((username, password))
}
