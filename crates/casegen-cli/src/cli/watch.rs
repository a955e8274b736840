/*
[INPUT]:  Shared TaskBoard, lifecycle events, session state, shutdown token
[OUTPUT]: Live task view with interactive clarification and optional auto-download
[POS]:    CLI long-running mode (`casegen watch`)
[UPDATE]: When changing event reactions or exit conditions
*/

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use casegen_adapter::{
    ArtifactSink, SessionState, SignOutReason, TaskBoard, TaskEntry, TaskEvent,
};
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::interactive::ClarificationPrompter;
use crate::ui::format_page;

/// Why the watch loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    Interrupted,
    SignedOut,
}

pub struct WatchOptions {
    pub page: u32,
    pub interval: Duration,
    /// Save finished tasks here as they complete
    pub auto_download: Option<Box<dyn ArtifactSink>>,
}

pub async fn run_watch(
    mut board: TaskBoard,
    options: WatchOptions,
    prompter: Arc<dyn ClarificationPrompter>,
    shutdown: CancellationToken,
) -> Result<WatchExit> {
    let mut events = board
        .take_events()
        .ok_or_else(|| anyhow!("task board events already taken"))?;
    let board = Arc::new(board);

    if options.page > 1 {
        board
            .go_to_page(options.page)
            .await
            .context("open task page")?;
    }

    let mut snapshots = board.subscribe();
    let mut session = board.client().session().subscribe();
    let poller = board.start_polling(options.interval);
    info!(page = options.page, interval_secs = options.interval.as_secs(), "watching tasks");

    let mut shown: Option<Vec<TaskEntry>> = None;
    let exit = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break WatchExit::Interrupted,
            changed = session.changed() => {
                if changed.is_err() {
                    break WatchExit::SignedOut;
                }
                let state = session.borrow_and_update().clone();
                if let SessionState::SignedOut { reason } = state {
                    if reason == SignOutReason::Unauthorized {
                        println!(
                            "{}",
                            style("Session expired. Log in again to continue.").red().bold()
                        );
                    }
                    break WatchExit::SignedOut;
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break WatchExit::Interrupted;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                // polls republish identical pages; only redraw on change
                if shown.as_ref() != Some(&snapshot.entries) {
                    println!("\n{}", format_page(&snapshot));
                    shown = Some(snapshot.entries.clone());
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break WatchExit::Interrupted;
                };
                tokio::select! {
                    _ = shutdown.cancelled() => break WatchExit::Interrupted,
                    result = handle_event(&board, event, prompter.as_ref(), options.auto_download.as_deref()) => {
                        if let Err(err) = result {
                            println!("{} {err:#}", style("error:").red());
                        }
                    }
                }
            }
        }
    };

    poller.stop().await;
    debug!(?exit, "watch loop finished");
    Ok(exit)
}

/// React to one lifecycle event. Errors are the user's to see; the loop continues.
pub async fn handle_event(
    board: &TaskBoard,
    event: TaskEvent,
    prompter: &dyn ClarificationPrompter,
    auto_download: Option<&dyn ArtifactSink>,
) -> Result<()> {
    match event {
        TaskEvent::ClarificationRequested { task_id, question } => {
            let reply = match prompter.ask(task_id, &question).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(task_id, error = %err, "clarification prompt failed");
                    None
                }
            };
            let Some(reply) = reply else {
                println!(
                    "{}",
                    style(format!("Task {task_id} still waiting for clarification.")).dim()
                );
                return Ok(());
            };
            let task = board
                .clarify(task_id, reply)
                .await
                .with_context(|| format!("clarify task {task_id}"))?;
            println!(
                "{} task {} is {}",
                style("Clarification sent:").green(),
                task_id,
                task.status
            );
        }
        TaskEvent::Resumed { task_id } => {
            println!("{}", style(format!("Task {task_id} resumed.")).dim());
        }
        TaskEvent::Finished { task_id } => {
            println!("{} {}", style("Task finished:").green().bold(), task_id);
            if let Some(sink) = auto_download {
                let path = board
                    .download(task_id, sink)
                    .await
                    .with_context(|| format!("download task {task_id}"))?;
                println!("{} {}", style("Saved:").green(), path.display());
            }
        }
        TaskEvent::Failed { task_id, error } => {
            println!("{} {} {}", style("Task failed:").red().bold(), task_id, error);
        }
        TaskEvent::LeftPage { task_id } => {
            debug!(task_id, "task left the displayed page");
        }
    }
    Ok(())
}
