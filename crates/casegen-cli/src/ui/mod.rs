/*
[INPUT]:  Page snapshots and task entries from the board
[OUTPUT]: Styled text rows for the terminal
[POS]:    Presentation layer - status styling and action hints
[UPDATE]: When task phases, actions, or list columns change
*/

use casegen_adapter::{PageSnapshot, TaskAction, TaskEntry, TaskPhase};
use console::{StyledObject, style};

pub fn status_badge(phase: &TaskPhase) -> StyledObject<&'static str> {
    let label = phase.status().label();
    match phase {
        TaskPhase::Running => style(label).blue(),
        TaskPhase::Clarifying { .. } => style(label).yellow().bold(),
        TaskPhase::Finished { .. } => style(label).green(),
        TaskPhase::Failed { .. } => style(label).red().bold(),
    }
}

pub fn action_label(action: TaskAction) -> &'static str {
    match action {
        TaskAction::Reply => "reply",
        TaskAction::Skip => "skip",
        TaskAction::Stop => "stop",
        TaskAction::Download => "download",
        TaskAction::ViewSummary => "summary",
        TaskAction::Delete => "delete",
    }
}

/// One list row plus a detail line for clarifying/failed tasks
pub fn format_entry(entry: &TaskEntry) -> String {
    let task = &entry.task;
    let finished = match &entry.phase {
        TaskPhase::Finished { finished_at, .. } | TaskPhase::Failed { finished_at, .. } => {
            finished_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        }
        _ => "-".to_string(),
    };
    let actions = entry
        .actions()
        .iter()
        .map(|action| action_label(*action))
        .collect::<Vec<_>>()
        .join(", ");

    let mut row = format!(
        "{:>6}  {:<32}  {:<10}  {}  {}  [{}]",
        task.id,
        truncate(&task.original_filename, 32),
        status_badge(&entry.phase),
        task.created_at.format("%Y-%m-%d %H:%M"),
        finished,
        style(actions).dim()
    );

    match &entry.phase {
        TaskPhase::Clarifying { question } => {
            row.push_str(&format!("\n        {} {}", style("?").yellow(), question));
        }
        TaskPhase::Failed { error, .. } => {
            row.push_str(&format!("\n        {} {}", style("!").red(), error));
        }
        _ => {}
    }
    row
}

pub fn format_page(snapshot: &PageSnapshot) -> String {
    let pagination = snapshot.pagination;
    let mut out = String::new();
    if snapshot.entries.is_empty() {
        out.push_str(&style("No tasks.").yellow().to_string());
    } else {
        let rows: Vec<String> = snapshot.entries.iter().map(format_entry).collect();
        out.push_str(&rows.join("\n"));
    }
    out.push_str(&format!(
        "\n{}",
        style(format!(
            "page {}/{} · {} task(s)",
            pagination.page,
            pagination.total_pages(),
            pagination.total
        ))
        .dim()
    ));
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}
