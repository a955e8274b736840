/*
[INPUT]:  Authenticated client, parsed command arguments, local state
[OUTPUT]: One-shot task operations printed to stdout
[POS]:    CLI command handlers (everything except `watch`)
[UPDATE]: When adding subcommands or changing their output
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use casegen_adapter::{
    CasegenClient, ClarificationReply, DirectorySink, ModelChoice, NewTask, TaskBoard,
    TaskId, default_template, select_model,
};
use console::style;
use tracing::debug;

use crate::state::storage::Storage;
use crate::ui::{format_entry, format_page};

/// Arguments of `casegen create`
#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub file: PathBuf,
    pub output: String,
    pub template: Option<i64>,
    pub model: Option<String>,
    pub advanced_parsing: bool,
}

pub async fn list(client: &CasegenClient, page: u32, page_size: u32) -> Result<()> {
    let board = TaskBoard::new(client.clone(), page_size);
    if page > 1 {
        board.go_to_page(page).await.context("load task page")?;
    } else {
        board.refresh().await.context("load task page")?;
    }
    println!("{}", format_page(&board.snapshot()));
    Ok(())
}

/// Upload, resolve template and model, submit. Returns the new task id.
pub async fn create(client: &CasegenClient, storage: &Storage, args: CreateArgs) -> Result<TaskId> {
    let model = resolve_model(client, storage, args.model.as_deref()).await?;
    let template = match args.template {
        Some(id) => Some(id),
        None => {
            let templates = client.list_templates().await.context("list templates")?;
            default_template(&templates).map(|template| template.id)
        }
    };

    let uploaded = client
        .upload_file(&args.file)
        .await
        .with_context(|| format!("upload {}", args.file.display()))?;
    let task = NewTask::new(uploaded, args.output, &model)
        .template(template)
        .advanced_parsing(args.advanced_parsing);
    let created = client.create_task(&task).await.context("create task")?;

    if let Err(err) = storage.remember_model(&model.to_string()).await {
        debug!(error = %err, "could not remember model choice");
    }

    println!(
        "{} {} ({}, {})",
        style("Task created:").green(),
        style(created.id).cyan(),
        created.original_filename,
        model
    );
    Ok(created.id)
}

async fn resolve_model(
    client: &CasegenClient,
    storage: &Storage,
    explicit: Option<&str>,
) -> Result<ModelChoice> {
    if let Some(raw) = explicit {
        return raw.parse().map_err(|err| anyhow!("--model: {err}"));
    }
    let groups = client.list_model_groups().await.context("list models")?;
    let remembered = storage.last_model().await;
    select_model(remembered.as_deref(), &groups)
        .ok_or_else(|| anyhow!("no models configured on the server; pass --model provider:model"))
}

pub async fn clarify(
    client: &CasegenClient,
    task_id: TaskId,
    reply: ClarificationReply,
    page_size: u32,
) -> Result<()> {
    let board = locate(client, task_id, page_size).await?;
    let task = board.clarify(task_id, reply).await.context("clarify task")?;
    println!(
        "{} task {} is {}",
        style("Clarification sent:").green(),
        task.id,
        task.status
    );
    Ok(())
}

pub async fn summary(client: &CasegenClient, task_id: TaskId, page_size: u32) -> Result<()> {
    let board = locate(client, task_id, page_size).await?;
    let summary = board.summary(task_id).await.context("fetch summary")?;
    println!("{summary}");
    Ok(())
}

pub async fn download(
    client: &CasegenClient,
    task_id: TaskId,
    dir: &Path,
    page_size: u32,
) -> Result<PathBuf> {
    let board = locate(client, task_id, page_size).await?;
    let sink = DirectorySink::new(dir);
    let path = board
        .download(task_id, &sink)
        .await
        .context("download artifact")?;
    println!("{} {}", style("Saved:").green(), path.display());
    Ok(path)
}

pub async fn delete(client: &CasegenClient, task_id: TaskId) -> Result<()> {
    client.delete_task(task_id).await.context("delete task")?;
    println!("{} {}", style("Task deleted:").green(), task_id);
    Ok(())
}

pub async fn models(client: &CasegenClient, storage: &Storage) -> Result<()> {
    let groups = client.list_model_groups().await.context("list models")?;
    if groups.is_empty() {
        println!("{}", style("No models configured.").yellow());
        return Ok(());
    }
    let remembered = storage.last_model().await;
    let selected = select_model(remembered.as_deref(), &groups);
    for group in &groups {
        println!("{}", style(&group.name).bold());
        for choice in group.choices() {
            let marker = if selected.as_ref() == Some(&choice) { "*" } else { " " };
            println!("  {marker} {choice}");
        }
    }
    Ok(())
}

pub async fn templates(client: &CasegenClient) -> Result<()> {
    let templates = client.list_templates().await.context("list templates")?;
    if templates.is_empty() {
        println!("{}", style("No templates.").yellow());
        return Ok(());
    }
    for template in &templates {
        let mut tags = Vec::new();
        if template.is_default {
            tags.push("default");
        }
        if template.is_system {
            tags.push("system");
        }
        println!(
            "{:>4}  {}  {}",
            template.id,
            template.name,
            style(tags.join(", ")).dim()
        );
    }
    Ok(())
}

/// Walk pages until the task shows up; the returned board has it loaded
pub async fn locate(client: &CasegenClient, task_id: TaskId, page_size: u32) -> Result<TaskBoard> {
    let board = TaskBoard::new(client.clone(), page_size);
    board.refresh().await.context("load task page")?;
    loop {
        let snapshot = board.snapshot();
        if let Some(entry) = snapshot.entry(task_id) {
            println!("{}", format_entry(entry));
            return Ok(board);
        }
        if !board.next_page().await.context("load task page")? {
            return Err(anyhow!("task {task_id} not found"));
        }
    }
}
