use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use task_ranker::engine::{BatchOutcome, RankEngine};
use task_ranker::oracle::GeminiClient;
use task_ranker::store::{create_task_store, TaskStore};
use task_ranker::task::Task;
use task_ranker::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("task_ranker=info")),
        )
        .with(fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        "starting with model {} and {:?} store",
        config.model,
        config.store_type
    );

    let store: Arc<dyn TaskStore> = Arc::from(
        create_task_store(config.store_type, config.data_dir.clone())
            .await
            .map_err(|e| anyhow!("failed to initialize task store: {}", e))?,
    );
    let oracle = Arc::new(GeminiClient::new(
        config.api_key.clone(),
        config.model.clone(),
    ));
    let engine = RankEngine::new(oracle, store.clone());
    let limits = config.plan.limits();

    // open the most recently touched list, or create a first one
    let list_id = match store
        .list_lists()
        .await
        .map_err(|e| anyhow!("failed to enumerate lists: {}", e))?
        .first()
    {
        Some(summary) => {
            println!("Opening list '{}'", summary.name);
            summary.id
        }
        None => {
            if !limits.allows_new_list(0) {
                return Err(anyhow!("plan {} does not allow creating a list", config.plan));
            }
            println!("No lists yet, creating 'My Tasks'");
            engine.create_list("My Tasks").await?
        }
    };
    let tasks = engine.open_list(list_id).await?;
    render(&tasks);

    println!("commands: add <text> [due:YYYY-MM-DD] | rm <n> | mv <n> <m> | ls | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match handle_command(&engine, list_id, &limits, line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("error: {}", e),
        }
    }
    Ok(())
}

async fn handle_command(
    engine: &RankEngine,
    list_id: Uuid,
    limits: &task_ranker::plan::PlanLimits,
    line: &str,
) -> anyhow::Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "quit" | "exit" => Ok(false),
        "ls" => {
            render(&engine.tasks(list_id).await?);
            Ok(true)
        }
        "add" => {
            let current = engine.tasks(list_id).await?.len();
            if !limits.allows_new_task(current) {
                return Err(anyhow!("task limit reached for this plan"));
            }
            let (text, due) = split_due(rest)?;
            if text.is_empty() {
                return Err(anyhow!("usage: add <text> [due:YYYY-MM-DD]"));
            }
            let outcome = engine.add_task(list_id, text, due).await?;
            report(&outcome.outcome);
            render(&outcome.tasks);
            Ok(true)
        }
        "rm" => {
            let index: usize = rest.trim().parse().context("usage: rm <n>")?;
            let tasks = engine.tasks(list_id).await?;
            let task = tasks
                .get(index)
                .ok_or_else(|| anyhow!("no task at index {}", index))?;
            let outcome = engine.remove_task(list_id, task.id).await?;
            report(&outcome.outcome);
            render(&outcome.tasks);
            Ok(true)
        }
        "mv" => {
            let mut parts = rest.split_whitespace();
            let from: usize = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow!("usage: mv <from> <to>"))?;
            let to: usize = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow!("usage: mv <from> <to>"))?;
            let outcome = engine.move_task(list_id, from, to).await?;
            report(&outcome.outcome);
            render(&outcome.tasks);
            Ok(true)
        }
        other => Err(anyhow!("unknown command: {}", other)),
    }
}

/// Split a trailing `due:YYYY-MM-DD` marker off the task text.
fn split_due(rest: &str) -> anyhow::Result<(&str, Option<NaiveDate>)> {
    match rest.rsplit_once(" due:") {
        Some((text, date)) => {
            let due = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .context("due date must be YYYY-MM-DD")?;
            Ok((text.trim(), Some(due)))
        }
        None => Ok((rest.trim(), None)),
    }
}

fn report(outcome: &BatchOutcome) {
    match outcome {
        BatchOutcome::Ranked => println!("ranked."),
        BatchOutcome::Failed { reason } => println!("ranking failed: {}", reason),
        BatchOutcome::Empty => {}
        BatchOutcome::Superseded => println!("superseded by a newer change."),
    }
}

fn render(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("  (empty)");
        return;
    }
    for (i, task) in tasks.iter().enumerate() {
        let rank = task
            .rank
            .map(|r| format!("#{}", r))
            .unwrap_or_else(|| "--".to_string());
        let due = task
            .due_date
            .map(|d| format!(" due {}", d))
            .unwrap_or_default();
        let note = match task.error_reason() {
            Some(reason) => format!("  [error: {}]", reason),
            None => task
                .justification
                .as_deref()
                .map(|j| format!("  ({})", j))
                .unwrap_or_default(),
        };
        println!("  {:>2}. {:>3}  {}{}{}", i, rank, task.text, due, note);
    }
}
