use anyhow::Result;
use comfy_table::Cell;
use notewarden_core::models::AgentSession;
use notewarden_core::services::sessions;
use notewarden_core::AppCore;
use std::sync::Arc;

use crate::cli::SessionCommands;
use crate::commands::utils::{format_timestamp, join_list, short_id};
use crate::output::table::{new_table, print_empty, print_table};
use crate::output::{OutputFormat, json::print_json};

pub async fn run(core: Arc<AppCore>, command: SessionCommands, format: OutputFormat) -> Result<()> {
    match command {
        SessionCommands::List { agent } => list_sessions(&core, agent, format).await,
        SessionCommands::Show { id } => show_session(&core, &id, format).await,
        SessionCommands::Cancel { id } => cancel_session(&core, &id, format).await,
        SessionCommands::Logs { id } => show_logs(&core, &id, format).await,
    }
}

async fn list_sessions(
    core: &Arc<AppCore>,
    agent: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let list = match agent {
        Some(agent_id) => sessions::list_sessions(core, &agent_id).await?,
        None => sessions::list_all_sessions(core).await?,
    };

    if format.is_json() {
        return print_json(&list);
    }

    if list.is_empty() {
        return print_empty("sessions");
    }

    let mut table = new_table(vec!["ID", "Agent", "Status", "Calls", "Tokens", "Started", "Ended"]);
    for session in list {
        table.add_row(vec![
            Cell::new(short_id(&session.id)),
            Cell::new(short_id(&session.agent_id)),
            Cell::new(session.status),
            Cell::new(session.api_calls_made),
            Cell::new(session.tokens_used),
            Cell::new(format_timestamp(Some(session.started_at))),
            Cell::new(format_timestamp(session.completed_at)),
        ]);
    }
    print_table(table)
}

fn print_session(session: &AgentSession) {
    println!("ID:          {}", session.id);
    println!("Agent:       {}", session.agent_id);
    println!("User:        {}", session.user_id);
    if let Some(task_id) = &session.task_id {
        println!("Task:        {task_id}");
    }
    println!(
        "Notebook:    {}",
        session.notebook_path.as_deref().unwrap_or("-")
    );
    println!("Status:      {}", session.status);
    println!("API calls:   {}", session.api_calls_made);
    println!("Tokens:      {}", session.tokens_used);
    println!("Modified:    {}", join_list(&session.files_modified));
    println!("Started:     {}", format_timestamp(Some(session.started_at)));
    println!("Ended:       {}", format_timestamp(session.completed_at));
    if let Some(error) = &session.error_message {
        println!("Error:       {error}");
    }
}

async fn show_session(core: &Arc<AppCore>, id: &str, format: OutputFormat) -> Result<()> {
    let session = sessions::get_session(core, id).await?;

    if format.is_json() {
        return print_json(&session);
    }

    print_session(&session);
    Ok(())
}

async fn cancel_session(core: &Arc<AppCore>, id: &str, format: OutputFormat) -> Result<()> {
    let session = sessions::cancel_session(core, id).await?;

    if format.is_json() {
        return print_json(&session);
    }

    println!("Session {}: {}", session.id, session.status);
    Ok(())
}

async fn show_logs(core: &Arc<AppCore>, id: &str, format: OutputFormat) -> Result<()> {
    let logs = sessions::get_session_logs(core, id).await?;

    if format.is_json() {
        return print_json(&logs);
    }

    if logs.is_empty() {
        return print_empty("action logs");
    }

    let mut table = new_table(vec!["Time", "Action", "Target", "Allowed", "ms", "Output"]);
    for log in logs {
        table.add_row(vec![
            Cell::new(format_timestamp(Some(log.timestamp))),
            Cell::new(&log.action_type),
            Cell::new(log.target_path.as_deref().unwrap_or("-")),
            Cell::new(if log.was_allowed { "yes" } else { "DENIED" }),
            Cell::new(log.execution_time_ms),
            Cell::new(&log.output_summary),
        ]);
    }
    print_table(table)
}
