use anyhow::{Result, bail};
use comfy_table::Cell;
use notewarden_core::services::credentials;
use notewarden_core::AppCore;
use std::sync::Arc;

use crate::cli::CredentialCommands;
use crate::commands::utils::{format_timestamp, read_stdin_to_string};
use crate::output::table::{new_table, print_empty, print_table};
use crate::output::{OutputFormat, json::print_json};

pub async fn run(
    core: Arc<AppCore>,
    command: CredentialCommands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        CredentialCommands::List { agent_id } => list_credentials(&core, &agent_id, format).await,
        CredentialCommands::Set {
            agent_id,
            key,
            value,
        } => set_credential(&core, &agent_id, &key, value, format).await,
        CredentialCommands::Delete { agent_id, key } => {
            delete_credential(&core, &agent_id, &key, format).await
        }
    }
}

async fn list_credentials(core: &Arc<AppCore>, agent_id: &str, format: OutputFormat) -> Result<()> {
    let summaries = credentials::list_credentials(core, agent_id).await?;

    if format.is_json() {
        return print_json(&summaries);
    }

    if summaries.is_empty() {
        return print_empty("credentials");
    }

    let mut table = new_table(vec!["Key", "Created"]);
    for summary in summaries {
        table.add_row(vec![
            Cell::new(&summary.key),
            Cell::new(format_timestamp(Some(summary.created_at))),
        ]);
    }
    print_table(table)
}

async fn set_credential(
    core: &Arc<AppCore>,
    agent_id: &str,
    key: &str,
    value: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let value = match value {
        Some(value) => value,
        None => read_stdin_to_string()?,
    };
    if value.is_empty() {
        bail!("A credential value is required");
    }

    let summary = credentials::set_credential(core, agent_id, key, &value).await?;

    if format.is_json() {
        return print_json(&summary);
    }

    println!("Credential stored: {} for agent {agent_id}", summary.key);
    Ok(())
}

async fn delete_credential(
    core: &Arc<AppCore>,
    agent_id: &str,
    key: &str,
    format: OutputFormat,
) -> Result<()> {
    let deleted = credentials::delete_credential(core, agent_id, key).await?;

    if format.is_json() {
        return print_json(&serde_json::json!({ "deleted": deleted, "key": key }));
    }

    if deleted {
        println!("Credential deleted: {key}");
    } else {
        println!("No credential named {key}");
    }
    Ok(())
}
