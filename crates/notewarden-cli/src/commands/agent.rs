use anyhow::Result;
use comfy_table::Cell;
use notewarden_core::models::{Agent, AgentPatch, Capabilities, NewAgent, Scope};
use notewarden_core::services::agent as agents;
use notewarden_core::AppCore;
use std::sync::Arc;

use crate::cli::{AgentCommands, CreateAgentArgs, ScopeArgs, UpdateAgentArgs};
use crate::commands::utils::{format_timestamp, join_list, short_id};
use crate::output::table::{new_table, print_empty, print_table};
use crate::output::{OutputFormat, json::print_json};

pub async fn run(core: Arc<AppCore>, command: AgentCommands, format: OutputFormat) -> Result<()> {
    match command {
        AgentCommands::List { workspace } => list_agents(&core, workspace, format).await,
        AgentCommands::Show { id } => show_agent(&core, &id, format).await,
        AgentCommands::Create(args) => create_agent(&core, args, format).await,
        AgentCommands::Update(args) => update_agent(&core, args, format).await,
        AgentCommands::Delete { id } => delete_agent(&core, &id, format).await,
        AgentCommands::Enable { id } => toggle_agent(&core, &id, true, format).await,
        AgentCommands::Disable { id } => toggle_agent(&core, &id, false, format).await,
    }
}

async fn list_agents(
    core: &Arc<AppCore>,
    workspace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let agents = match workspace {
        Some(workspace) => agents::list_agents(core, &workspace).await?,
        None => agents::list_all_agents(core).await?,
    };

    if format.is_json() {
        return print_json(&agents);
    }

    if agents.is_empty() {
        return print_empty("agents");
    }

    let mut table = new_table(vec!["ID", "Name", "Workspace", "Model", "Caps", "Active", "Updated"]);

    for agent in agents {
        table.add_row(vec![
            Cell::new(short_id(&agent.id)),
            Cell::new(&agent.name),
            Cell::new(&agent.workspace_id),
            Cell::new(format!("{}/{}", agent.provider, agent.model)),
            Cell::new(format_capabilities(&agent.capabilities)),
            Cell::new(if agent.is_active { "yes" } else { "no" }),
            Cell::new(format_timestamp(Some(agent.updated_at))),
        ]);
    }

    print_table(table)
}

async fn show_agent(core: &Arc<AppCore>, id: &str, format: OutputFormat) -> Result<()> {
    let agent = agents::get_agent(core, id).await?;

    if format.is_json() {
        return print_json(&agent);
    }

    print_agent(&agent);
    Ok(())
}

fn print_agent(agent: &Agent) {
    println!("ID:          {}", agent.id);
    println!("Name:        {}", agent.name);
    println!("Workspace:   {}", agent.workspace_id);
    if let Some(description) = &agent.description {
        println!("Description: {description}");
    }
    println!("Model:       {}/{}", agent.provider, agent.model);
    println!("Active:      {}", agent.is_active);
    println!("Can:         {}", format_capabilities(&agent.capabilities));
    println!("Notebooks:   {}", join_list(&agent.scope.notebooks));
    println!("Folders:     {}", join_list(&agent.scope.folders));
    println!("File types:  {}", join_list(&agent.scope.file_types));
    println!(
        "Limits:      {} requests/hour, {} tokens/request",
        agent.max_requests_per_hour, agent.max_tokens_per_request
    );
    println!("Created:     {}", format_timestamp(Some(agent.created_at)));
    println!("Updated:     {}", format_timestamp(Some(agent.updated_at)));

    if let Some(prompt) = &agent.system_prompt {
        println!("\nSystem Prompt:\n{prompt}");
    }
}

fn format_capabilities(capabilities: &Capabilities) -> String {
    let enabled = capabilities.enabled();
    if enabled.is_empty() {
        return "-".to_string();
    }
    enabled
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn apply_scope(mut scope: Scope, args: ScopeArgs) -> Scope {
    if let Some(notebooks) = args.notebooks {
        scope = scope.with_notebooks(notebooks);
    }
    if let Some(folders) = args.folders {
        scope = scope.with_folders(folders);
    }
    if let Some(file_types) = args.file_types {
        scope = scope.with_file_types(file_types);
    }
    scope
}

async fn create_agent(
    core: &Arc<AppCore>,
    args: CreateAgentArgs,
    format: OutputFormat,
) -> Result<()> {
    let defaults = NewAgent::new(&args.workspace, &args.name, &args.provider, &args.model);
    let capabilities = Capabilities {
        can_read: !args.no_read,
        can_write: args.can_write,
        can_create: args.can_create,
        can_delete: args.can_delete,
    };
    let mut new_agent = NewAgent {
        description: args.description,
        ..defaults
    }
    .with_scope(apply_scope(Scope::unrestricted(), args.scope))
    .with_capabilities(capabilities);
    if let Some(limit) = args.max_requests_per_hour {
        new_agent.max_requests_per_hour = limit;
    }
    if let Some(limit) = args.max_tokens_per_request {
        new_agent.max_tokens_per_request = limit;
    }
    if let Some(prompt) = args.prompt {
        new_agent = new_agent.with_system_prompt(prompt);
    }

    let created = agents::create_agent(core, new_agent).await?;

    if format.is_json() {
        return print_json(&created);
    }

    println!("Agent created: {} ({})", created.name, created.id);
    Ok(())
}

async fn update_agent(
    core: &Arc<AppCore>,
    args: UpdateAgentArgs,
    format: OutputFormat,
) -> Result<()> {
    let existing = agents::get_agent(core, &args.id).await?;

    let scope_changed =
        args.scope.notebooks.is_some() || args.scope.folders.is_some() || args.scope.file_types.is_some();
    let mut capabilities = existing.capabilities;
    let mut capabilities_changed = false;
    for (flag, value) in [
        (&mut capabilities.can_read, args.can_read),
        (&mut capabilities.can_write, args.can_write),
        (&mut capabilities.can_create, args.can_create),
        (&mut capabilities.can_delete, args.can_delete),
    ] {
        if let Some(value) = value {
            *flag = value;
            capabilities_changed = true;
        }
    }

    let system_prompt = if args.clear_prompt {
        Some(None)
    } else {
        args.prompt.map(Some)
    };

    let patch = AgentPatch {
        name: args.name,
        description: args.description.map(Some),
        provider: args.provider,
        model: args.model,
        scope: scope_changed.then(|| apply_scope(existing.scope.clone(), args.scope)),
        capabilities: capabilities_changed.then_some(capabilities),
        max_requests_per_hour: args.max_requests_per_hour,
        max_tokens_per_request: args.max_tokens_per_request,
        system_prompt,
    };

    let updated = agents::update_agent(core, &args.id, patch).await?;

    if format.is_json() {
        return print_json(&updated);
    }

    println!("Agent updated: {} ({})", updated.name, updated.id);
    Ok(())
}

async fn delete_agent(core: &Arc<AppCore>, id: &str, format: OutputFormat) -> Result<()> {
    let report = agents::delete_agent(core, id).await?;

    if format.is_json() {
        return print_json(&serde_json::json!({
            "deleted": true,
            "id": id,
            "credentials_removed": report.credentials_removed,
            "sessions_removed": report.sessions_removed,
        }));
    }

    println!(
        "Agent deleted: {id} ({} credentials, {} sessions removed)",
        report.credentials_removed,
        report.sessions_removed.len()
    );
    Ok(())
}

async fn toggle_agent(
    core: &Arc<AppCore>,
    id: &str,
    active: bool,
    format: OutputFormat,
) -> Result<()> {
    let agent = agents::toggle_active(core, id, active).await?;

    if format.is_json() {
        return print_json(&agent);
    }

    let state = if agent.is_active { "enabled" } else { "disabled" };
    println!("Agent {state}: {} ({})", agent.name, agent.id);
    Ok(())
}
