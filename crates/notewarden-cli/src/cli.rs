use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "notewarden")]
#[command(version, about = "Notewarden - scoped AI agents for your notebooks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ~/.notewarden/notewarden.db)
    #[arg(long, global = true, env = "NOTEWARDEN_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Config file (defaults to ~/.config/notewarden/config.toml)
    #[arg(long, global = true, env = "NOTEWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Agent management
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },

    /// Per-agent credentials
    Credential {
        #[command(subcommand)]
        command: CredentialCommands,
    },

    /// Session inspection
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// List agents
    List {
        /// Only agents of this workspace
        #[arg(short, long)]
        workspace: Option<String>,
    },

    /// Show agent details
    Show { id: String },

    /// Create new agent
    Create(CreateAgentArgs),

    /// Update an agent
    Update(UpdateAgentArgs),

    /// Delete an agent with its credentials and sessions
    Delete { id: String },

    /// Allow the agent to start sessions
    Enable { id: String },

    /// Stop the agent from starting or continuing sessions
    Disable { id: String },
}

#[derive(Args)]
pub struct ScopeArgs {
    /// Notebooks the agent may touch, comma separated ("*" for all)
    #[arg(long, value_delimiter = ',')]
    pub notebooks: Option<Vec<String>>,

    /// Folder patterns, comma separated ("*" for all)
    #[arg(long, value_delimiter = ',')]
    pub folders: Option<Vec<String>>,

    /// File types, comma separated ("*" for all)
    #[arg(long, value_delimiter = ',')]
    pub file_types: Option<Vec<String>>,
}

#[derive(Args)]
pub struct CreateAgentArgs {
    #[arg(short, long)]
    pub name: String,

    #[arg(short, long)]
    pub provider: String,

    #[arg(short, long)]
    pub model: String,

    #[arg(short, long, default_value = "default")]
    pub workspace: String,

    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Disable reading
    #[arg(long)]
    pub no_read: bool,

    #[arg(long)]
    pub can_write: bool,

    #[arg(long)]
    pub can_create: bool,

    #[arg(long)]
    pub can_delete: bool,

    #[arg(long)]
    pub max_requests_per_hour: Option<u32>,

    #[arg(long)]
    pub max_tokens_per_request: Option<u32>,

    /// Custom system prompt
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(Args)]
pub struct UpdateAgentArgs {
    pub id: String,

    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(short, long)]
    pub provider: Option<String>,

    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[arg(long)]
    pub can_read: Option<bool>,

    #[arg(long)]
    pub can_write: Option<bool>,

    #[arg(long)]
    pub can_create: Option<bool>,

    #[arg(long)]
    pub can_delete: Option<bool>,

    #[arg(long)]
    pub max_requests_per_hour: Option<u32>,

    #[arg(long)]
    pub max_tokens_per_request: Option<u32>,

    /// Replace the custom system prompt
    #[arg(long, conflicts_with = "clear_prompt")]
    pub prompt: Option<String>,

    /// Go back to the generated system prompt
    #[arg(long)]
    pub clear_prompt: bool,
}

#[derive(Subcommand)]
pub enum CredentialCommands {
    /// List credential keys (values are never shown)
    List { agent_id: String },

    /// Store a credential; reads the value from stdin when omitted
    Set {
        agent_id: String,
        key: String,
        value: Option<String>,
    },

    /// Delete a credential
    Delete { agent_id: String, key: String },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions, newest first
    List {
        /// Only sessions of this agent
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// Show a session
    Show { id: String },

    /// Cancel a session
    Cancel { id: String },

    /// Show the action log of a session
    Logs { id: String },
}
