//! Agent definition: model binding, capabilities and scope.

use notewarden_ai::Capability;
use notewarden_storage::time_utils;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// The single pattern that leaves a scope dimension unrestricted.
pub const WILDCARD: &str = "*";

const DEFAULT_MAX_REQUESTS_PER_HOUR: u32 = 60;
const DEFAULT_MAX_TOKENS_PER_REQUEST: u32 = 16_000;

/// Where an agent may act. Each dimension is either exactly `["*"]` or a list
/// of identifiers and glob patterns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scope {
    pub notebooks: Vec<String>,
    pub folders: Vec<String>,
    pub file_types: Vec<String>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::unrestricted()
    }
}

fn wildcard() -> Vec<String> {
    vec![WILDCARD.to_string()]
}

impl Scope {
    pub fn unrestricted() -> Self {
        Self {
            notebooks: wildcard(),
            folders: wildcard(),
            file_types: wildcard(),
        }
    }

    pub fn with_notebooks<I, S>(mut self, notebooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notebooks = notebooks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folders = folders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_file_types<I, S>(mut self, file_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types = file_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_unrestricted(list: &[String]) -> bool {
        list.len() == 1 && list[0].trim() == WILDCARD
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (field, list) in [
            ("scope.notebooks", &self.notebooks),
            ("scope.folders", &self.folders),
            ("scope.file_types", &self.file_types),
        ] {
            if list.iter().any(|p| p.trim().is_empty()) {
                errors.push(ValidationError::new(field, "patterns must not be blank"));
            }
            if list.len() > 1 && list.iter().any(|p| p.trim() == WILDCARD) {
                errors.push(ValidationError::new(
                    field,
                    "\"*\" must be the only entry when used",
                ));
            }
        }
        errors
    }
}

/// The four capability flags. Reading is on unless stated otherwise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    #[serde(default = "default_true")]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl Capabilities {
    pub fn read_only() -> Self {
        Self {
            can_read: true,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            can_read: true,
            can_write: true,
            can_create: true,
            can_delete: true,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.can_read,
            Capability::Write => self.can_write,
            Capability::Create => self.can_create,
            Capability::Delete => self.can_delete,
        }
    }

    pub fn set(&mut self, capability: Capability, enabled: bool) {
        match capability {
            Capability::Read => self.can_read = enabled,
            Capability::Write => self.can_write = enabled,
            Capability::Create => self.can_create = enabled,
            Capability::Delete => self.can_delete = enabled,
        }
    }

    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.allows(*cap))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub provider: String,
    pub model: String,
    pub scope: Scope,
    #[serde(flatten)]
    pub capabilities: Capabilities,
    pub max_requests_per_hour: u32,
    pub max_tokens_per_request: u32,
    pub is_active: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub workspace_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(flatten)]
    pub capabilities: Capabilities,
    #[serde(default = "default_max_requests")]
    pub max_requests_per_hour: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_request: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS_PER_HOUR
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS_PER_REQUEST
}

fn default_true() -> bool {
    true
}

impl NewAgent {
    pub fn new(
        workspace_id: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            name: name.into(),
            description: None,
            provider: provider.into(),
            model: model.into(),
            scope: Scope::unrestricted(),
            capabilities: Capabilities::read_only(),
            max_requests_per_hour: DEFAULT_MAX_REQUESTS_PER_HOUR,
            max_tokens_per_request: DEFAULT_MAX_TOKENS_PER_REQUEST,
            is_active: true,
            system_prompt: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_limits(mut self, max_requests_per_hour: u32, max_tokens_per_request: u32) -> Self {
        self.max_requests_per_hour = max_requests_per_hour;
        self.max_tokens_per_request = max_tokens_per_request;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn into_agent(self) -> Agent {
        let now = time_utils::now_ms();
        Agent {
            id: Uuid::new_v4().to_string(),
            workspace_id: self.workspace_id,
            name: self.name,
            description: self.description,
            provider: self.provider,
            model: self.model,
            scope: self.scope,
            capabilities: self.capabilities,
            max_requests_per_hour: self.max_requests_per_hour,
            max_tokens_per_request: self.max_tokens_per_request,
            is_active: self.is_active,
            system_prompt: self.system_prompt,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub scope: Option<Scope>,
    pub capabilities: Option<Capabilities>,
    pub max_requests_per_hour: Option<u32>,
    pub max_tokens_per_request: Option<u32>,
    /// `Some(None)` falls back to the generated prompt.
    pub system_prompt: Option<Option<String>>,
}

impl AgentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.provider.is_none()
            && self.model.is_none()
            && self.scope.is_none()
            && self.capabilities.is_none()
            && self.max_requests_per_hour.is_none()
            && self.max_tokens_per_request.is_none()
            && self.system_prompt.is_none()
    }
}

impl Agent {
    pub fn apply(&mut self, patch: AgentPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(provider) = patch.provider {
            self.provider = provider;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(scope) = patch.scope {
            self.scope = scope;
        }
        if let Some(capabilities) = patch.capabilities {
            self.capabilities = capabilities;
        }
        if let Some(limit) = patch.max_requests_per_hour {
            self.max_requests_per_hour = limit;
        }
        if let Some(limit) = patch.max_tokens_per_request {
            self.max_tokens_per_request = limit;
        }
        if let Some(prompt) = patch.system_prompt {
            self.system_prompt = prompt;
        }
        self.updated_at = time_utils::now_ms();
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("workspace_id", &self.workspace_id),
            ("name", &self.name),
            ("provider", &self.provider),
            ("model", &self.model),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::new(field, "must not be empty"));
            }
        }
        if self.max_requests_per_hour == 0 {
            errors.push(ValidationError::new(
                "max_requests_per_hour",
                "must be at least 1",
            ));
        }
        if self.max_tokens_per_request == 0 {
            errors.push(ValidationError::new(
                "max_tokens_per_request",
                "must be at least 1",
            ));
        }
        errors.extend(self.scope.validate());
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_rejects_mixed_wildcard() {
        let scope = Scope::unrestricted().with_folders(["*", "notes"]);
        let errors = scope.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "scope.folders");
    }

    #[test]
    fn test_zero_limits_rejected() {
        let agent = NewAgent::new("ws", "helper", "mock", "m")
            .with_limits(0, 0)
            .into_agent();
        let fields: Vec<_> = agent.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["max_requests_per_hour", "max_tokens_per_request"]
        );
    }

    #[test]
    fn test_capabilities_flatten_into_agent_json() {
        let agent = NewAgent::new("ws", "helper", "mock", "m").into_agent();
        let value = serde_json::to_value(&agent).unwrap();
        assert_eq!(value["can_read"], true);
        assert_eq!(value["can_delete"], false);
        let back: Agent = serde_json::from_value(value).unwrap();
        assert_eq!(back, agent);
    }

    #[test]
    fn test_new_agent_defaults_from_json() {
        let input: NewAgent = serde_json::from_str(
            r#"{"workspace_id":"ws","name":"n","provider":"p","model":"m"}"#,
        )
        .unwrap();
        assert!(input.capabilities.can_read);
        assert!(!input.capabilities.can_write);
        assert_eq!(input.scope, Scope::unrestricted());
        assert!(input.is_active);
    }

    #[test]
    fn test_patch_clears_prompt() {
        let mut agent = NewAgent::new("ws", "helper", "mock", "m")
            .with_system_prompt("custom")
            .into_agent();
        agent.apply(AgentPatch {
            system_prompt: Some(None),
            ..AgentPatch::default()
        });
        assert!(agent.system_prompt.is_none());
    }

    #[test]
    fn test_enabled_capabilities() {
        let caps = Capabilities {
            can_read: true,
            can_delete: true,
            ..Capabilities::default()
        };
        assert_eq!(caps.enabled(), vec![Capability::Read, Capability::Delete]);
    }
}
