use notewarden_ai::Capability;

use crate::models::{Agent, Scope};

fn describe(list: &[String]) -> String {
    if Scope::is_unrestricted(list) {
        "any".to_string()
    } else if list.is_empty() {
        "none".to_string()
    } else {
        list.join(", ")
    }
}

/// System prompt for a session turn: the agent's custom prompt if set,
/// otherwise one generated from its capabilities and scope.
pub fn build_system_prompt(agent: &Agent, notebook: Option<&str>) -> String {
    if let Some(custom) = agent
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        return custom.to_string();
    }

    let mut sections = Vec::new();

    let mut intro = format!(
        "You are {}, an assistant working on the files of a notes workspace.",
        agent.name
    );
    if let Some(description) = agent.description.as_deref().filter(|d| !d.is_empty()) {
        intro.push('\n');
        intro.push_str(description);
    }
    sections.push(intro);

    let (granted, withheld): (Vec<Capability>, Vec<Capability>) = Capability::ALL
        .into_iter()
        .partition(|cap| agent.capabilities.allows(*cap));
    let names = |caps: &[Capability]| {
        caps.iter()
            .map(Capability::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut permissions = format!(
        "## Permissions\n\nYou may: {}.",
        if granted.is_empty() {
            "nothing".to_string()
        } else {
            names(&granted)
        }
    );
    if !withheld.is_empty() {
        permissions.push_str(&format!(" You may not: {}.", names(&withheld)));
    }
    sections.push(permissions);

    let scope = &agent.scope;
    sections.push(format!(
        "## Scope\n\n- Notebooks: {}\n- Folders: {}\n- File types: {}",
        describe(&scope.notebooks),
        describe(&scope.folders),
        describe(&scope.file_types)
    ));

    if let Some(notebook) = notebook {
        sections.push(format!(
            "The current notebook is {notebook}. Tool calls use it unless they name another."
        ));
    }

    sections.push(
        "Every file operation is checked against these limits. A denied operation returns an \
         error; do not retry it. Use paths relative to the workspace root."
            .to_string(),
    );

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capabilities, NewAgent};

    #[test]
    fn test_generated_prompt_lists_scope_and_permissions() {
        let agent = NewAgent::new("ws", "Scribe", "mock", "m")
            .with_capabilities(Capabilities {
                can_read: true,
                can_create: true,
                ..Capabilities::default()
            })
            .with_scope(Scope::unrestricted().with_folders(["notes/*"]))
            .into_agent();

        let prompt = build_system_prompt(&agent, Some("work"));
        assert!(prompt.contains("You are Scribe"));
        assert!(prompt.contains("You may: read, create."));
        assert!(prompt.contains("You may not: write, delete."));
        assert!(prompt.contains("- Folders: notes/*"));
        assert!(prompt.contains("- Notebooks: any"));
        assert!(prompt.contains("current notebook is work"));
    }

    #[test]
    fn test_custom_prompt_wins() {
        let agent = NewAgent::new("ws", "Scribe", "mock", "m")
            .with_system_prompt("Only summarize.")
            .into_agent();
        assert_eq!(build_system_prompt(&agent, None), "Only summarize.");
    }
}
