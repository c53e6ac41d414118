//! Prompt builder (C6).
//!
//! Pure function of `(Agent, task_text, optional context)`; no provider-specific
//! formatting lives here — that is each [`crate::provider::Provider`]
//! implementation's job.

use std::collections::BTreeMap;

use crate::catalog::Agent;

/// Literal marker instructing the model to emit when it wants a shell tool run
/// (spec §4.2, §4.5).
pub const EXECUTE_TOOL_MARKER: &str = "EXECUTE_TOOL:";

/// The system + user prompt pair handed to a [`crate::provider::Provider`].
#[derive(Debug, Clone)]
pub struct PromptPair {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Assemble the system and user prompts for one task.
pub fn build_prompts(agent: &Agent, task_text: &str, context: Option<&BTreeMap<String, String>>) -> PromptPair {
    let mut system_prompt = format!(
        "You are {}, a {} in the {} guild.\n",
        agent.id, agent.title, agent.guild
    );
    if !agent.responsibilities.is_empty() {
        system_prompt.push_str("Your responsibilities:\n");
        for r in &agent.responsibilities {
            system_prompt.push_str(&format!("- {}\n", r));
        }
    }
    system_prompt.push_str(&format!(
        "If completing this task requires running a shell tool, include the literal marker \"{}\" in your response.\n",
        EXECUTE_TOOL_MARKER
    ));

    let mut user_prompt = task_text.to_string();
    if let Some(ctx) = context {
        if !ctx.is_empty() {
            user_prompt.push_str("\n\n");
            for (k, v) in ctx {
                user_prompt.push_str(&format!("{}: {}\n", k, v));
            }
        }
    }

    PromptPair {
        system_prompt,
        user_prompt,
    }
}
