//! Tool selector (C5).
//!
//! Maps `(agent, task text)` to a tool command via the agent's ordered
//! trigger rules (spec §4.4).

use crate::catalog::Agent;
use crate::error::ToolError;

/// The fixed set of action verbs that trigger the executor's fallback
/// heuristic (spec §4.5 step 5) when the model did not emit the
/// `EXECUTE_TOOL:` marker.
pub const ACTION_VERBS: &[&str] = &["start", "run", "build", "test", "deploy", "execute"];

pub fn task_contains_action_verb(task_text: &str) -> bool {
    let lower = task_text.to_lowercase();
    ACTION_VERBS.iter().any(|verb| lower.contains(verb))
}

/// A tool selected for execution: its id and the literal command string.
#[derive(Debug, Clone)]
pub struct SelectedTool {
    pub tool_id: String,
    pub command: String,
}

/// Scan `agent`'s selection rules in order; the first rule whose trigger is a
/// case-insensitive substring of `task_text` wins. Returns `Ok(None)` for "no
/// tool" (either no rule matched, or the matching rule's tool is `null`).
/// Returns `Err(ToolError::PermissionDenied)` if the matched tool id is not in
/// `agent.owned_tools` — callers treat that the same as "no tool" (spec §4.4).
pub fn select_tool(
    agent: &Agent,
    task_text: &str,
    command_lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<SelectedTool>, ToolError> {
    let lower_task = task_text.to_lowercase();

    for rule in &agent.tools.selection_rules {
        if lower_task.contains(&rule.trigger.to_lowercase()) {
            let Some(tool_id) = &rule.tool else {
                return Ok(None);
            };

            if !agent.owns_tool(tool_id) {
                return Err(ToolError::PermissionDenied(format!(
                    "agent '{}' does not own tool '{}'",
                    agent.id, tool_id
                )));
            }

            let command = command_lookup(tool_id).unwrap_or_default();
            return Ok(Some(SelectedTool {
                tool_id: tool_id.clone(),
                command,
            }));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AgentTools, Brain, SelectionRule};

    fn agent_with_rules(rules: Vec<SelectionRule>, owned: Vec<&str>) -> Agent {
        Agent {
            id: "a".into(),
            title: "A".into(),
            guild: "g".into(),
            brain: Brain::default(),
            responsibilities: vec![],
            kpis: vec![],
            tools: AgentTools {
                owned: owned.into_iter().map(String::from).collect(),
                selection_rules: rules,
            },
        }
    }

    #[test]
    fn selects_first_matching_trigger() {
        let agent = agent_with_rules(
            vec![SelectionRule {
                trigger: "build".into(),
                tool: Some("build_tool".into()),
                note: None,
            }],
            vec!["build_tool"],
        );
        let result = select_tool(&agent, "please build the app", |id| Some(format!("cmd {id}"))).unwrap();
        assert_eq!(result.unwrap().tool_id, "build_tool");
    }

    #[test]
    fn null_tool_means_no_tool() {
        let agent = agent_with_rules(
            vec![SelectionRule {
                trigger: "chat".into(),
                tool: None,
                note: None,
            }],
            vec![],
        );
        let result = select_tool(&agent, "just chat", |_| None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn unowned_tool_is_permission_denied() {
        let agent = agent_with_rules(
            vec![SelectionRule {
                trigger: "deploy".into(),
                tool: Some("deploy_tool".into()),
                note: None,
            }],
            vec![],
        );
        let result = select_tool(&agent, "deploy now", |_| None);
        assert!(matches!(result, Err(ToolError::PermissionDenied(_))));
    }

    #[test]
    fn no_match_is_no_tool() {
        let agent = agent_with_rules(vec![], vec![]);
        assert!(select_tool(&agent, "anything", |_| None).unwrap().is_none());
    }

    #[test]
    fn detects_action_verbs() {
        assert!(task_contains_action_verb("please RUN the suite"));
        assert!(!task_contains_action_verb("say hello"));
    }
}
