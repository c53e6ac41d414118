//! Orchestration DSL parser (C9).
//!
//! Parses `Plan := Sequence`, `Sequence := Parallel (THEN Parallel)*`,
//! `Parallel := Atom (AND Atom)*`, `Atom := [agent_id ":"] task_text [Condition]`
//! into a layered DAG: every step in parallel-group `k` depends on every step
//! in group `k-1` (spec §4.6).

use uuid::Uuid;

use crate::error::ParseError;
use crate::orchestration::types::{Condition, OrchestrationPlan, OrchestrationStep, PlanMetadata, PlanStatus};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `text` on every standalone occurrence of `keyword` outside double
/// quotes, honoring word boundaries so e.g. `AND` inside `brand` is not a
/// separator.
fn split_on_keyword(text: &str, keyword: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let kchars: Vec<char> = keyword.chars().collect();
    let klen = kchars.len();
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    let mut in_quotes = false;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }
        if !in_quotes && i + klen <= chars.len() && chars[i..i + klen] == kchars[..] {
            let before_ok = i == 0 || !is_word_char(chars[i - 1]);
            let after_idx = i + klen;
            let after_ok = after_idx == chars.len() || !is_word_char(chars[after_idx]);
            if before_ok && after_ok {
                parts.push(chars[start..i].iter().collect::<String>());
                start = after_idx;
                i = after_idx;
                continue;
            }
        }
        i += 1;
    }
    parts.push(chars[start..].iter().collect::<String>());
    parts
}

fn find_word_boundary_suffix(text: &str, keyword: &str) -> Option<usize> {
    if !text.ends_with(keyword) {
        return None;
    }
    let pos = text.len() - keyword.len();
    if pos == 0 {
        return Some(pos);
    }
    match text[..pos].chars().last() {
        Some(c) if is_word_char(c) => None,
        _ => Some(pos),
    }
}

/// Strip a trailing `IF_SUCCESS` / `IF_FAILURE` / `IF_CONTAINS("...")` suffix
/// from an atom's text, if present.
fn extract_condition(text: &str) -> (String, Option<Condition>) {
    let trimmed = text.trim();

    if let Some(pos) = find_word_boundary_suffix(trimmed, "IF_SUCCESS") {
        return (trimmed[..pos].trim_end().to_string(), Some(Condition::IfSuccess));
    }
    if let Some(pos) = find_word_boundary_suffix(trimmed, "IF_FAILURE") {
        return (trimmed[..pos].trim_end().to_string(), Some(Condition::IfFailure));
    }
    if let Some(rest) = trimmed.strip_suffix(')') {
        const MARKER: &str = "IF_CONTAINS(\"";
        if let Some(idx) = rest.rfind(MARKER) {
            let before_ok = idx == 0
                || !is_word_char(rest[..idx].chars().last().expect("idx > 0 implies a preceding char"));
            if before_ok {
                let inner = &rest[idx + MARKER.len()..];
                if let Some(quote_end) = inner.rfind('"') {
                    let value = inner[..quote_end].to_string();
                    let task = trimmed[..idx].trim_end().to_string();
                    return (task, Some(Condition::IfContains(value)));
                }
            }
        }
    }

    (trimmed.to_string(), None)
}

/// Strip a leading `agent_id:` prefix, if `agent_id` is a bare identifier
/// (no internal whitespace).
fn extract_agent_prefix(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim_start();
    if let Some(colon_idx) = trimmed.find(':') {
        let candidate = &trimmed[..colon_idx];
        if !candidate.is_empty() && candidate.chars().all(is_word_char) {
            let rest = trimmed[colon_idx + 1..].trim_start();
            return (Some(candidate.to_string()), rest.to_string());
        }
    }
    (None, trimmed.to_string())
}

/// Parse `raw` into a pending [`OrchestrationPlan`]. `default_agent_id` is
/// used for any atom lacking an explicit `agent_id:` prefix.
pub fn parse(raw: &str, default_agent_id: &str) -> Result<OrchestrationPlan, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError("orchestration text must not be empty".into()));
    }

    let then_groups = split_on_keyword(trimmed, "THEN");
    let mut groups: Vec<Vec<OrchestrationStep>> = Vec::new();

    for (gi, group_text) in then_groups.iter().enumerate() {
        let group_text = group_text.trim();
        if group_text.is_empty() {
            return Err(ParseError("orchestration text contains an empty sequence group (input may consist only of keywords)".into()));
        }

        let and_atoms = split_on_keyword(group_text, "AND");
        let mut group_steps = Vec::new();

        for atom_text in &and_atoms {
            let atom_text = atom_text.trim();
            if atom_text.is_empty() {
                return Err(ParseError("orchestration text contains an empty parallel atom".into()));
            }

            let (agent_id, rest) = extract_agent_prefix(atom_text);
            let (task_text, condition) = extract_condition(&rest);
            let task_text = task_text.trim().to_string();
            if task_text.is_empty() {
                return Err(ParseError(format!(
                    "atom '{}' has no task text after removing agent id and condition",
                    atom_text
                )));
            }

            let dependencies: Vec<Uuid> = if gi == 0 {
                Vec::new()
            } else {
                groups[gi - 1].iter().map(|s| s.id).collect()
            };

            group_steps.push(OrchestrationStep::new(
                agent_id.unwrap_or_else(|| default_agent_id.to_string()),
                task_text,
                dependencies,
                condition,
            ));
        }

        groups.push(group_steps);
    }

    let parallel_batches = groups.len();
    let steps: Vec<OrchestrationStep> = groups.into_iter().flatten().collect();

    Ok(OrchestrationPlan {
        id: Uuid::new_v4(),
        raw_text: raw.to_string(),
        steps,
        status: PlanStatus::Pending,
        metadata: PlanMetadata {
            parallel_batches,
            estimated_duration_label: format!("{} batch(es)", parallel_batches),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_input() {
        assert!(parse("", "default").is_err());
        assert!(parse("   ", "default").is_err());
    }

    #[test]
    fn rejects_keyword_only_input() {
        assert!(parse("THEN", "default").is_err());
        assert!(parse("AND", "default").is_err());
    }

    #[test]
    fn single_atom_has_no_dependencies() {
        let plan = parse("build the app", "default").unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.steps[0].dependencies.is_empty());
        assert_eq!(plan.metadata.parallel_batches, 1);
    }

    #[test]
    fn sequential_plan_has_full_cross_bar_dependencies() {
        let plan = parse("build THEN test", "websmith").unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.metadata.parallel_batches, 2);
        assert!(plan.steps[1].dependencies.contains(&plan.steps[0].id));
        assert!(plan.steps[0].dependencies.is_empty());
    }

    #[test]
    fn parallel_mixed_plan_matches_scenario_two() {
        let plan = parse("build THEN lint AND test THEN deploy IF_SUCCESS", "websmith").unwrap();
        assert_eq!(plan.steps.len(), 4);
        assert_eq!(plan.metadata.parallel_batches, 3);

        let build = &plan.steps[0];
        let lint = &plan.steps[1];
        let test = &plan.steps[2];
        let deploy = &plan.steps[3];

        assert!(lint.dependencies.contains(&build.id));
        assert!(test.dependencies.contains(&build.id));
        assert!(deploy.dependencies.contains(&lint.id));
        assert!(deploy.dependencies.contains(&test.id));
        assert_eq!(deploy.condition, Some(Condition::IfSuccess));
    }

    #[test]
    fn conditional_rollback_matches_scenario_three() {
        let plan = parse("test THEN rollback IF_FAILURE", "websmith").unwrap();
        assert_eq!(plan.steps[1].condition, Some(Condition::IfFailure));
    }

    #[test]
    fn if_contains_condition_extracts_quoted_value() {
        let plan = parse(r#"deploy IF_CONTAINS("success")"#, "websmith").unwrap();
        assert_eq!(plan.steps[0].condition, Some(Condition::IfContains("success".to_string())));
        assert_eq!(plan.steps[0].task_text, "deploy");
    }

    #[test]
    fn multi_agent_syntax_matches_scenario_six() {
        let plan = parse("websmith: build THEN crafter: review", "default").unwrap();
        assert_eq!(plan.steps[0].agent_id, "websmith");
        assert_eq!(plan.steps[1].agent_id, "crafter");
        assert!(plan.steps[1].dependencies.contains(&plan.steps[0].id));
    }

    #[test]
    fn parsing_is_deterministic_in_shape() {
        let a = parse("build THEN lint AND test", "default").unwrap();
        let b = parse("build THEN lint AND test", "default").unwrap();
        assert_eq!(a.steps.len(), b.steps.len());
        assert_eq!(a.metadata.parallel_batches, b.metadata.parallel_batches);
        for (sa, sb) in a.steps.iter().zip(b.steps.iter()) {
            assert_eq!(sa.agent_id, sb.agent_id);
            assert_eq!(sa.task_text, sb.task_text);
            assert_eq!(sa.condition, sb.condition);
        }
    }
}
