//! Agent catalog loader (C4).
//!
//! Loads the declarative TOML document describing guilds, their toolbelts, and
//! the agents that belong to them, validates the cross-references the spec
//! requires, and indexes everything by id for O(1) lookup at request time.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudguild::catalog::AgentCatalog;
//!
//! let catalog = AgentCatalog::load_from_path("agents.toml")?;
//! let agent = catalog.get_agent("websmith").expect("agent present");
//! println!("{} belongs to {}", agent.title, agent.guild);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Known provider identifiers and their aliases (spec §4.1): `google`→`gemini`,
/// `claude`→`anthropic`, `local`→`local`.
pub fn resolve_provider_alias(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    let canonical = match lower.as_str() {
        "google" => "gemini",
        "claude" => "anthropic",
        other => other,
    };
    const KNOWN: &[&str] = &["openai", "anthropic", "gemini", "grok", "local"];
    if KNOWN.contains(&canonical) {
        Some(canonical.to_string())
    } else {
        None
    }
}

/// A substring-match rule mapping a task phrase to a tool id (spec Trigger rule).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionRule {
    pub trigger: String,
    /// `None` encodes the DSL's `tool: null` ("no tool for this trigger").
    pub tool: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Ordered provider preferences plus the `prefers_local` flag (spec §3 Agent.brain).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Brain {
    #[serde(default)]
    pub local: Vec<String>,
    #[serde(default)]
    pub routers: Vec<String>,
    #[serde(default)]
    pub prefers_local: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AgentTools {
    #[serde(default)]
    pub owned: Vec<String>,
    #[serde(default)]
    pub selection_rules: Vec<SelectionRule>,
}

/// A named LLM persona with its own toolbelt and model preferences (spec §3 Agent).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Agent {
    pub id: String,
    pub title: String,
    /// Filled in by the loader from the enclosing `[[guilds]]` table; not read
    /// from the member's own TOML row (the guild is implicit, per spec §6).
    #[serde(skip)]
    pub guild: String,
    #[serde(default)]
    pub brain: Brain,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub kpis: Vec<String>,
    #[serde(default)]
    pub tools: AgentTools,
}

impl Agent {
    pub fn owned_tools(&self) -> &[String] {
        &self.tools.owned
    }

    pub fn owns_tool(&self, tool_id: &str) -> bool {
        self.tools.owned.iter().any(|t| t == tool_id)
    }
}

/// One shell command a guild may invoke (spec §3 Tool).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub owner: String,
    pub command: String,
}

/// A named grouping of agents that share a toolbelt (spec §3 Guild).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Guild {
    pub name: String,
    #[serde(default)]
    pub charter: String,
    #[serde(default)]
    pub verbosity: Option<String>,
    #[serde(default)]
    pub toolbelt: Vec<Tool>,
    #[serde(default)]
    pub members: Vec<Agent>,
}

/// Raw deserialization shape of the configuration document (spec §6).
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CatalogDocument {
    #[serde(default)]
    guilds: Vec<Guild>,
}

/// Warnings collected during validation that do not block startup (e.g. an
/// unrecognized provider identifier in `brain.routers`).
#[derive(Debug, Clone)]
pub struct CatalogWarning(pub String);

/// The loaded, validated, and indexed agent catalog. Immutable after construction.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents_by_id: HashMap<String, Agent>,
    guilds: Vec<Guild>,
    pub warnings: Vec<CatalogWarning>,
}

impl AgentCatalog {
    /// Try `explicit_path`, then `CLOUDGUILD_CONFIG_PATH`, then `./agents.toml`,
    /// then `./config/agents.toml`, in that order.
    pub fn load(explicit_path: Option<&str>) -> Result<Self, ConfigurationError> {
        let candidates: Vec<String> = explicit_path
            .map(|s| s.to_string())
            .into_iter()
            .chain(std::env::var("CLOUDGUILD_CONFIG_PATH").ok())
            .chain(["agents.toml".to_string(), "config/agents.toml".to_string()])
            .collect();

        for path in &candidates {
            if Path::new(path).exists() {
                return Self::load_from_path(path);
            }
        }
        Err(ConfigurationError(format!(
            "no configuration file found among: {}",
            candidates.join(", ")
        )))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigurationError> {
        let doc: CatalogDocument = toml::from_str(content)?;
        Self::from_document(doc)
    }

    fn from_document(mut doc: CatalogDocument) -> Result<Self, ConfigurationError> {
        let mut agents_by_id: HashMap<String, Agent> = HashMap::new();
        let mut warnings = Vec::new();

        for guild in &mut doc.guilds {
            let tool_ids: HashSet<&str> = guild.toolbelt.iter().map(|t| t.id.as_str()).collect();
            let agent_ids_in_guild: HashSet<&str> =
                guild.members.iter().map(|a| a.id.as_str()).collect();

            for tool in &guild.toolbelt {
                if !agent_ids_in_guild.contains(tool.owner.as_str()) {
                    return Err(ConfigurationError(format!(
                        "tool '{}' in guild '{}' has unknown owner '{}'",
                        tool.id, guild.name, tool.owner
                    )));
                }
            }

            for agent in &mut guild.members {
                agent.guild = guild.name.clone();

                if agents_by_id.contains_key(&agent.id) {
                    return Err(ConfigurationError(format!(
                        "duplicate agent id '{}'",
                        agent.id
                    )));
                }

                for tool_id in &agent.tools.owned {
                    if !tool_ids.contains(tool_id.as_str()) {
                        return Err(ConfigurationError(format!(
                            "agent '{}' owns unknown tool '{}' in guild '{}'",
                            agent.id, tool_id, guild.name
                        )));
                    }
                }

                for rule in &agent.tools.selection_rules {
                    if let Some(tool_id) = &rule.tool {
                        if !tool_ids.contains(tool_id.as_str()) {
                            return Err(ConfigurationError(format!(
                                "agent '{}' selection rule references unknown tool '{}'",
                                agent.id, tool_id
                            )));
                        }
                        if !agent.owns_tool(tool_id) {
                            return Err(ConfigurationError(format!(
                                "agent '{}' selection rule references tool '{}' it does not own",
                                agent.id, tool_id
                            )));
                        }
                    }
                }

                for provider in agent.brain.routers.iter().chain(agent.brain.local.iter()) {
                    if resolve_provider_alias(provider).is_none() {
                        warnings.push(CatalogWarning(format!(
                            "agent '{}' references unknown provider identifier '{}'",
                            agent.id, provider
                        )));
                    }
                }

                agents_by_id.insert(agent.id.clone(), agent.clone());
            }
        }

        Ok(Self {
            agents_by_id,
            guilds: doc.guilds,
            warnings,
        })
    }

    pub fn get_agent(&self, id: &str) -> Option<&Agent> {
        self.agents_by_id.get(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents_by_id.values()
    }

    pub fn guilds(&self) -> &[Guild] {
        &self.guilds
    }

    pub fn find_tool(&self, guild_name: &str, tool_id: &str) -> Option<&Tool> {
        self.guilds
            .iter()
            .find(|g| g.name == guild_name)
            .and_then(|g| g.toolbelt.iter().find(|t| t.id == tool_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[guilds]]
name = "web"
charter = "ship the product"

[[guilds.toolbelt]]
id = "build"
name = "Build"
summary = "runs the build"
owner = "websmith"
command = "echo build"

[[guilds.members]]
id = "websmith"
title = "Web Smith"
responsibilities = ["ship code"]
kpis = ["velocity"]

[guilds.members.brain]
routers = ["openai"]
prefers_local = false

[guilds.members.tools]
owned = ["build"]

[[guilds.members.tools.selection_rules]]
trigger = "build"
tool = "build"
"#;

    #[test]
    fn loads_valid_catalog() {
        let catalog = AgentCatalog::load_from_str(SAMPLE).unwrap();
        let agent = catalog.get_agent("websmith").unwrap();
        assert_eq!(agent.guild, "web");
        assert!(agent.owns_tool("build"));
        assert!(catalog.warnings.is_empty());
    }

    #[test]
    fn rejects_duplicate_agent_ids() {
        let doc = format!("{SAMPLE}\n{SAMPLE}");
        assert!(AgentCatalog::load_from_str(&doc).is_err());
    }

    #[test]
    fn rejects_unowned_selection_rule_tool() {
        let bad = SAMPLE.replace(
            r#"tool = "build""#,
            r#"tool = "deploy""#,
        );
        assert!(AgentCatalog::load_from_str(&bad).is_err());
    }

    #[test]
    fn warns_on_unknown_provider_identifier() {
        let doc = SAMPLE.replace(r#"routers = ["openai"]"#, r#"routers = ["cohere"]"#);
        let catalog = AgentCatalog::load_from_str(&doc).unwrap();
        assert_eq!(catalog.warnings.len(), 1);
    }

    #[test]
    fn resolves_provider_aliases() {
        assert_eq!(resolve_provider_alias("google").as_deref(), Some("gemini"));
        assert_eq!(resolve_provider_alias("claude").as_deref(), Some("anthropic"));
        assert_eq!(resolve_provider_alias("OpenAI").as_deref(), Some("openai"));
        assert_eq!(resolve_provider_alias("cohere"), None);
    }

    #[test]
    fn load_from_path_reads_an_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = AgentCatalog::load_from_path(&path).unwrap();
        assert!(catalog.get_agent("websmith").is_some());
    }

    #[test]
    fn load_falls_back_through_the_candidate_chain() {
        let missing = AgentCatalog::load(Some("/nonexistent/path/agents.toml"));
        assert!(missing.is_err());
    }
}
