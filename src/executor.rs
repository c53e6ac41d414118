//! Task executor (C8): runs one task end-to-end through prompt building,
//! provider dispatch, tool selection, and bookkeeping (spec §4.5).

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::audit::{fire_and_forget_audit, AuditEvent};
use crate::catalog::{Agent, AgentCatalog};
use crate::cost::{CostRecordInput, CostTracker};
use crate::error::RuntimeError;
use crate::history::{HistoryEntry, HistoryStore};
use crate::prompt::{build_prompts, EXECUTE_TOOL_MARKER};
use crate::provider::{select_provider, GenerateOptions, Provider, ProviderMap};
use crate::subprocess::execute_bounded;
use crate::tool_selector::{select_tool, task_contains_action_verb};

const DRY_RUN_SENTINEL: &str = "(dry-run)";

/// One task submission (spec §3 TaskRequest).
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub agent_id: String,
    pub task_text: String,
    pub context: Option<BTreeMap<String, String>>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolExecutionResult {
    pub tool_id: String,
    pub command: String,
    pub combined_output: String,
    pub exit_code: i32,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub agent_id: String,
    pub task_text: String,
    pub tool_execution_result: Option<ToolExecutionResult>,
    pub model_reasoning: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub succeeded: bool,
    pub kpis: HashMap<String, f64>,
}

/// Dependencies the executor needs, borrowed for the lifetime of one call.
/// Mirrors the fields a [`crate::runtime::Runtime`] owns; kept as a plain
/// struct of references so this module has no circular dependency on it.
pub struct ExecutorContext<'a> {
    pub catalog: &'a AgentCatalog,
    pub providers: &'a ProviderMap,
    pub history: &'a HistoryStore,
    pub cost_tracker: &'a CostTracker,
    pub audit_url: Option<String>,
}

/// Execute one task end-to-end (spec §4.5 steps 1-11). Never returns a Rust
/// `Err` for provider/tool failures — those are folded into
/// `TaskResponse.succeeded = false`; only an unknown agent id is a hard error.
pub async fn execute_task(ctx: &ExecutorContext<'_>, request: TaskRequest) -> Result<TaskResponse, RuntimeError> {
    let start = Instant::now();

    let agent = ctx
        .catalog
        .get_agent(&request.agent_id)
        .ok_or_else(|| RuntimeError::AgentNotFound(request.agent_id.clone()))?;

    fire_and_forget_audit(
        ctx.audit_url.clone(),
        AuditEvent::new(agent.id.clone(), "task.start", json!({"task": request.task_text})),
    );

    let prompts = build_prompts(agent, &request.task_text, request.context.as_ref());

    let provider = match select_provider(agent, ctx.providers) {
        Some(p) => p.clone(),
        None => {
            return Ok(finish_with_error(
                &request,
                start,
                format!("no provider available for agent '{}'", agent.id),
            ));
        }
    };

    let options = GenerateOptions {
        system_prompt: Some(prompts.system_prompt.clone()),
        ..Default::default()
    };

    let model_reasoning = match provider.generate(&prompts.user_prompt, &options).await {
        Ok(text) => text,
        Err(e) => return Ok(finish_with_error(&request, start, format!("{}", e))),
    };

    Ok(finish_after_generation(ctx, agent, &provider, &request, model_reasoning, start).await)
}

/// Same end-to-end flow as [`execute_task`], but generation goes through
/// `generate_stream` and every chunk is forwarded on `chunks` as it arrives
/// (spec §4.3 streaming contract, §4.9 WebSocket frames). The accumulated
/// chunk text equals what `execute_task` would have produced for the same
/// inputs (P8).
pub async fn execute_task_streaming(
    ctx: &ExecutorContext<'_>,
    request: TaskRequest,
    chunks: mpsc::Sender<String>,
) -> Result<TaskResponse, RuntimeError> {
    let start = Instant::now();

    let agent = ctx
        .catalog
        .get_agent(&request.agent_id)
        .ok_or_else(|| RuntimeError::AgentNotFound(request.agent_id.clone()))?;

    fire_and_forget_audit(
        ctx.audit_url.clone(),
        AuditEvent::new(agent.id.clone(), "task.start", json!({"task": request.task_text})),
    );

    let prompts = build_prompts(agent, &request.task_text, request.context.as_ref());

    let provider = match select_provider(agent, ctx.providers) {
        Some(p) => p.clone(),
        None => {
            return Ok(finish_with_error(
                &request,
                start,
                format!("no provider available for agent '{}'", agent.id),
            ));
        }
    };

    let options = GenerateOptions {
        system_prompt: Some(prompts.system_prompt.clone()),
        ..Default::default()
    };

    let mut stream = match provider.generate_stream(&prompts.user_prompt, &options).await {
        Ok(s) => s,
        Err(e) => return Ok(finish_with_error(&request, start, format!("{}", e))),
    };

    let mut model_reasoning = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(text) => {
                model_reasoning.push_str(&text);
                let _ = chunks.send(text).await;
            }
            Err(e) => return Ok(finish_with_error(&request, start, format!("{}", e))),
        }
    }

    Ok(finish_after_generation(ctx, agent, &provider, &request, model_reasoning, start).await)
}

/// Shared tail of both execution paths: tool-trigger heuristic, subprocess
/// dispatch, KPI computation, history append, cost recording, completion
/// audit (spec §4.5 steps 5-11).
async fn finish_after_generation(
    ctx: &ExecutorContext<'_>,
    agent: &Agent,
    provider: &Arc<dyn Provider>,
    request: &TaskRequest,
    model_reasoning: String,
    start: Instant,
) -> TaskResponse {
    let tool_needed = model_reasoning.contains(EXECUTE_TOOL_MARKER) || task_contains_action_verb(&request.task_text);

    let tool_execution_result = if tool_needed {
        let selection = select_tool(agent, &request.task_text, |tool_id| {
            ctx.catalog.find_tool(&agent.guild, tool_id).map(|t| t.command.clone())
        });

        match selection {
            Ok(Some(selected)) => {
                if request.dry_run {
                    Some(ToolExecutionResult {
                        tool_id: selected.tool_id,
                        command: selected.command,
                        combined_output: DRY_RUN_SENTINEL.to_string(),
                        exit_code: 0,
                        succeeded: true,
                    })
                } else {
                    fire_and_forget_audit(
                        ctx.audit_url.clone(),
                        AuditEvent::new(agent.id.clone(), "tool.invoke", json!({"tool": selected.tool_id})),
                    );
                    let outcome = execute_bounded(&selected.command).await;
                    Some(ToolExecutionResult {
                        tool_id: selected.tool_id,
                        command: selected.command,
                        combined_output: outcome.combined_output,
                        exit_code: outcome.exit_code,
                        succeeded: outcome.succeeded,
                    })
                }
            }
            Ok(None) => None,
            Err(_permission_denied) => None,
        }
    } else {
        None
    };

    let succeeded = tool_execution_result.as_ref().map(|t| t.succeeded).unwrap_or(true);
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut kpis: HashMap<String, f64> = HashMap::new();
    kpis.insert("duration_ms".to_string(), duration_ms as f64);
    kpis.insert("success".to_string(), if succeeded { 1.0 } else { 0.0 });
    kpis.insert("task_completion_time_s".to_string(), duration_ms as f64 / 1000.0);
    for name in &agent.kpis {
        kpis.entry(name.clone()).or_insert(0.0);
    }

    let response = TaskResponse {
        agent_id: agent.id.clone(),
        task_text: request.task_text.clone(),
        tool_execution_result,
        model_reasoning,
        timestamp: Utc::now(),
        duration_ms,
        succeeded,
        kpis: kpis.clone(),
    };

    ctx.history.append(HistoryEntry {
        id: uuid::Uuid::new_v4(),
        agent_id: agent.id.clone(),
        task_text: response.task_text.clone(),
        reasoning: response.model_reasoning.clone(),
        timestamp: response.timestamp,
        kpis,
        succeeded,
    });

    if let Some(usage) = provider.last_usage().await {
        ctx.cost_tracker.record(CostRecordInput {
            agent_id: agent.id.clone(),
            guild: agent.guild.clone(),
            provider: provider.id().to_string(),
            model: provider.model().to_string(),
            task_text: request.task_text.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            duration_ms,
            success: succeeded,
        });
    }

    fire_and_forget_audit(
        ctx.audit_url.clone(),
        AuditEvent::new(agent.id.clone(), "task.complete", json!({"succeeded": succeeded})),
    );

    response
}

fn finish_with_error(request: &TaskRequest, start: Instant, message: String) -> TaskResponse {
    let duration_ms = start.elapsed().as_millis() as u64;
    let mut kpis = HashMap::new();
    kpis.insert("duration_ms".to_string(), duration_ms as f64);
    kpis.insert("success".to_string(), 0.0);
    kpis.insert("task_completion_time_s".to_string(), duration_ms as f64 / 1000.0);

    TaskResponse {
        agent_id: request.agent_id.clone(),
        task_text: request.task_text.clone(),
        tool_execution_result: None,
        model_reasoning: format!("Error: {}", message),
        timestamp: Utc::now(),
        duration_ms,
        succeeded: false,
        kpis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AgentCatalog;
    use crate::error::ProviderError;
    use crate::provider::{ChunkStream, Provider};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubProvider;

    #[async_trait]
    impl Provider for StubProvider {
        fn id(&self) -> &str {
            "stub"
        }
        async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String, ProviderError> {
            Ok("all done, no tools needed".to_string())
        }
        async fn generate_stream(&self, _prompt: &str, _options: &GenerateOptions) -> Result<ChunkStream, ProviderError> {
            let chunks = vec!["Hel".to_string(), "lo ".to_string(), "world".to_string()];
            Ok(Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok))))
        }
        async fn health_check(&self) -> bool {
            true
        }
    }

    const CATALOG_TOML: &str = r#"
[[guilds]]
name = "web"
charter = "ship"

[[guilds.members]]
id = "websmith"
title = "Web Smith"

[guilds.members.brain]
routers = ["stub"]
"#;

    #[tokio::test]
    async fn unknown_agent_is_an_error() {
        let catalog = AgentCatalog::load_from_str(CATALOG_TOML).unwrap();
        let mut providers = ProviderMap::new();
        providers.insert("stub".to_string(), Arc::new(StubProvider) as Arc<dyn Provider>);
        let history = HistoryStore::new();
        let cost_tracker = CostTracker::new();
        let ctx = ExecutorContext {
            catalog: &catalog,
            providers: &providers,
            history: &history,
            cost_tracker: &cost_tracker,
            audit_url: None,
        };
        let result = execute_task(
            &ctx,
            TaskRequest {
                agent_id: "nobody".to_string(),
                task_text: "do something".to_string(),
                context: None,
                dry_run: false,
            },
        )
        .await;
        assert!(matches!(result, Err(RuntimeError::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn successful_task_is_recorded_in_history() {
        let catalog = AgentCatalog::load_from_str(CATALOG_TOML).unwrap();
        let mut providers = ProviderMap::new();
        providers.insert("stub".to_string(), Arc::new(StubProvider) as Arc<dyn Provider>);
        let history = HistoryStore::new();
        let cost_tracker = CostTracker::new();
        let ctx = ExecutorContext {
            catalog: &catalog,
            providers: &providers,
            history: &history,
            cost_tracker: &cost_tracker,
            audit_url: None,
        };
        let response = execute_task(
            &ctx,
            TaskRequest {
                agent_id: "websmith".to_string(),
                task_text: "say hello".to_string(),
                context: None,
                dry_run: false,
            },
        )
        .await
        .unwrap();

        assert!(response.succeeded);
        assert_eq!(history.recent("websmith", 10).len(), 1);
    }

    #[tokio::test]
    async fn streamed_chunks_concatenate_to_the_final_reasoning() {
        let catalog = AgentCatalog::load_from_str(CATALOG_TOML).unwrap();
        let mut providers = ProviderMap::new();
        providers.insert("stub".to_string(), Arc::new(StubProvider) as Arc<dyn Provider>);
        let history = HistoryStore::new();
        let cost_tracker = CostTracker::new();
        let ctx = ExecutorContext {
            catalog: &catalog,
            providers: &providers,
            history: &history,
            cost_tracker: &cost_tracker,
            audit_url: None,
        };

        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let response = execute_task_streaming(
            &ctx,
            TaskRequest {
                agent_id: "websmith".to_string(),
                task_text: "say hello".to_string(),
                context: None,
                dry_run: false,
            },
            tx,
        )
        .await
        .unwrap();

        let mut received = String::new();
        while let Some(chunk) = rx.recv().await {
            received.push_str(&chunk);
        }

        assert_eq!(received, "Hello world");
        assert_eq!(response.model_reasoning, "Hello world");
    }
}
