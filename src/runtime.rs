//! The long-lived [`Runtime`]: the single owner of every piece of mutable and
//! immutable state the server surface reads and writes (spec §3 Ownership,
//! §5 Shared-resource policy).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use log::warn;
use uuid::Uuid;

use crate::catalog::AgentCatalog;
use crate::config::RuntimeConfig;
use crate::cost::CostTracker;
use crate::executor::{execute_task, ExecutorContext, TaskRequest, TaskResponse};
use crate::history::{HistoryEntry, HistoryStore};
use crate::orchestration::{self, CancellationToken, OrchestrationPlan, PlanStatus, StepOutcome, StepRunner};
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::gemini::GeminiProvider;
use crate::provider::grok::GrokProvider;
use crate::provider::local::LocalProvider;
use crate::provider::openai::OpenAIProvider;
use crate::provider::{Provider, ProviderMap};
use crate::error::RuntimeError;

/// In-flight and completed orchestration plans, keyed by plan id (spec §3
/// "in-flight orchestration plans set").
#[derive(Default)]
struct PlanStore {
    plans: Mutex<HashMap<Uuid, OrchestrationPlan>>,
    cancellations: Mutex<HashMap<Uuid, CancellationToken>>,
}

/// The single process-wide owner of agent catalog, providers, cost tracker,
/// history store, and orchestration plans. Constructed once at startup;
/// handlers borrow it through an `Arc`.
pub struct Runtime {
    pub config: RuntimeConfig,
    pub catalog: AgentCatalog,
    pub providers: ProviderMap,
    pub cost_tracker: CostTracker,
    pub history: HistoryStore,
    plans: PlanStore,
}

impl Runtime {
    /// Build provider clients for every `<PROVIDER>_API_KEY` present in
    /// `config`, running each through a bounded health check; unhealthy or
    /// unconfigured providers are simply absent from the map (spec §4.3).
    pub async fn new(config: RuntimeConfig, catalog: AgentCatalog) -> Result<Self, RuntimeError> {
        let mut providers: ProviderMap = HashMap::new();

        if let Some(key) = config.provider_api_keys.get("openai") {
            try_insert(&mut providers, "openai", std::sync::Arc::new(OpenAIProvider::new(key.clone(), "gpt-4o-mini".into()))).await;
        }
        if let Some(key) = config.provider_api_keys.get("anthropic") {
            try_insert(&mut providers, "anthropic", std::sync::Arc::new(AnthropicProvider::new(key.clone()))).await;
        }
        if let Some(key) = config.provider_api_keys.get("gemini") {
            try_insert(&mut providers, "gemini", std::sync::Arc::new(GeminiProvider::new(key.clone()))).await;
        }
        if let Some(key) = config.provider_api_keys.get("grok") {
            try_insert(&mut providers, "grok", std::sync::Arc::new(GrokProvider::new(key.clone()))).await;
        }
        if config.provider_api_keys.contains_key("local") || config.provider_api_keys.is_empty() {
            try_insert(&mut providers, "local", std::sync::Arc::new(LocalProvider::new(None, None))).await;
        }

        if providers.is_empty() {
            return Err(RuntimeError::NoProviderAvailable(
                "no provider was initialized healthy at startup".to_string(),
            ));
        }

        Ok(Self {
            config,
            catalog,
            providers,
            cost_tracker: CostTracker::new(),
            history: HistoryStore::new(),
            plans: PlanStore::default(),
        })
    }

    pub async fn execute(&self, request: TaskRequest) -> Result<TaskResponse, RuntimeError> {
        let ctx = ExecutorContext {
            catalog: &self.catalog,
            providers: &self.providers,
            history: &self.history,
            cost_tracker: &self.cost_tracker,
            audit_url: self.config.audit_url.clone(),
        };
        execute_task(&ctx, request).await
    }

    pub fn parse_plan(&self, text: &str, default_agent_id: &str) -> Result<OrchestrationPlan, RuntimeError> {
        let plan = orchestration::parse(text, default_agent_id)?;
        self.plans.plans.lock().unwrap().insert(plan.id, plan.clone());
        Ok(plan)
    }

    /// Republishes the plan into the shared store after every step
    /// termination, not only once execution finishes, so a concurrent
    /// `GET /api/orchestrate/plans/:id` observes step-level progress
    /// (spec §4.7, §5).
    pub async fn execute_plan(&self, mut plan: OrchestrationPlan) -> OrchestrationPlan {
        let token = CancellationToken::new();
        self.plans.cancellations.lock().unwrap().insert(plan.id, token.clone());

        let runner = RuntimeStepRunner { runtime: self };
        let mut publish = |p: &OrchestrationPlan| {
            self.plans.plans.lock().unwrap().insert(p.id, p.clone());
        };
        orchestration::execute_plan(&mut plan, &runner, &token, &mut publish).await;

        plan
    }

    pub fn get_plan(&self, id: Uuid) -> Option<OrchestrationPlan> {
        self.plans.plans.lock().unwrap().get(&id).cloned()
    }

    pub fn list_plans(&self, status: Option<PlanStatus>) -> Vec<OrchestrationPlan> {
        self.plans
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| status.map(|s| p.status == s).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Flip the plan-local cancellation flag, if the plan is known and still
    /// executing (spec §4.9 cancellation endpoint).
    pub fn cancel_plan(&self, id: Uuid) -> bool {
        if let Some(token) = self.plans.cancellations.lock().unwrap().get(&id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    pub fn history_for(&self, agent_id: &str, limit: usize) -> Vec<HistoryEntry> {
        self.history.recent(agent_id, limit)
    }
}

async fn try_insert(providers: &mut ProviderMap, id: &str, provider: std::sync::Arc<dyn Provider>) {
    if provider.health_check().await {
        providers.insert(id.to_string(), provider);
    } else {
        warn!("provider '{}' failed its startup health check; excluding it", id);
    }
}

/// Bridges the orchestration scheduler (C10) to the task executor (C8)
/// without the scheduler depending on executor types directly.
struct RuntimeStepRunner<'a> {
    runtime: &'a Runtime,
}

#[async_trait]
impl StepRunner for RuntimeStepRunner<'_> {
    async fn run_step(&self, agent_id: &str, task_text: &str) -> StepOutcome {
        let request = TaskRequest {
            agent_id: agent_id.to_string(),
            task_text: task_text.to_string(),
            context: None,
            dry_run: false,
        };

        match self.runtime.execute(request).await {
            Ok(response) => StepOutcome {
                succeeded: response.succeeded,
                output: format!(
                    "{}{}",
                    response.model_reasoning,
                    response
                        .tool_execution_result
                        .map(|t| t.combined_output)
                        .unwrap_or_default()
                ),
                error_message: if response.succeeded {
                    None
                } else {
                    Some(response.model_reasoning)
                },
            },
            Err(e) => StepOutcome {
                succeeded: false,
                output: format!("Error: {}", e),
                error_message: Some(e.to_string()),
            },
        }
    }
}
