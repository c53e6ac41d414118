//! End-to-end orchestration scenarios wiring the parser (C9) and scheduler
//! (C10) through the real task executor (C8), the way `Runtime` does in
//! production — mirrors the teacher's own `tests/orchestration_tests.rs`
//! layout of driving the full pipeline with a stub provider.

use std::sync::Arc;

use async_trait::async_trait;

use cloudguild::catalog::AgentCatalog;
use cloudguild::cost::CostTracker;
use cloudguild::error::ProviderError;
use cloudguild::executor::{execute_task, ExecutorContext, TaskRequest};
use cloudguild::history::HistoryStore;
use cloudguild::orchestration::{execute_plan, parse, CancellationToken, PlanStatus, StepOutcome, StepRunner, StepStatus};
use cloudguild::provider::{ChunkStream, GenerateOptions, Provider, ProviderMap};

const CATALOG: &str = r#"
[[guilds]]
name = "web"
charter = "ship the product"

[[guilds.members]]
id = "websmith"
title = "Web Smith"

[guilds.members.brain]
routers = ["stub"]

[[guilds.members]]
id = "crafter"
title = "Crafter"

[guilds.members.brain]
routers = ["stub"]
"#;

/// Fails `generate` whenever the task text contains `fail_trigger`; otherwise
/// echoes a deterministic success string.
struct ScriptedProvider {
    fail_trigger: &'static str,
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, ProviderError> {
        if prompt.contains(self.fail_trigger) {
            Err(ProviderError::Transport("scripted failure".to_string()))
        } else {
            Ok(format!("{} done", prompt))
        }
    }

    async fn generate_stream(&self, _prompt: &str, _options: &GenerateOptions) -> Result<ChunkStream, ProviderError> {
        Ok(Box::pin(futures_util::stream::empty()))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Bridges the scheduler to the executor the same way `runtime::Runtime`
/// does internally, but borrowing a test-local `ExecutorContext`.
struct TestStepRunner<'a> {
    ctx: ExecutorContext<'a>,
}

#[async_trait]
impl StepRunner for TestStepRunner<'_> {
    async fn run_step(&self, agent_id: &str, task_text: &str) -> StepOutcome {
        let request = TaskRequest {
            agent_id: agent_id.to_string(),
            task_text: task_text.to_string(),
            context: None,
            dry_run: false,
        };
        match execute_task(&self.ctx, request).await {
            Ok(response) => StepOutcome {
                succeeded: response.succeeded,
                output: response.model_reasoning,
                error_message: None,
            },
            Err(e) => StepOutcome {
                succeeded: false,
                output: String::new(),
                error_message: Some(e.to_string()),
            },
        }
    }
}

fn test_fixtures(fail_trigger: &'static str) -> (AgentCatalog, ProviderMap, HistoryStore, CostTracker) {
    let catalog = AgentCatalog::load_from_str(CATALOG).unwrap();
    let mut providers = ProviderMap::new();
    providers.insert("stub".to_string(), Arc::new(ScriptedProvider { fail_trigger }) as Arc<dyn Provider>);
    (catalog, providers, HistoryStore::new(), CostTracker::new())
}

#[tokio::test]
async fn sequential_success_scenario() {
    let (catalog, providers, history, cost_tracker) = test_fixtures("__never__");
    let ctx = ExecutorContext {
        catalog: &catalog,
        providers: &providers,
        history: &history,
        cost_tracker: &cost_tracker,
        audit_url: None,
    };
    let runner = TestStepRunner { ctx };

    let mut plan = parse("build THEN test", "websmith").unwrap();
    assert_eq!(plan.metadata.parallel_batches, 2);
    assert!(plan.steps[1].dependencies.contains(&plan.steps[0].id));

    execute_plan(&mut plan, &runner, &CancellationToken::new(), &mut |_| {}).await;

    assert_eq!(plan.status, PlanStatus::Completed);
    assert!(plan.steps.iter().all(|s| s.status == StepStatus::Completed));
}

#[tokio::test]
async fn parallel_mixed_scenario_runs_deploy_after_both_predecessors() {
    let (catalog, providers, history, cost_tracker) = test_fixtures("__never__");
    let ctx = ExecutorContext {
        catalog: &catalog,
        providers: &providers,
        history: &history,
        cost_tracker: &cost_tracker,
        audit_url: None,
    };
    let runner = TestStepRunner { ctx };

    let mut plan = parse("build THEN lint AND test THEN deploy IF_SUCCESS", "websmith").unwrap();
    assert_eq!(plan.steps.len(), 4);
    assert_eq!(plan.metadata.parallel_batches, 3);

    execute_plan(&mut plan, &runner, &CancellationToken::new(), &mut |_| {}).await;

    assert_eq!(plan.status, PlanStatus::Completed);
    assert_eq!(plan.steps[3].status, StepStatus::Completed);
    assert_eq!(history.all_for_agent("websmith").len(), 4);
}

#[tokio::test]
async fn failure_triggers_conditional_rollback() {
    let (catalog, providers, history, cost_tracker) = test_fixtures("test");
    let ctx = ExecutorContext {
        catalog: &catalog,
        providers: &providers,
        history: &history,
        cost_tracker: &cost_tracker,
        audit_url: None,
    };
    let runner = TestStepRunner { ctx };

    let mut plan = parse("test THEN rollback IF_FAILURE", "websmith").unwrap();
    execute_plan(&mut plan, &runner, &CancellationToken::new(), &mut |_| {}).await;

    assert_eq!(plan.steps[0].status, StepStatus::Failed);
    assert_eq!(plan.steps[1].status, StepStatus::Completed);
    assert_eq!(plan.status, PlanStatus::Failed);
}

#[tokio::test]
async fn multi_agent_syntax_dispatches_to_named_agents() {
    let (catalog, providers, history, cost_tracker) = test_fixtures("__never__");
    let ctx = ExecutorContext {
        catalog: &catalog,
        providers: &providers,
        history: &history,
        cost_tracker: &cost_tracker,
        audit_url: None,
    };
    let runner = TestStepRunner { ctx };

    let mut plan = parse("websmith: build THEN crafter: review", "websmith").unwrap();
    assert_eq!(plan.steps[0].agent_id, "websmith");
    assert_eq!(plan.steps[1].agent_id, "crafter");

    execute_plan(&mut plan, &runner, &CancellationToken::new(), &mut |_| {}).await;

    assert_eq!(plan.status, PlanStatus::Completed);
    assert_eq!(history.all_for_agent("websmith").len(), 1);
    assert_eq!(history.all_for_agent("crafter").len(), 1);
}

#[tokio::test]
async fn cancellation_stops_remaining_steps() {
    let (catalog, providers, history, cost_tracker) = test_fixtures("__never__");
    let ctx = ExecutorContext {
        catalog: &catalog,
        providers: &providers,
        history: &history,
        cost_tracker: &cost_tracker,
        audit_url: None,
    };
    let runner = TestStepRunner { ctx };

    let mut plan = parse("build THEN test", "websmith").unwrap();
    let token = CancellationToken::new();
    token.cancel();

    execute_plan(&mut plan, &runner, &token, &mut |_| {}).await;

    assert_eq!(plan.status, PlanStatus::Cancelled);
    assert!(plan.steps.iter().all(|s| s.status == StepStatus::Cancelled));
}
