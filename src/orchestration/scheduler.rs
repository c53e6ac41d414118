//! Orchestration executor (C10).
//!
//! Drives an [`OrchestrationPlan`] through the `pending → running →
//! (completed | failed | cancelled)` state machine using the topological,
//! batched algorithm of spec §4.7: each pass computes the ready set, skips
//! steps whose condition is not met, runs the rest concurrently, and repeats
//! until nothing more can become ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use crate::orchestration::types::{Condition, OrchestrationPlan, PlanStatus, StepResult, StepStatus};

/// What running one step produced. Distinct from [`crate::error::ProviderError`]
/// et al. because the scheduler never propagates a step failure as a Rust
/// `Err` — a failed step is itself a valid terminal outcome (spec §4.7 step 4).
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub succeeded: bool,
    pub output: String,
    pub error_message: Option<String>,
}

/// Executes a single orchestration step by dispatching into the task executor
/// (C8). Implemented by [`crate::runtime::Runtime`]; kept as a trait here so
/// the scheduler has no dependency on the executor's concrete types.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step(&self, agent_id: &str, task_text: &str) -> StepOutcome;
}

/// A plan-scoped cooperative cancellation flag (spec §4.7, §5). Cloning shares
/// the same underlying flag; `cancel()` is visible to the scheduler at the top
/// of its next pass and before launching each wave.
#[derive(Clone, Default)]
pub struct CancellationToken(std::sync::Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn evaluate_condition(condition: &Option<Condition>, dependencies: &[Uuid], plan: &OrchestrationPlan) -> bool {
    match condition {
        None => true,
        Some(Condition::IfSuccess) => dependencies
            .iter()
            .all(|d| plan.step(*d).map(|s| s.status == StepStatus::Completed).unwrap_or(true)),
        Some(Condition::IfFailure) => dependencies
            .iter()
            .any(|d| plan.step(*d).map(|s| s.status == StepStatus::Failed).unwrap_or(false)),
        Some(Condition::IfContains(needle)) => {
            let haystack: String = dependencies
                .iter()
                .filter_map(|d| plan.step(*d))
                .filter_map(|s| s.result.as_ref())
                .map(|r| r.output.as_str())
                .collect::<Vec<_>>()
                .join("");
            haystack.contains(needle.as_str())
        }
    }
}

/// Run `plan` to completion (or cancellation), mutating it in place.
///
/// `on_step` is invoked with a read-only snapshot of `plan` right after each
/// step's status is updated to a terminal state, so a caller holding the
/// shared plan store can republish the snapshot for concurrent readers
/// instead of only seeing the plan once execution finishes (spec §4.7, §5).
pub async fn execute_plan(
    plan: &mut OrchestrationPlan,
    runner: &dyn StepRunner,
    cancellation: &CancellationToken,
    on_step: &mut dyn FnMut(&OrchestrationPlan),
) {
    plan.status = PlanStatus::Running;

    loop {
        if cancellation.is_cancelled() {
            for step in plan.steps.iter_mut() {
                if !step.status.is_terminal() {
                    step.status = StepStatus::Cancelled;
                }
            }
            plan.status = PlanStatus::Cancelled;
            on_step(plan);
            return;
        }

        let ready_ids: Vec<Uuid> = plan
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .filter(|s| {
                s.dependencies
                    .iter()
                    .all(|d| plan.step(*d).map(|ds| ds.status.is_terminal()).unwrap_or(true))
            })
            .map(|s| s.id)
            .collect();

        if ready_ids.is_empty() {
            break;
        }

        let mut runnable = Vec::new();
        for id in &ready_ids {
            let step = plan.step(*id).expect("id came from plan.steps");
            if evaluate_condition(&step.condition, &step.dependencies, plan) {
                runnable.push(*id);
            } else if let Some(s) = plan.step_mut(*id) {
                s.status = StepStatus::Skipped;
            }
        }

        if runnable.is_empty() {
            continue;
        }

        if cancellation.is_cancelled() {
            continue;
        }

        for id in &runnable {
            if let Some(s) = plan.step_mut(*id) {
                s.status = StepStatus::Running;
            }
        }

        let jobs = runnable.iter().map(|id| {
            let step = plan.step(*id).expect("id came from plan.steps");
            let agent_id = step.agent_id.clone();
            let task_text = step.task_text.clone();
            let id = *id;
            async move {
                let start = Instant::now();
                let outcome = runner.run_step(&agent_id, &task_text).await;
                (id, outcome, start.elapsed().as_millis() as u64)
            }
        });

        let results = futures_util::future::join_all(jobs).await;

        for (id, outcome, duration_ms) in results {
            if let Some(s) = plan.step_mut(id) {
                s.status = if outcome.succeeded { StepStatus::Completed } else { StepStatus::Failed };
                s.result = Some(StepResult {
                    output: outcome.output,
                    duration_ms,
                    error_message: outcome.error_message,
                });
            }
            on_step(plan);
        }
    }

    plan.status = if plan.steps.iter().any(|s| s.status == StepStatus::Failed) {
        PlanStatus::Failed
    } else {
        PlanStatus::Completed
    };
    on_step(plan);
}
