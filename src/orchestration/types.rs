//! Orchestration data model (spec §3): steps, plans, and the condition kinds
//! a step may attach.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped | StepStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// A step-attached condition evaluated once all of its dependencies reach a
/// terminal state (spec §4.6/§4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    IfSuccess,
    IfFailure,
    IfContains(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResult {
    pub output: String,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationStep {
    pub id: Uuid,
    pub agent_id: String,
    pub task_text: String,
    /// Ordered by first-insertion, matching authoring order of the preceding
    /// parallel group: `IF_CONTAINS` concatenation depends on this order
    /// (spec §4.7 step 3).
    pub dependencies: Vec<Uuid>,
    pub condition: Option<Condition>,
    pub status: StepStatus,
    pub result: Option<StepResult>,
}

impl OrchestrationStep {
    pub fn new(agent_id: String, task_text: String, dependencies: Vec<Uuid>, condition: Option<Condition>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            task_text,
            dependencies,
            condition,
            status: StepStatus::Pending,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub parallel_batches: usize,
    pub estimated_duration_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationPlan {
    pub id: Uuid,
    pub raw_text: String,
    pub steps: Vec<OrchestrationStep>,
    pub status: PlanStatus,
    pub metadata: PlanMetadata,
}

impl OrchestrationPlan {
    pub fn step_mut(&mut self, id: Uuid) -> Option<&mut OrchestrationStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn step(&self, id: Uuid) -> Option<&OrchestrationStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}
