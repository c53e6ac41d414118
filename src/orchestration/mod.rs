//! Orchestration DSL parsing (C9) and plan execution (C10).

pub mod parser;
pub mod scheduler;
pub mod types;

pub use parser::parse;
pub use scheduler::{execute_plan, CancellationToken, StepOutcome, StepRunner};
pub use types::{Condition, OrchestrationPlan, OrchestrationStep, PlanMetadata, PlanStatus, StepResult, StepStatus};
