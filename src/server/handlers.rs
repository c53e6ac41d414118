//! HTTP handlers for every endpoint in spec §6's table.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::cost::SummaryFilter;
use crate::error::RuntimeError;
use crate::executor::TaskRequest;
use crate::orchestration::PlanStatus;
use crate::runtime::Runtime;
use crate::server::auth;

impl IntoResponse for RuntimeError {
    fn into_response(self) -> Response {
        // AgentNotFound stays mapped to 500, not 404 — preserved source
        // behavior per spec §7/§9, not normalized to a RESTful not-found.
        let status = match &self {
            RuntimeError::AgentNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RuntimeError::NoProviderAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RuntimeError::Parse(_) => StatusCode::BAD_REQUEST,
            RuntimeError::Unauthorized => StatusCode::UNAUTHORIZED,
            RuntimeError::NotFound(_) => StatusCode::NOT_FOUND,
            RuntimeError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

#[derive(Serialize)]
pub struct GoblinSummary {
    id: String,
    title: String,
    guild: String,
    responsibilities: Vec<String>,
    toolbelt: Vec<String>,
}

pub async fn health(State(runtime): State<Arc<Runtime>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "initialized": !runtime.providers.is_empty(),
        "providers": runtime.providers.keys().collect::<Vec<_>>(),
        "timestamp": chrono::Utc::now(),
    }))
}

pub async fn list_goblins(State(runtime): State<Arc<Runtime>>) -> Json<Vec<GoblinSummary>> {
    let goblins = runtime
        .catalog
        .agents()
        .map(|agent| GoblinSummary {
            id: agent.id.clone(),
            title: agent.title.clone(),
            guild: agent.guild.clone(),
            responsibilities: agent.responsibilities.clone(),
            toolbelt: agent.owned_tools().to_vec(),
        })
        .collect();
    Json(goblins)
}

#[derive(Deserialize)]
pub struct ExecuteBody {
    goblin: String,
    task: String,
    #[serde(default)]
    context: Option<std::collections::BTreeMap<String, String>>,
    #[serde(default)]
    dry_run: bool,
}

pub async fn execute(
    State(runtime): State<Arc<Runtime>>,
    Json(body): Json<ExecuteBody>,
) -> Result<Json<crate::executor::TaskResponse>, RuntimeError> {
    let response = runtime
        .execute(TaskRequest {
            agent_id: body.goblin,
            task_text: body.task,
            context: body.context,
            dry_run: body.dry_run,
        })
        .await?;
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

pub async fn history(
    State(runtime): State<Arc<Runtime>>,
    Path(agent): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<crate::history::HistoryEntry>> {
    Json(runtime.history_for(&agent, q.limit.unwrap_or(20)))
}

#[derive(Serialize)]
pub struct StatsResponse {
    total_tasks: usize,
    successful_tasks: usize,
    failed_tasks: usize,
    success_rate: f64,
    avg_duration_ms: f64,
}

pub async fn stats(
    State(runtime): State<Arc<Runtime>>,
    Path(agent): Path<String>,
) -> Json<StatsResponse> {
    let all = runtime.history.all_for_agent(&agent);
    let total_tasks = all.len();
    let successful_tasks = all.iter().filter(|e| e.succeeded).count();
    let failed_tasks = total_tasks - successful_tasks;
    let success_rate = if total_tasks > 0 {
        successful_tasks as f64 / total_tasks as f64
    } else {
        0.0
    };
    let avg_duration_ms = if total_tasks > 0 {
        all.iter().filter_map(|e| e.kpis.get("duration_ms")).sum::<f64>() / total_tasks as f64
    } else {
        0.0
    };

    Json(StatsResponse {
        total_tasks,
        successful_tasks,
        failed_tasks,
        success_rate,
        avg_duration_ms,
    })
}

#[derive(Deserialize)]
pub struct LoginBody {
    username: String,
    password: String,
}

pub async fn login(
    State(runtime): State<Arc<Runtime>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let expected_user = runtime.config.dashboard_user.as_deref().unwrap_or("admin");
    let expected_pass = runtime.config.dashboard_pass.as_deref().unwrap_or("");

    if body.username != expected_user || body.password != expected_pass {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let secret = runtime.config.jwt_secret.as_deref().unwrap_or_default();
    let token = auth::issue_token(secret, &body.username);
    Ok(Json(json!({"token": token})))
}

#[derive(Deserialize)]
pub struct OrchestrateBody {
    text: String,
    #[serde(default = "default_goblin")]
    default_goblin_id: String,
}

fn default_goblin() -> String {
    "default".to_string()
}

pub async fn orchestrate_parse(
    State(runtime): State<Arc<Runtime>>,
    Json(body): Json<OrchestrateBody>,
) -> Result<Json<crate::orchestration::OrchestrationPlan>, RuntimeError> {
    let plan = runtime.parse_plan(&body.text, &body.default_goblin_id)?;
    Ok(Json(plan))
}

pub async fn orchestrate_execute(
    State(runtime): State<Arc<Runtime>>,
    Json(body): Json<OrchestrateBody>,
) -> Result<Json<crate::orchestration::OrchestrationPlan>, RuntimeError> {
    let plan = runtime.parse_plan(&body.text, &body.default_goblin_id)?;
    let completed = runtime.execute_plan(plan).await;
    Ok(Json(completed))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    status: Option<String>,
}

pub async fn list_plans(
    State(runtime): State<Arc<Runtime>>,
    Query(q): Query<StatusQuery>,
) -> Json<Vec<crate::orchestration::OrchestrationPlan>> {
    let status = q.status.as_deref().and_then(parse_plan_status);
    Json(runtime.list_plans(status))
}

fn parse_plan_status(s: &str) -> Option<PlanStatus> {
    match s {
        "pending" => Some(PlanStatus::Pending),
        "running" => Some(PlanStatus::Running),
        "completed" => Some(PlanStatus::Completed),
        "failed" => Some(PlanStatus::Failed),
        "cancelled" => Some(PlanStatus::Cancelled),
        _ => None,
    }
}

pub async fn get_plan(
    State(runtime): State<Arc<Runtime>>,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::orchestration::OrchestrationPlan>, RuntimeError> {
    runtime
        .get_plan(id)
        .map(Json)
        .ok_or_else(|| RuntimeError::NotFound(format!("plan {}", id)))
}

pub async fn cancel_plan(
    State(runtime): State<Arc<Runtime>>,
    Path(id): Path<Uuid>,
) -> Json<serde_json::Value> {
    let success = runtime.cancel_plan(id);
    Json(json!({"success": success, "planId": id}))
}

#[derive(Deserialize)]
pub struct CostSummaryQuery {
    #[serde(rename = "goblinId")]
    goblin_id: Option<String>,
    #[serde(rename = "guildId")]
    guild_id: Option<String>,
    limit: Option<usize>,
}

pub async fn cost_summary(
    State(runtime): State<Arc<Runtime>>,
    Query(q): Query<CostSummaryQuery>,
) -> Json<crate::cost::CostSummary> {
    Json(runtime.cost_tracker.summary(&SummaryFilter {
        agent_id: q.goblin_id,
        guild: q.guild_id,
        limit: q.limit,
    }))
}

pub async fn cost_for_goblin(
    State(runtime): State<Arc<Runtime>>,
    Path(id): Path<String>,
) -> Json<crate::cost::CostSummary> {
    Json(runtime.cost_tracker.summary(&SummaryFilter {
        agent_id: Some(id),
        guild: None,
        limit: None,
    }))
}

pub async fn cost_for_guild(
    State(runtime): State<Arc<Runtime>>,
    Path(id): Path<String>,
) -> Json<crate::cost::CostSummary> {
    Json(runtime.cost_tracker.summary(&SummaryFilter {
        agent_id: None,
        guild: Some(id),
        limit: None,
    }))
}

pub async fn cost_export(State(runtime): State<Arc<Runtime>>) -> Result<Response, StatusCode> {
    let csv_bytes = runtime
        .cost_tracker
        .export_csv()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let headers = [
        (axum::http::header::CONTENT_TYPE, "text/csv"),
        (
            axum::http::header::CONTENT_DISPOSITION,
            "attachment; filename=\"costs.csv\"",
        ),
    ];
    Ok((headers, csv_bytes).into_response())
}
