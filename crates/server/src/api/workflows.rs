//! Workflow trigger, status and settings endpoints under `/api/workflows`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use caseflow_core::{
    now_rfc3339, MaskedNotificationConfig, NotificationConfig, RuleGroup, RuleId, Verdict,
    WorkflowResult,
};
use caseflow_scheduler::{
    GroupSummary, ResultsSummary, SchedulerError, SchedulerStatus, TriggerSource,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::state::AppState;

/// Build the `/api/workflows` sub-router.
pub fn workflows_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(status))
        .route("/rules", get(list_rules))
        .route("/results", get(results))
        .route("/notifications", post(set_notifications))
        .route("/stop", post(stop))
        // Static trigger routes take precedence over `{rule}`.
        .route("/trigger/comprehensive", post(trigger_comprehensive))
        .route("/trigger/emergency", post(trigger_emergency))
        .route("/trigger/auto-new-task", post(trigger_auto_new_task))
        .route("/trigger/{rule}", post(trigger_rule))
}

// ── Errors ──────────────────────────────────────────────────────────

/// Error body shared by every trigger endpoint.
pub(crate) struct TriggerError {
    status: StatusCode,
    error: String,
    kind: String,
}

impl TriggerError {
    fn rejected(err: SchedulerError, kind: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.to_string(),
            kind: kind.into(),
        }
    }

    fn unknown_rule(rule: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: format!("Unknown rule: {rule}"),
            kind: format!("{rule}_manual_trigger"),
        }
    }
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.error,
            "type": self.kind,
            "timestamp": now_rfc3339(),
        });
        (self.status, Json(body)).into_response()
    }
}

// ── Response types ──────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    #[schema(value_type = Object)]
    pub scheduler: SchedulerStatus,
    #[schema(value_type = Object)]
    pub workflows: BTreeMap<&'static str, WorkflowInfo>,
    #[schema(value_type = Object)]
    pub last_results: BTreeMap<String, WorkflowResult>,
    pub is_running: bool,
    pub timestamp: String,
}

/// Human-readable description of one scheduled workflow.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInfo {
    pub name: &'static str,
    pub schedule: String,
    pub description: &'static str,
    /// Timestamp of the last stored result, or "Never".
    pub last_run: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleTriggerResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: String,
    #[schema(value_type = Object)]
    pub result: WorkflowResult,
    pub alert_code: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[schema(value_type = Object)]
    pub results: IndexMap<String, WorkflowResult>,
    pub all_rules_enforced: bool,
    pub alert_code: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[schema(value_type = Object)]
    pub results: IndexMap<String, WorkflowResult>,
    #[schema(value_type = Object)]
    pub summary: GroupSummary,
    pub timestamp: String,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoNewTaskRequest {
    pub task_type: Option<String>,
    pub task_description: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoNewTaskResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub task_type: String,
    pub task_description: String,
    pub alert_code: &'static str,
    pub message: String,
    /// False when another workflow was running; the chain is then skipped.
    pub accepted: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub success: bool,
    pub message: &'static str,
    #[schema(value_type = Object)]
    pub settings: MaskedNotificationConfig,
    pub timestamp: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    #[schema(value_type = Object)]
    pub results: BTreeMap<String, WorkflowResult>,
    #[schema(value_type = Object)]
    pub summary: ResultsSummary,
    pub timestamp: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub message: &'static str,
    pub current_status: &'static str,
    pub note: &'static str,
    pub timestamp: String,
}

/// Catalog entry returned by GET /rules.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub id: String,
    pub key: &'static str,
    pub title: String,
    pub kind: &'static str,
    pub pass_code: String,
    pub fail_code: String,
}

// ── Reads ───────────────────────────────────────────────────────────

/// Scheduler state, last results and the configured schedules.
#[utoipa::path(
    get,
    path = "/api/workflows/status",
    tag = "Workflows",
    responses(
        (status = 200, description = "Scheduler status", body = StatusResponse)
    )
)]
pub(crate) async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let scheduler = state.scheduler.status();
    let last_run = |key: &str| {
        scheduler
            .last_results
            .get(key)
            .map(|r| r.timestamp.clone())
            .unwrap_or_else(|| "Never".to_string())
    };

    let workflows = BTreeMap::from([
        (
            "maintenance",
            WorkflowInfo {
                name: "Daily Maintenance",
                schedule: format!("{} (UTC)", scheduler.schedules.maintenance),
                description: "Cache cleanup and server health check",
                last_run: last_run(RuleId::CacheCleanup.store_key()),
            },
        ),
        (
            "taskTriggered",
            WorkflowInfo {
                name: "Post-Task Checks",
                schedule: scheduler.schedules.task_triggered.to_string(),
                description: "UI test and AI verification chained by task type",
                last_run: last_run(RuleId::UiTest.store_key()),
            },
        ),
        (
            "fullSuite",
            WorkflowInfo {
                name: "Comprehensive Test Suite",
                schedule: "Manual or emergency check".to_string(),
                description: "Complete test suite across all rules",
                last_run: last_run(RuleId::FullSuite.store_key()),
            },
        ),
    ]);

    Json(StatusResponse {
        status: "operational",
        workflows,
        last_results: scheduler.last_results.clone(),
        is_running: scheduler.is_running,
        scheduler,
        timestamp: now_rfc3339(),
    })
}

/// Most recent result per rule with aggregate counts.
#[utoipa::path(
    get,
    path = "/api/workflows/results",
    tag = "Workflows",
    responses(
        (status = 200, description = "Stored results", body = ResultsResponse)
    )
)]
pub(crate) async fn results(State(state): State<Arc<AppState>>) -> Json<ResultsResponse> {
    Json(ResultsResponse {
        results: state.scheduler.results(),
        summary: state.scheduler.results_summary(),
        timestamp: now_rfc3339(),
    })
}

/// Rule catalog in declaration order.
#[utoipa::path(
    get,
    path = "/api/workflows/rules",
    tag = "Workflows",
    responses(
        (status = 200, description = "Rule catalog", body = Vec<RuleSummary>)
    )
)]
pub(crate) async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<RuleSummary>> {
    let rules = state
        .scheduler
        .rules()
        .catalog()
        .iter()
        .map(|def| RuleSummary {
            id: def.id.slug().to_string(),
            key: def.id.store_key(),
            title: def.title.clone(),
            kind: def.evaluation.kind(),
            pass_code: def.alerts.pass.clone(),
            fail_code: def.alerts.fail.clone(),
        })
        .collect();
    Json(rules)
}

// ── Triggers ────────────────────────────────────────────────────────

/// Run one rule and wait for its result.
#[utoipa::path(
    post,
    path = "/api/workflows/trigger/{rule}",
    tag = "Workflows",
    params(
        ("rule" = String, Path, description = "Rule slug (`cache-cleanup`) or key (`rule3`)")
    ),
    responses(
        (status = 200, description = "Rule result", body = RuleTriggerResponse),
        (status = 404, description = "Unknown rule"),
        (status = 500, description = "Another workflow is running")
    )
)]
pub(crate) async fn trigger_rule(
    State(state): State<Arc<AppState>>,
    Path(rule): Path<String>,
) -> Result<Json<RuleTriggerResponse>, TriggerError> {
    let id: RuleId = rule.parse().map_err(|_| TriggerError::unknown_rule(&rule))?;
    let kind = format!("{}_manual_trigger", id.store_key());
    info!(rule = %id, "manual trigger");

    let result = state
        .scheduler
        .trigger_rule(id, TriggerSource::Http)
        .await
        .map_err(|e| TriggerError::rejected(e, kind.clone()))?;

    let alert_code = state
        .scheduler
        .rules()
        .catalog()
        .get(id)
        .map(|def| def.alert_code(&result).to_string())
        .unwrap_or_default();

    Ok(Json(RuleTriggerResponse {
        success: true,
        kind,
        result,
        alert_code,
        timestamp: now_rfc3339(),
    }))
}

/// Run every individual check in order.
#[utoipa::path(
    post,
    path = "/api/workflows/trigger/comprehensive",
    tag = "Workflows",
    responses(
        (status = 200, description = "Group results", body = ComprehensiveResponse),
        (status = 500, description = "Another workflow is running")
    )
)]
pub(crate) async fn trigger_comprehensive(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ComprehensiveResponse>, TriggerError> {
    const KIND: &str = "comprehensive_manual_trigger";
    let run = state
        .scheduler
        .trigger_group(RuleGroup::Comprehensive, TriggerSource::Http)
        .await
        .map_err(|e| TriggerError::rejected(e, KIND))?;

    let alert_code = if run.all_rules_enforced {
        "WF001"
    } else if run.results.values().any(|r| r.verdict == Verdict::IssuesFixed) {
        "WF002"
    } else {
        "WF003"
    };

    Ok(Json(ComprehensiveResponse {
        success: true,
        kind: KIND,
        all_rules_enforced: run.all_rules_enforced,
        results: run.results,
        alert_code,
        timestamp: now_rfc3339(),
    }))
}

/// Run every rule, cleanup first and the full test suite last.
#[utoipa::path(
    post,
    path = "/api/workflows/trigger/emergency",
    tag = "Workflows",
    responses(
        (status = 200, description = "Group results with summary", body = EmergencyResponse),
        (status = 500, description = "Another workflow is running")
    )
)]
pub(crate) async fn trigger_emergency(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EmergencyResponse>, TriggerError> {
    const KIND: &str = "emergency_check";
    let run = state
        .scheduler
        .trigger_group(RuleGroup::Emergency, TriggerSource::Http)
        .await
        .map_err(|e| TriggerError::rejected(e, KIND))?;

    Ok(Json(EmergencyResponse {
        success: true,
        kind: KIND,
        summary: run.summary(),
        results: run.results,
        timestamp: now_rfc3339(),
    }))
}

/// Acknowledge a finished task and run its rule chain in the background.
#[utoipa::path(
    post,
    path = "/api/workflows/trigger/auto-new-task",
    tag = "Workflows",
    request_body(content = AutoNewTaskRequest, description = "Task tag and description", content_type = "application/json"),
    responses(
        (status = 200, description = "Chain scheduled", body = AutoNewTaskResponse)
    )
)]
pub(crate) async fn trigger_auto_new_task(
    State(state): State<Arc<AppState>>,
    body: Option<Json<AutoNewTaskRequest>>,
) -> Json<AutoNewTaskResponse> {
    let Json(req) = body.unwrap_or_default();
    let task_type = req.task_type.unwrap_or_else(|| "general".to_string());
    let task_description = req.task_description.unwrap_or_default();
    info!(task_type = %task_type, description = %task_description, "task completed");

    let accepted = match state
        .scheduler
        .spawn_task_completed(task_type.clone(), TriggerSource::TaskHook)
    {
        Ok(_) => true,
        Err(e) => {
            info!(task_type = %task_type, reason = %e, "skipping post-task rules");
            false
        }
    };

    Json(AutoNewTaskResponse {
        success: true,
        kind: "auto_new_task_trigger",
        message: format!("Auto-triggered rules for \"{task_type}\" task"),
        task_type,
        task_description,
        alert_code: "T001",
        accepted,
        timestamp: now_rfc3339(),
    })
}

// ── Settings ────────────────────────────────────────────────────────

/// Merge into the notification settings. Absent fields are kept.
#[utoipa::path(
    post,
    path = "/api/workflows/notifications",
    tag = "Workflows",
    request_body(content = Object, description = "`{email?, webhookUrl?, slackWebhook?}`", content_type = "application/json"),
    responses(
        (status = 200, description = "Masked settings", body = NotificationsResponse)
    )
)]
pub(crate) async fn set_notifications(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<NotificationConfig>,
) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        success: true,
        message: "Notification settings updated",
        settings: state.scheduler.set_notifications(settings),
        timestamp: now_rfc3339(),
    })
}

/// Acknowledge a stop request. Running workflows are not cancelled.
#[utoipa::path(
    post,
    path = "/api/workflows/stop",
    tag = "Workflows",
    responses(
        (status = 200, description = "Current run state", body = StopResponse)
    )
)]
pub(crate) async fn stop(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    let running = state.scheduler.request_stop();
    Json(StopResponse {
        message: "Stop request received",
        current_status: if running { "RUNNING" } else { "IDLE" },
        note: "Workflows will complete their current cycle naturally",
        timestamp: now_rfc3339(),
    })
}

#[cfg(test)]
mod tests;
