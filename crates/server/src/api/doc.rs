//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "caseflow API",
        version = "0.1.0",
        description = "Workflow scheduler: manual, task-triggered and scheduled quality-check rules.",
    ),
    tags(
        (name = "Health", description = "Server liveness"),
        (name = "Workflows", description = "Rule triggers, results, status and notification settings"),
    ),
    paths(
        crate::api::health::health,
        crate::api::workflows::status,
        crate::api::workflows::results,
        crate::api::workflows::list_rules,
        crate::api::workflows::trigger_rule,
        crate::api::workflows::trigger_comprehensive,
        crate::api::workflows::trigger_emergency,
        crate::api::workflows::trigger_auto_new_task,
        crate::api::workflows::set_notifications,
        crate::api::workflows::stop,
    ),
    components(schemas(
        crate::api::health::HealthResponse,
        crate::api::workflows::StatusResponse,
        crate::api::workflows::WorkflowInfo,
        crate::api::workflows::RuleTriggerResponse,
        crate::api::workflows::ComprehensiveResponse,
        crate::api::workflows::EmergencyResponse,
        crate::api::workflows::AutoNewTaskRequest,
        crate::api::workflows::AutoNewTaskResponse,
        crate::api::workflows::NotificationsResponse,
        crate::api::workflows::ResultsResponse,
        crate::api::workflows::StopResponse,
        crate::api::workflows::RuleSummary,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_workflow_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/workflows/status",
            "/api/workflows/trigger/{rule}",
            "/api/workflows/trigger/auto-new-task",
            "/api/workflows/notifications",
            "/api/workflows/stop",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
