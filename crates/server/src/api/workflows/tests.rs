use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use caseflow_core::config::SmtpConfig;
use caseflow_rules::{CommandOutput, CommandRunner, RuleCatalog, RuleRunner, RunError};
use caseflow_scheduler::{TriggerSource, WorkflowScheduler};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use crate::router::build_router;
use crate::state::AppState;

const ALL_MARKERS: &str = "100% SUCCESS HTTP_SUCCESS BUILD_SUCCESS TSC_SUCCESS available";

/// Answers by substring match. A `block` needle parks the command until released.
#[derive(Default)]
struct FakeCommands {
    answers: Vec<(&'static str, CommandOutput)>,
    block: Option<&'static str>,
    default_stdout: &'static str,
    started: Notify,
    release: Notify,
}

impl FakeCommands {
    fn on(mut self, needle: &'static str, stdout: &str) -> Self {
        self.answers.push((needle, CommandOutput::ok(stdout)));
        self
    }

    fn passing() -> Self {
        Self {
            default_stdout: ALL_MARKERS,
            ..Default::default()
        }
        .on("ui-functionality-tester", r#"{"passed":50,"failed":0}"#)
        .on("Scheduled Rule X", r#"{"architectureScore":96}"#)
        .on("rule-four-autofix-system", r#"{"success":true}"#)
        .on("complete-ai-testing-system", r#"{"allRulesEnforced":true,"finalVerdict":"PERFECT"}"#)
    }
}

#[async_trait]
impl CommandRunner for FakeCommands {
    async fn run(&self, command: &str, _timeout: Duration) -> Result<CommandOutput, RunError> {
        if self.block.is_some_and(|needle| command.contains(needle)) {
            self.started.notify_one();
            self.release.notified().await;
        }
        let answer = self
            .answers
            .iter()
            .find(|(needle, _)| command.contains(needle))
            .map(|(_, out)| out.clone());
        Ok(answer.unwrap_or_else(|| CommandOutput::ok(self.default_stdout)))
    }
}

fn app(commands: FakeCommands) -> (Router, Arc<WorkflowScheduler>, Arc<FakeCommands>) {
    let commands = Arc::new(commands);
    let rules = RuleRunner::new(
        Arc::new(RuleCatalog::builtin()),
        commands.clone(),
        Duration::from_secs(30),
    );
    let scheduler = Arc::new(
        WorkflowScheduler::new(rules, SmtpConfig::default(), Duration::ZERO, "0 6 * * *").unwrap(),
    );
    let router = build_router(Arc::new(AppState::new(scheduler.clone())));
    (router, scheduler, commands)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _, _) = app(FakeCommands::default());
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["isRunning"], false);
}

#[tokio::test]
async fn trigger_cache_cleanup_by_slug() {
    let (app, scheduler, _) = app(FakeCommands::default());

    let (status, body) = send(&app, "POST", "/api/workflows/trigger/cache-cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["type"], "rule3_manual_trigger");
    assert_eq!(body["result"]["verdict"], "GOOD");
    assert_eq!(body["result"]["allRulesEnforced"], true);
    assert_eq!(body["alertCode"], "S001");
    assert!(scheduler.results().contains_key("rule3"));
}

#[tokio::test]
async fn trigger_by_store_key_reports_failure_code() {
    let (app, _, _) = app(FakeCommands::default());

    // Empty report: zero pass rate.
    let (status, body) = send(&app, "POST", "/api/workflows/trigger/rule1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "rule1_manual_trigger");
    assert_eq!(body["result"]["verdict"], "CRITICAL");
    assert_eq!(body["alertCode"], "T004");
}

#[tokio::test]
async fn unknown_rule_is_404() {
    let (app, scheduler, _) = app(FakeCommands::default());
    let (status, body) = send(&app, "POST", "/api/workflows/trigger/rule9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(scheduler.results().is_empty());
}

#[tokio::test]
async fn busy_trigger_is_500() {
    let (app, scheduler, commands) = app(FakeCommands {
        block: Some("ui-functionality-tester"),
        ..Default::default()
    });

    let running = scheduler.clone();
    let first = tokio::spawn(async move { running.trigger_rule(caseflow_core::RuleId::UiTest, TriggerSource::Cli).await });
    commands.started.notified().await;

    let (status, body) = send(&app, "POST", "/api/workflows/trigger/rule3", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["type"], "rule3_manual_trigger");
    assert_eq!(body["error"], "Another workflow is currently running. Please wait.");
    assert!(body["timestamp"].is_string());

    let (_, stop) = send(&app, "POST", "/api/workflows/stop", None).await;
    assert_eq!(stop["currentStatus"], "RUNNING");

    commands.release.notify_one();
    first.await.unwrap().unwrap();
    assert!(!scheduler.results().contains_key("rule3"));
}

#[tokio::test]
async fn comprehensive_all_enforced_is_wf001() {
    let (app, _, _) = app(FakeCommands::passing());

    let (status, body) = send(&app, "POST", "/api/workflows/trigger/comprehensive", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "comprehensive_manual_trigger");
    assert_eq!(body["allRulesEnforced"], true);
    assert_eq!(body["alertCode"], "WF001");

    let results = body["results"].as_object().unwrap();
    assert_eq!(results.len(), 5);
    assert!(!results.contains_key("comprehensive"));
}

#[tokio::test]
async fn comprehensive_with_critical_rule_is_wf003() {
    let (app, _, _) = app(FakeCommands {
        default_stdout: ALL_MARKERS,
        ..Default::default()
    });

    let (_, body) = send(&app, "POST", "/api/workflows/trigger/comprehensive", None).await;
    assert_eq!(body["allRulesEnforced"], false);
    assert_eq!(body["alertCode"], "WF003");
}

#[tokio::test]
async fn emergency_summarizes_every_rule() {
    let (app, _, _) = app(FakeCommands::passing());

    let (status, body) = send(&app, "POST", "/api/workflows/trigger/emergency", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "emergency_check");
    assert_eq!(body["summary"]["totalRun"], 6);
    assert_eq!(body["summary"]["allPassed"], true);
    assert_eq!(body["summary"]["criticalIssues"], 0);
    assert_eq!(body["results"]["comprehensive"]["verdict"], "PERFECT");
}

#[tokio::test]
async fn auto_new_task_acknowledges_then_runs_chain() {
    let (app, scheduler, _) = app(FakeCommands::passing());

    let (status, body) = send(&app, "POST", "/api/workflows/trigger/auto-new-task", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "auto_new_task_trigger");
    assert_eq!(body["taskType"], "general");
    assert_eq!(body["accepted"], true);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !scheduler.results().contains_key("rule1") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(scheduler.results().len(), 1);
}

#[tokio::test]
async fn auto_new_task_while_busy_is_not_accepted() {
    let (app, scheduler, commands) = app(FakeCommands {
        block: Some("ui-functionality-tester"),
        ..Default::default()
    });

    let running = scheduler.clone();
    let first = tokio::spawn(async move { running.trigger_rule(caseflow_core::RuleId::UiTest, TriggerSource::Cli).await });
    commands.started.notified().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/workflows/trigger/auto-new-task",
        Some(json!({"taskType": "code_change"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["accepted"], false);

    commands.release.notify_one();
    first.await.unwrap().unwrap();
    assert!(!scheduler.results().contains_key("rule2"));
}

#[tokio::test]
async fn auto_new_task_reads_task_type() {
    let (app, scheduler, _) = app(FakeCommands::passing());

    let (_, body) = send(
        &app,
        "POST",
        "/api/workflows/trigger/auto-new-task",
        Some(json!({"taskType": "code_change", "taskDescription": "Add passport upload"})),
    )
    .await;
    assert_eq!(body["taskType"], "code_change");
    assert_eq!(body["taskDescription"], "Add passport upload");
    assert_eq!(body["message"], "Auto-triggered rules for \"code_change\" task");

    tokio::time::timeout(Duration::from_secs(5), async {
        while !scheduler.results().contains_key("rule2") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn notifications_are_masked() {
    let (app, _, _) = app(FakeCommands::default());

    let (status, body) = send(
        &app,
        "POST",
        "/api/workflows/notifications",
        Some(json!({"email": "ops@example.com", "slackWebhook": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Notification settings updated");
    assert_eq!(body["settings"]["email"], "configured");
    assert_eq!(body["settings"]["webhookUrl"], "not set");
    assert_eq!(body["settings"]["slackWebhook"], "not set");

    let (_, status) = send(&app, "GET", "/api/workflows/status", None).await;
    assert_eq!(status["scheduler"]["notifications"]["email"], "configured");
}

#[tokio::test]
async fn notification_updates_merge() {
    let (app, _, _) = app(FakeCommands::default());
    send(
        &app,
        "POST",
        "/api/workflows/notifications",
        Some(json!({"email": "ops@example.com"})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/workflows/notifications",
        Some(json!({"slackWebhook": "https://hooks.slack.com/services/T/B/X"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["email"], "configured");
    assert_eq!(body["settings"]["slackWebhook"], "configured");
    assert_eq!(body["settings"]["webhookUrl"], "not set");
}

#[tokio::test]
async fn status_and_results_start_empty() {
    let (app, _, _) = app(FakeCommands::default());

    let (status, body) = send(&app, "GET", "/api/workflows/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
    assert_eq!(body["isRunning"], false);
    assert_eq!(body["scheduler"]["isRunning"], false);
    assert_eq!(body["scheduler"]["schedules"]["maintenance"], "0 6 * * *");
    assert_eq!(body["workflows"]["maintenance"]["lastRun"], "Never");
    assert!(body["lastResults"].as_object().unwrap().is_empty());

    let (_, body) = send(&app, "GET", "/api/workflows/results", None).await;
    assert_eq!(body["summary"]["totalWorkflows"], 0);
    assert_eq!(body["summary"]["lastActivity"], 0);
}

#[tokio::test]
async fn results_summarize_after_runs() {
    let (app, _, _) = app(FakeCommands::default());
    send(&app, "POST", "/api/workflows/trigger/rule3", None).await;
    send(&app, "POST", "/api/workflows/trigger/rule1", None).await;

    let (_, body) = send(&app, "GET", "/api/workflows/results", None).await;
    assert_eq!(body["summary"]["totalWorkflows"], 2);
    assert_eq!(body["summary"]["successfulWorkflows"], 1);
    assert_eq!(body["summary"]["criticalWorkflows"], 1);
    assert!(body["summary"]["lastActivity"].as_i64().unwrap() > 0);

    let (_, status) = send(&app, "GET", "/api/workflows/status", None).await;
    assert_ne!(status["workflows"]["maintenance"]["lastRun"], "Never");
}

#[tokio::test]
async fn stop_when_idle() {
    let (app, _, _) = app(FakeCommands::default());
    let (status, body) = send(&app, "POST", "/api/workflows/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stop request received");
    assert_eq!(body["currentStatus"], "IDLE");
}

#[tokio::test]
async fn rules_lists_catalog() {
    let (app, _, _) = app(FakeCommands::default());
    let (status, body) = send(&app, "GET", "/api/workflows/rules", None).await;
    assert_eq!(status, StatusCode::OK);
    let rules = body.as_array().unwrap();
    assert_eq!(rules.len(), 6);
    assert_eq!(rules[0]["id"], "ui-test");
    assert_eq!(rules[0]["key"], "rule1");
    assert_eq!(rules[2]["kind"], "probes");
}
