//! [`WorkflowScheduler`]: the single entry point for starting runs.
//!
//! Every trigger (HTTP, cron tick, task-completion hook, CLI) takes the run
//! permit through the same step, or fails fast with [`SchedulerError::Busy`].
//! [`WorkflowScheduler::fire`] accepts any [`Trigger`]; the typed helpers
//! share its start and finish path. Nothing is queued and nothing is
//! cancelled.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use ::cron::Schedule;
use caseflow_core::config::{Config, SmtpConfig};
use caseflow_core::{
    MaskedNotificationConfig, NotificationConfig, RuleGroup, RuleId, WorkflowResult,
};
use caseflow_notify::{Dispatcher, ReportContext, ReportRenderer};
use caseflow_rules::{task_chain, RuleRunner};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::cron;
use crate::error::SchedulerError;
use crate::permit::{RunGate, RunPermit};
use crate::store::{ResultStore, ResultsSummary};
use crate::trigger::{ChainRun, GroupRun, RuleRun, Trigger, TriggerOutcome, TriggerSource};


/// Read-only snapshot of scheduler state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub last_results: BTreeMap<String, WorkflowResult>,
    /// Whether the maintenance loop is running.
    pub scheduler_active: bool,
    pub schedules: Schedules,
    pub notifications: MaskedNotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedules {
    /// Cron expression of the daily maintenance run (UTC).
    pub maintenance: String,
    pub next_maintenance: Option<String>,
    pub task_triggered: &'static str,
}

/// A started run. Dropping it releases the permit.
struct ActiveRun {
    permit: RunPermit,
    span: Span,
}

impl ActiveRun {
    async fn finish<T>(&self, work: impl Future<Output = T>) -> T {
        async {
            let out = work.await;
            info!("workflow run finished");
            out
        }
        .instrument(self.span.clone())
        .await
    }
}

pub struct WorkflowScheduler {
    rules: RuleRunner,
    gate: RunGate,
    store: ResultStore,
    notifications: RwLock<NotificationConfig>,
    smtp: SmtpConfig,
    renderer: ReportRenderer,
    rule_delay: Duration,
    maintenance_expr: String,
    maintenance: Schedule,
    maintenance_active: AtomicBool,
}

impl WorkflowScheduler {
    pub fn new(
        rules: RuleRunner,
        smtp: SmtpConfig,
        rule_delay: Duration,
        maintenance_cron: &str,
    ) -> Result<Self, SchedulerError> {
        let maintenance = cron::parse_schedule(maintenance_cron)?;
        let gate = RunGate::new();
        Ok(Self {
            rules,
            store: ResultStore::new(gate.clone()),
            gate,
            notifications: RwLock::new(NotificationConfig::default()),
            smtp,
            renderer: ReportRenderer::new(),
            rule_delay,
            maintenance_expr: maintenance_cron.trim().to_string(),
            maintenance,
            maintenance_active: AtomicBool::new(false),
        })
    }

    pub fn from_config(rules: RuleRunner, config: &Config) -> Result<Self, SchedulerError> {
        Self::new(
            rules,
            config.smtp.clone(),
            config.workflow.rule_delay(),
            &config.workflow.maintenance_cron,
        )
    }

    pub fn rules(&self) -> &RuleRunner {
        &self.rules
    }

    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    // ── Triggers ──────────────────────────────────────────────

    /// Start a run, or fail with [`SchedulerError::Busy`] if one is in progress.
    pub async fn fire(
        &self,
        trigger: Trigger,
        source: TriggerSource,
    ) -> Result<TriggerOutcome, SchedulerError> {
        let run = self.begin(&trigger, source)?;
        Ok(run.finish(self.execute(&run.permit, trigger)).await)
    }

    pub async fn trigger_rule(
        &self,
        id: RuleId,
        source: TriggerSource,
    ) -> Result<WorkflowResult, SchedulerError> {
        let run = self.begin(&Trigger::Rule(id), source)?;
        Ok(run.finish(self.run_rule(&run.permit, id)).await.result)
    }

    pub async fn trigger_group(
        &self,
        group: RuleGroup,
        source: TriggerSource,
    ) -> Result<GroupRun, SchedulerError> {
        let run = self.begin(&Trigger::Group(group), source)?;
        Ok(run.finish(self.run_group(&run.permit, group)).await)
    }

    /// Run the chain for a completed task on a background task.
    ///
    /// The permit is taken before this returns, so `Ok` means the chain will
    /// run. If another workflow is running the chain is skipped, not queued.
    pub fn spawn_task_completed(
        self: &Arc<Self>,
        task_type: String,
        source: TriggerSource,
    ) -> Result<JoinHandle<()>, SchedulerError> {
        let trigger = Trigger::TaskCompleted { task_type };
        let run = self.begin(&trigger, source)?;
        let scheduler = Arc::clone(self);
        Ok(tokio::spawn(async move {
            match run.finish(scheduler.execute(&run.permit, trigger)).await {
                TriggerOutcome::Chain(chain) if chain.aborted => {
                    warn!(task_type = %chain.task_type, "post-task rules stopped early")
                }
                _ => info!("post-task rules completed"),
            }
        }))
    }

    /// Take the run permit and open the run's span. Every entry point
    /// starts here.
    fn begin(&self, trigger: &Trigger, source: TriggerSource) -> Result<ActiveRun, SchedulerError> {
        let Some(permit) = self.gate.try_acquire() else {
            info!(%trigger, %source, "trigger rejected: another workflow is running");
            return Err(SchedulerError::Busy);
        };
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow_run", %run_id, %trigger, %source);
        span.in_scope(|| info!("workflow run started"));
        Ok(ActiveRun { permit, span })
    }

    async fn execute(&self, permit: &RunPermit, trigger: Trigger) -> TriggerOutcome {
        match trigger {
            Trigger::Rule(id) => TriggerOutcome::Rule(self.run_rule(permit, id).await),
            Trigger::Group(group) => TriggerOutcome::Group(self.run_group(permit, group).await),
            Trigger::TaskCompleted { task_type } => {
                TriggerOutcome::Chain(self.run_chain(permit, task_type).await)
            }
            Trigger::Maintenance => {
                info!("daily maintenance: cache cleanup only");
                TriggerOutcome::Rule(self.run_rule(permit, RuleId::CacheCleanup).await)
            }
        }
    }

    // ── Execution ─────────────────────────────────────────────

    async fn run_rule(&self, permit: &RunPermit, id: RuleId) -> RuleRun {
        let result = self.rules.run(id).await;
        self.store.record(permit, id.store_key(), result.clone());
        self.report(id, &result);
        RuleRun { rule: id, result }
    }

    async fn run_group(&self, permit: &RunPermit, group: RuleGroup) -> GroupRun {
        let mut results = IndexMap::new();
        for (i, &id) in group.rules().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.rule_delay).await;
            }
            let run = self.run_rule(permit, id).await;
            results.insert(id.store_key().to_string(), run.result);
        }
        let run = GroupRun::new(group, results);
        info!(
            group = %group,
            enforced = run.all_rules_enforced,
            verdict = %run.verdict(),
            "rule group finished"
        );
        run
    }

    /// Run a task chain. A panicking rule stops the chain; the permit is
    /// still released when the run ends.
    async fn run_chain(&self, permit: &RunPermit, task_type: String) -> ChainRun {
        let chain = task_chain(&task_type);
        info!(task_type = %task_type, rules = chain.len(), "running post-task rules");

        let mut results = IndexMap::new();
        let mut aborted = false;
        for (i, &id) in chain.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.rule_delay).await;
            }
            match AssertUnwindSafe(self.run_rule(permit, id)).catch_unwind().await {
                Ok(run) => {
                    results.insert(id.store_key().to_string(), run.result);
                }
                Err(_) => {
                    error!(rule = %id, task_type = %task_type, "rule panicked; stopping chain");
                    aborted = true;
                    break;
                }
            }
        }

        ChainRun {
            task_type,
            results,
            aborted,
        }
    }

    /// Log the result and hand it to the configured channels.
    ///
    /// Delivery runs on its own task; failures there are logged only.
    fn report(&self, id: RuleId, result: &WorkflowResult) {
        let key = id.store_key();
        info!(
            workflow = key,
            rule = %id,
            verdict = %result.verdict,
            duration_ms = result.duration,
            issues = result.issues.len(),
            "workflow result"
        );

        let dispatcher = Dispatcher::from_settings(&self.notifications(), &self.smtp);
        if dispatcher.is_empty() {
            return;
        }

        let title = self
            .rules
            .catalog()
            .get(id)
            .map(|d| d.title.as_str())
            .unwrap_or(id.slug());
        let notification = match self.renderer.render(&ReportContext::new(key, title, result)) {
            Ok(n) => n,
            Err(e) => {
                warn!(workflow = key, error = %e, "failed to render notification");
                return;
            }
        };

        tokio::spawn(async move {
            let results = dispatcher.dispatch(key, &notification).await;
            let failed = results.iter().filter(|r| !r.success).count();
            debug!(workflow = key, channels = results.len(), failed, "notification dispatch finished");
        });
    }

    // ── Maintenance loop ──────────────────────────────────────

    /// Start the daily maintenance loop on a background task.
    pub fn spawn_maintenance(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.maintenance_loop().await })
    }

    async fn maintenance_loop(&self) {
        self.maintenance_active.store(true, Ordering::Release);
        info!(cron = %self.maintenance_expr, "maintenance schedule active (UTC)");

        let mut last_tick = None;
        loop {
            let now = Utc::now();
            // Never fire the same tick twice if the clock lags the timer.
            let after = last_tick.map_or(now, |t: DateTime<Utc>| t.max(now));
            let Some(tick) = cron::next_tick(&self.maintenance, after) else {
                warn!(cron = %self.maintenance_expr, "maintenance schedule has no upcoming tick");
                break;
            };
            debug!(next = %tick, "next maintenance run");
            tokio::time::sleep(cron::until(tick, now)).await;
            last_tick = Some(tick);
            self.maintenance_tick().await;
        }

        self.maintenance_active.store(false, Ordering::Release);
    }

    /// One cron tick. A busy scheduler skips the tick.
    pub(crate) async fn maintenance_tick(&self) -> Option<TriggerOutcome> {
        match self.fire(Trigger::Maintenance, TriggerSource::Cron).await {
            Ok(outcome) => Some(outcome),
            Err(SchedulerError::Busy) => {
                info!("skipping daily maintenance: workflow is running");
                None
            }
            Err(e) => {
                warn!(error = %e, "daily maintenance failed to start");
                None
            }
        }
    }

    // ── Reads & settings ──────────────────────────────────────

    /// Snapshot of the scheduler. Never changes state.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            is_running: self.is_running(),
            last_results: self.store.snapshot(),
            scheduler_active: self.maintenance_active.load(Ordering::Acquire),
            schedules: Schedules {
                maintenance: self.maintenance_expr.clone(),
                next_maintenance: cron::next_tick(&self.maintenance, Utc::now())
                    .map(|t| t.to_rfc3339()),
                task_triggered: "after task completion",
            },
            notifications: self.notifications().masked(),
        }
    }

    pub fn results(&self) -> BTreeMap<String, WorkflowResult> {
        self.store.snapshot()
    }

    pub fn results_summary(&self) -> ResultsSummary {
        self.store.summary()
    }

    pub fn notifications(&self) -> NotificationConfig {
        self.notifications
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Merge `update` into the notification settings. Channels missing from
    /// `update` are kept; blank values clear a channel.
    pub fn set_notifications(&self, update: NotificationConfig) -> MaskedNotificationConfig {
        let masked = {
            let mut current = self.notifications.write().unwrap_or_else(|e| e.into_inner());
            *current = std::mem::take(&mut *current).merged(update);
            current.masked()
        };
        info!(
            email = masked.email,
            webhook = masked.webhook_url,
            slack = masked.slack_webhook,
            "notification settings updated"
        );
        masked
    }

    /// Acknowledge a stop request. Running commands are not cancelled.
    pub fn request_stop(&self) -> bool {
        let running = self.is_running();
        warn!(running, "stop requested; in-flight workflows cannot be cancelled and will run to completion");
        running
    }
}
