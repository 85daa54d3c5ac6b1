//! [`RuleRunner`]: executes one rule and produces its [`WorkflowResult`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use caseflow_core::{RuleId, WorkflowResult};
use tracing::{debug, info, warn};

use crate::catalog::RuleCatalog;
use crate::command::{CommandOutput, CommandRunner};
use crate::definition::{Evaluation, Probe};
use crate::evaluate::{self, Assessment, ProbeResult};

/// Runs rules from a catalog through a [`CommandRunner`].
///
/// `run` never fails: spawn errors, timeouts and non-zero exits are folded
/// into a `CRITICAL` result carrying the failure message.
#[derive(Clone)]
pub struct RuleRunner {
    catalog: Arc<RuleCatalog>,
    commands: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl RuleRunner {
    pub fn new(catalog: Arc<RuleCatalog>, commands: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self {
            catalog,
            commands,
            timeout,
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(&self, id: RuleId) -> WorkflowResult {
        let start = Instant::now();

        let Some(def) = self.catalog.get(id) else {
            warn!(rule = %id, "no definition for rule");
            return WorkflowResult::failed(format!("No definition for rule {id}"), start.elapsed());
        };

        debug!(rule = %id, kind = def.evaluation.kind(), "running rule");

        let assessment = match &def.evaluation {
            Evaluation::PassRate {
                command,
                threshold,
                perfect,
            } => self
                .run_single(command)
                .await
                .map(|out| evaluate::assess_pass_rate(&out, *threshold, *perfect)),
            Evaluation::Score {
                command,
                field,
                threshold,
                perfect,
            } => self
                .run_single(command)
                .await
                .map(|out| evaluate::assess_score(&out, field, *threshold, *perfect)),
            Evaluation::AutoFix { command } => self
                .run_single(command)
                .await
                .map(|out| evaluate::assess_auto_fix(&out)),
            Evaluation::ReportedVerdict { command } => self
                .run_single(command)
                .await
                .map(|out| evaluate::assess_reported_verdict(&out)),
            Evaluation::Probes {
                probes,
                tolerated_issues,
            } => Ok(evaluate::assess_probes(
                &self.run_probes(probes).await,
                *tolerated_issues,
            )),
        };

        let result = match assessment {
            Ok(assessment) => into_result(assessment, start.elapsed()),
            Err(message) => {
                warn!(rule = %id, error = %message, "rule execution failed");
                WorkflowResult::failed(message, start.elapsed())
            }
        };

        info!(
            rule = %id,
            verdict = %result.verdict,
            enforced = result.all_rules_enforced,
            duration_ms = result.duration,
            issues = result.issues.len(),
            "rule finished"
        );
        result
    }

    /// Run a report-producing command. Anything but a zero exit is an
    /// execution failure.
    async fn run_single(&self, command: &str) -> Result<CommandOutput, String> {
        match self.commands.run(command, self.timeout).await {
            Ok(out) if out.success() => Ok(out),
            Ok(out) => Err(out.failure_message()),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn run_probes(&self, probes: &[Probe]) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(probes.len());
        for probe in probes {
            let result = match self.commands.run(&probe.command, self.timeout).await {
                Ok(out) => ProbeResult::from_output(probe, &out),
                Err(e) => ProbeResult::errored(probe, e),
            };
            debug!(probe = %result.name, passed = result.passed, "probe finished");
            results.push(result);
        }
        results
    }
}

fn into_result(assessment: Assessment, elapsed: Duration) -> WorkflowResult {
    let verdict = assessment.verdict();
    let mut result = WorkflowResult::from_outcome(assessment.outcome, elapsed);
    result.verdict = verdict;
    result
}
