//! Rule definitions: what a rule runs and how its output is judged.

use caseflow_core::{RuleId, WorkflowResult};
use serde::{Deserialize, Serialize};

/// A single automated check, described entirely as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: RuleId,
    /// Human-readable name used in logs and notifications.
    pub title: String,
    pub alerts: AlertCodes,
    pub evaluation: Evaluation,
}

impl RuleDefinition {
    pub fn alert_code(&self, result: &WorkflowResult) -> &str {
        self.alerts.for_result(result)
    }
}

/// Informational codes attached to trigger responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCodes {
    pub pass: String,
    pub fail: String,
}

impl AlertCodes {
    pub fn new(pass: &str, fail: &str) -> Self {
        Self {
            pass: pass.to_string(),
            fail: fail.to_string(),
        }
    }

    pub fn for_result(&self, result: &WorkflowResult) -> &str {
        if result.success {
            &self.pass
        } else {
            &self.fail
        }
    }
}

/// How a rule's command output is turned into an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evaluation {
    /// Stdout reports `{passed, failed, issues}`; the rounded pass rate
    /// (percent) is compared against the thresholds.
    PassRate {
        command: String,
        threshold: u32,
        #[serde(default = "default_perfect_rate")]
        perfect: u32,
    },
    /// Stdout reports a numeric score under `field`.
    Score {
        command: String,
        field: String,
        threshold: f64,
        perfect: f64,
    },
    /// Stdout reports `{success, fixesApplied, issues}`.
    AutoFix { command: String },
    /// Stdout reports `{allRulesEnforced, finalVerdict, fixesApplied?, issues}`.
    ReportedVerdict { command: String },
    /// A sequence of shell probes, each contributing one issue on failure.
    Probes {
        probes: Vec<Probe>,
        #[serde(default = "default_tolerated_issues")]
        tolerated_issues: usize,
    },
}

fn default_perfect_rate() -> u32 {
    100
}

fn default_tolerated_issues() -> usize {
    2
}

impl Evaluation {
    pub fn kind(&self) -> &'static str {
        match self {
            Evaluation::PassRate { .. } => "pass_rate",
            Evaluation::Score { .. } => "score",
            Evaluation::AutoFix { .. } => "auto_fix",
            Evaluation::ReportedVerdict { .. } => "reported_verdict",
            Evaluation::Probes { .. } => "probes",
        }
    }

    /// Commands this evaluation runs, in order.
    pub fn commands(&self) -> Vec<&str> {
        match self {
            Evaluation::PassRate { command, .. }
            | Evaluation::Score { command, .. }
            | Evaluation::AutoFix { command }
            | Evaluation::ReportedVerdict { command } => vec![command.as_str()],
            Evaluation::Probes { probes, .. } => probes.iter().map(|p| p.command.as_str()).collect(),
        }
    }
}

/// One shell check inside a probe rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub name: String,
    pub command: String,
    /// Markers of which at least one must appear in stdout. Empty means
    /// a zero exit status is enough.
    #[serde(default)]
    pub expect: Vec<String>,
    /// Markers that fail the probe when present, even if `expect` matched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reject: Vec<String>,
    /// Issue reported when the probe fails.
    pub issue: String,
}

impl Probe {
    pub fn new(name: &str, command: &str, expect: &[&str], issue: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            expect: expect.iter().map(|s| s.to_string()).collect(),
            reject: Vec::new(),
            issue: issue.to_string(),
        }
    }

    pub fn rejecting(mut self, markers: &[&str]) -> Self {
        self.reject = markers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether captured stdout has an expected marker and no rejected one.
    pub fn matches(&self, stdout: &str) -> bool {
        let expected =
            self.expect.is_empty() || self.expect.iter().any(|m| stdout.contains(m.as_str()));
        expected && !self.reject.iter().any(|m| stdout.contains(m.as_str()))
    }
}
