//! Turning command output into a normalized [`RuleOutcome`].
//!
//! Each single-command evaluation parses stdout as a JSON report. When the
//! report does not parse, a default report is used whose only issue is the
//! command's stderr (or `"Parse error"` when stderr is empty), so a broken
//! report still yields a classified result instead of an error.

use caseflow_core::{RuleOutcome, Verdict};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::command::CommandOutput;
use crate::definition::Probe;

const PARSE_ERROR: &str = "Parse error";

/// Outcome of a rule plus, for suites that grade themselves, the verdict
/// they reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub outcome: RuleOutcome,
    pub reported_verdict: Option<Verdict>,
}

impl From<RuleOutcome> for Assessment {
    fn from(outcome: RuleOutcome) -> Self {
        Self {
            outcome,
            reported_verdict: None,
        }
    }
}

impl Assessment {
    pub fn verdict(&self) -> Verdict {
        self.reported_verdict
            .unwrap_or_else(|| Verdict::derive(&self.outcome))
    }
}

fn fallback_issues(output: &CommandOutput) -> Vec<String> {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        vec![PARSE_ERROR.to_string()]
    } else {
        vec![stderr.to_string()]
    }
}

/// Parse a report, or `None` when stdout is not the expected JSON.
fn parse_report<T: DeserializeOwned>(output: &CommandOutput) -> Option<T> {
    match serde_json::from_str(output.stdout.trim()) {
        Ok(report) => Some(report),
        Err(e) => {
            debug!(error = %e, "rule output is not a JSON report, using fallback");
            None
        }
    }
}

// ── pass_rate ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PassRateReport {
    passed: u64,
    failed: u64,
    issues: Vec<String>,
}

/// Rounded percentage of passing tests; 0 when nothing ran.
pub fn pass_rate(passed: u64, failed: u64) -> u32 {
    // Counts come from the script; summing them as u64 could overflow.
    let total = passed as f64 + failed as f64;
    if total == 0.0 {
        return 0;
    }
    ((passed as f64 / total) * 100.0).round() as u32
}

pub fn assess_pass_rate(output: &CommandOutput, threshold: u32, perfect: u32) -> Assessment {
    let report = parse_report::<PassRateReport>(output).unwrap_or_else(|| PassRateReport {
        issues: fallback_issues(output),
        ..Default::default()
    });
    let rate = pass_rate(report.passed, report.failed);
    let enforced = rate >= threshold;
    RuleOutcome {
        success: enforced,
        enforced,
        maximal: rate >= perfect,
        issues: report.issues,
        fixes_applied: 0,
    }
    .into()
}

// ── score ─────────────────────────────────────────────────────

pub fn assess_score(output: &CommandOutput, field: &str, threshold: f64, perfect: f64) -> Assessment {
    let (score, issues) = match parse_report::<Value>(output).filter(Value::is_object) {
        Some(report) => {
            let score = report.get(field).and_then(Value::as_f64).unwrap_or(0.0);
            let issues = report
                .get("issues")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            (score, issues)
        }
        None => (0.0, fallback_issues(output)),
    };
    let enforced = score >= threshold;
    RuleOutcome {
        success: enforced,
        enforced,
        maximal: score >= perfect,
        issues,
        fixes_applied: 0,
    }
    .into()
}

// ── auto_fix ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AutoFixReport {
    success: bool,
    fixes_applied: u32,
    issues: Vec<String>,
}

pub fn assess_auto_fix(output: &CommandOutput) -> Assessment {
    let report = parse_report::<AutoFixReport>(output).unwrap_or_else(|| AutoFixReport {
        issues: fallback_issues(output),
        ..Default::default()
    });
    RuleOutcome {
        success: report.success,
        enforced: report.success,
        maximal: true,
        issues: report.issues,
        fixes_applied: report.fixes_applied,
    }
    .into()
}

// ── reported_verdict ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VerdictReport {
    all_rules_enforced: bool,
    final_verdict: String,
    fixes_applied: u32,
    issues: Vec<String>,
}

impl Default for VerdictReport {
    fn default() -> Self {
        Self {
            all_rules_enforced: false,
            final_verdict: "UNKNOWN".to_string(),
            fixes_applied: 0,
            issues: Vec::new(),
        }
    }
}

pub fn assess_reported_verdict(output: &CommandOutput) -> Assessment {
    let report = parse_report::<VerdictReport>(output).unwrap_or_else(|| VerdictReport {
        issues: fallback_issues(output),
        ..Default::default()
    });
    let verdict = Verdict::from_reported(&report.final_verdict);
    Assessment {
        outcome: RuleOutcome {
            success: report.all_rules_enforced,
            enforced: report.all_rules_enforced,
            maximal: verdict == Verdict::Perfect,
            issues: report.issues,
            fixes_applied: report.fixes_applied,
        },
        reported_verdict: Some(verdict),
    }
}

// ── probes ────────────────────────────────────────────────────

/// Result of running one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub name: String,
    pub passed: bool,
    /// Present when the probe failed.
    pub issue: Option<String>,
}

impl ProbeResult {
    /// Judge a probe that ran to completion.
    pub fn from_output(probe: &Probe, output: &CommandOutput) -> Self {
        let passed = output.success() && probe.matches(&output.stdout);
        Self {
            name: probe.name.clone(),
            passed,
            issue: (!passed).then(|| probe.issue.clone()),
        }
    }

    /// A probe whose command could not be run at all.
    pub fn errored(probe: &Probe, error: impl std::fmt::Display) -> Self {
        Self {
            name: probe.name.clone(),
            passed: false,
            issue: Some(format!("{}: {}", probe.issue, error)),
        }
    }
}

pub fn assess_probes(results: &[ProbeResult], tolerated_issues: usize) -> Assessment {
    let issues: Vec<String> = results.iter().filter_map(|r| r.issue.clone()).collect();
    let passed = results.iter().filter(|r| r.passed).count();
    RuleOutcome {
        success: true,
        enforced: issues.len() <= tolerated_issues,
        maximal: issues.is_empty(),
        fixes_applied: passed as u32,
        issues,
    }
    .into()
}
