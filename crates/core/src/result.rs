//! Workflow run results and verdict classification.
//!
//! A [`WorkflowResult`] is produced once per rule run and never mutated
//! afterwards. Its [`Verdict`] is derived from a normalized [`RuleOutcome`]
//! so every rule, whatever its own report format, is classified the same way.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Coarse outcome classification of a rule run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Perfect,
    Good,
    IssuesFixed,
    Critical,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Perfect => "PERFECT",
            Verdict::Good => "GOOD",
            Verdict::IssuesFixed => "ISSUES_FIXED",
            Verdict::Critical => "CRITICAL",
        }
    }

    /// Map a free-form verdict label reported by a test suite.
    ///
    /// Unknown labels (including `"UNKNOWN"`) classify as [`Verdict::Critical`].
    pub fn from_reported(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "PERFECT" | "EXCELLENT" => Verdict::Perfect,
            "GOOD" | "VERY_GOOD" => Verdict::Good,
            "FAIR" | "NEEDS_IMPROVEMENT" | "ISSUES_FIXED" => Verdict::IssuesFixed,
            _ => Verdict::Critical,
        }
    }

    /// Classify a normalized rule outcome.
    ///
    /// - enforced, no issues, maximal score: `PERFECT`
    /// - enforced otherwise: `GOOD`
    /// - not enforced but at least one fix applied: `ISSUES_FIXED`
    /// - anything else: `CRITICAL`
    pub fn derive(outcome: &RuleOutcome) -> Self {
        if outcome.enforced {
            if outcome.issues.is_empty() && outcome.maximal {
                Verdict::Perfect
            } else {
                Verdict::Good
            }
        } else if outcome.fixes_applied > 0 {
            Verdict::IssuesFixed
        } else {
            Verdict::Critical
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized view of what a rule's command reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    /// Rule-specific success flag copied into the result.
    pub success: bool,
    /// Whether the rule's own threshold was met.
    pub enforced: bool,
    /// Whether the rule reached its best possible score.
    pub maximal: bool,
    pub issues: Vec<String>,
    /// Remediations the rule reports having applied.
    pub fixes_applied: u32,
}

/// Outcome of a single rule run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub success: bool,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
    pub all_rules_enforced: bool,
    pub issues: Vec<String>,
    /// ISO 8601 completion time.
    pub timestamp: String,
    pub verdict: Verdict,
}

impl WorkflowResult {
    /// Build a result from a normalized outcome.
    pub fn from_outcome(outcome: RuleOutcome, duration: Duration) -> Self {
        let verdict = Verdict::derive(&outcome);
        Self {
            success: outcome.success,
            duration: duration.as_millis() as u64,
            all_rules_enforced: outcome.enforced,
            issues: outcome.issues,
            timestamp: now_rfc3339(),
            verdict,
        }
    }

    /// Build the `CRITICAL` result for a run that could not execute.
    pub fn failed(message: impl Into<String>, duration: Duration) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Rule execution failed".to_string()
        } else {
            message
        };
        Self {
            success: false,
            duration: duration.as_millis() as u64,
            all_rules_enforced: false,
            issues: vec![message],
            timestamp: now_rfc3339(),
            verdict: Verdict::Critical,
        }
    }

    /// Completion time as Unix milliseconds, if the timestamp parses.
    pub fn timestamp_millis(&self) -> Option<i64> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.timestamp_millis())
    }
}

/// Current time formatted like `2026-01-15T10:00:01.123Z`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
