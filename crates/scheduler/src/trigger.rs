//! Triggers (what starts a run) and their outcomes.

use std::fmt;

use caseflow_core::{RuleGroup, RuleId, Verdict, WorkflowResult};
use indexmap::IndexMap;
use serde::Serialize;

/// Everything that can start a run goes through one entry point as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Rule(RuleId),
    Group(RuleGroup),
    /// A unit of development work finished; run the chain for its tag.
    TaskCompleted { task_type: String },
    /// Daily light maintenance (cache cleanup).
    Maintenance,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Rule(id) => write!(f, "rule:{id}"),
            Trigger::Group(group) => write!(f, "group:{group}"),
            Trigger::TaskCompleted { task_type } => write!(f, "task:{task_type}"),
            Trigger::Maintenance => f.write_str("maintenance"),
        }
    }
}

/// Where a trigger came from. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Http,
    Cron,
    TaskHook,
    Cli,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerSource::Http => "http",
            TriggerSource::Cron => "cron",
            TriggerSource::TaskHook => "task_hook",
            TriggerSource::Cli => "cli",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleRun {
    pub rule: RuleId,
    pub result: WorkflowResult,
}

/// Results of a group run keyed by store key, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRun {
    pub group: RuleGroup,
    pub results: IndexMap<String, WorkflowResult>,
    /// AND of every rule's `allRulesEnforced`.
    pub all_rules_enforced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub total_run: usize,
    pub all_passed: bool,
    pub critical_issues: usize,
}

impl GroupRun {
    pub fn new(group: RuleGroup, results: IndexMap<String, WorkflowResult>) -> Self {
        let all_rules_enforced = results.values().all(|r| r.all_rules_enforced);
        Self {
            group,
            results,
            all_rules_enforced,
        }
    }

    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            total_run: self.results.len(),
            all_passed: self.results.values().all(|r| r.success),
            critical_issues: self
                .results
                .values()
                .filter(|r| r.verdict == Verdict::Critical)
                .count(),
        }
    }

    /// Overall verdict: the worst verdict among the group's results.
    pub fn verdict(&self) -> Verdict {
        let rank = |v: &Verdict| match v {
            Verdict::Perfect => 0,
            Verdict::Good => 1,
            Verdict::IssuesFixed => 2,
            Verdict::Critical => 3,
        };
        self.results
            .values()
            .map(|r| r.verdict)
            .max_by_key(rank)
            .unwrap_or(Verdict::Critical)
    }
}

/// Results of a task-completion chain, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRun {
    pub task_type: String,
    pub results: IndexMap<String, WorkflowResult>,
    /// Set when a rule panicked and the rest of the chain was skipped.
    pub aborted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Rule(RuleRun),
    Group(GroupRun),
    Chain(ChainRun),
}

impl TriggerOutcome {
    /// Every result produced by the run, keyed by store key.
    pub fn results(&self) -> IndexMap<String, WorkflowResult> {
        match self {
            TriggerOutcome::Rule(run) => {
                IndexMap::from([(run.rule.store_key().to_string(), run.result.clone())])
            }
            TriggerOutcome::Group(run) => run.results.clone(),
            TriggerOutcome::Chain(run) => run.results.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_core::RuleOutcome;
    use std::time::Duration;

    fn result(enforced: bool, fixes: u32) -> WorkflowResult {
        WorkflowResult::from_outcome(
            RuleOutcome {
                success: enforced,
                enforced,
                maximal: true,
                issues: Vec::new(),
                fixes_applied: fixes,
            },
            Duration::ZERO,
        )
    }

    #[test]
    fn group_enforced_is_and_of_members() {
        let all = GroupRun::new(
            RuleGroup::Comprehensive,
            IndexMap::from([("rule1".to_string(), result(true, 0)), ("rule2".to_string(), result(true, 0))]),
        );
        assert!(all.all_rules_enforced);
        assert_eq!(all.verdict(), Verdict::Perfect);

        let one_short = GroupRun::new(
            RuleGroup::Comprehensive,
            IndexMap::from([("rule1".to_string(), result(true, 0)), ("rule4".to_string(), result(false, 2))]),
        );
        assert!(!one_short.all_rules_enforced);
        assert_eq!(one_short.verdict(), Verdict::IssuesFixed);
    }

    #[test]
    fn emergency_summary() {
        let run = GroupRun::new(
            RuleGroup::Emergency,
            IndexMap::from([
                ("rule3".to_string(), result(true, 0)),
                ("rule1".to_string(), result(false, 0)),
                ("rule4".to_string(), result(false, 1)),
            ]),
        );
        let summary = run.summary();
        assert_eq!(summary.total_run, 3);
        assert!(!summary.all_passed);
        assert_eq!(summary.critical_issues, 1);
        assert_eq!(run.verdict(), Verdict::Critical);
    }

    #[test]
    fn trigger_display() {
        assert_eq!(Trigger::Rule(RuleId::CacheCleanup).to_string(), "rule:cache-cleanup");
        assert_eq!(
            Trigger::TaskCompleted {
                task_type: "code_change".into()
            }
            .to_string(),
            "task:code_change"
        );
        assert_eq!(TriggerSource::TaskHook.to_string(), "task_hook");
    }
}
