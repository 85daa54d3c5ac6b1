//! Rule identifiers and rule groups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The fixed set of automated checks the scheduler knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    UiTest,
    AiVerification,
    CacheCleanup,
    AutoFix,
    ArchitectureCheck,
    FullSuite,
}

impl RuleId {
    pub const ALL: [RuleId; 6] = [
        RuleId::UiTest,
        RuleId::AiVerification,
        RuleId::CacheCleanup,
        RuleId::AutoFix,
        RuleId::ArchitectureCheck,
        RuleId::FullSuite,
    ];

    /// Route slug used by the trigger API.
    pub fn slug(&self) -> &'static str {
        match self {
            RuleId::UiTest => "ui-test",
            RuleId::AiVerification => "ai-verification",
            RuleId::CacheCleanup => "cache-cleanup",
            RuleId::AutoFix => "auto-fix",
            RuleId::ArchitectureCheck => "architecture-check",
            RuleId::FullSuite => "full-suite",
        }
    }

    /// Key the rule's last result is stored under.
    pub fn store_key(&self) -> &'static str {
        match self {
            RuleId::UiTest => "rule1",
            RuleId::AiVerification => "rule2",
            RuleId::CacheCleanup => "rule3",
            RuleId::AutoFix => "rule4",
            RuleId::ArchitectureCheck => "ruleX",
            RuleId::FullSuite => "comprehensive",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RuleId {
    type Err = CoreError;

    /// Accepts either the route slug (`cache-cleanup`) or the store key (`rule3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RuleId::ALL
            .into_iter()
            .find(|id| id.slug() == s || id.store_key() == s)
            .ok_or_else(|| CoreError::UnknownRule(s.to_string()))
    }
}

/// Named, ordered aggregate runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleGroup {
    /// Every individual check, in declaration order.
    Comprehensive,
    /// Every rule including the full test suite, cleanup first.
    Emergency,
}

impl RuleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleGroup::Comprehensive => "comprehensive",
            RuleGroup::Emergency => "emergency",
        }
    }

    /// Rules run by this group, in execution order.
    pub fn rules(&self) -> &'static [RuleId] {
        match self {
            RuleGroup::Comprehensive => &[
                RuleId::UiTest,
                RuleId::AiVerification,
                RuleId::CacheCleanup,
                RuleId::AutoFix,
                RuleId::ArchitectureCheck,
            ],
            RuleGroup::Emergency => &[
                RuleId::CacheCleanup,
                RuleId::UiTest,
                RuleId::AiVerification,
                RuleId::AutoFix,
                RuleId::ArchitectureCheck,
                RuleId::FullSuite,
            ],
        }
    }
}

impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleGroup {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "comprehensive" => Ok(RuleGroup::Comprehensive),
            "emergency" => Ok(RuleGroup::Emergency),
            other => Err(CoreError::UnknownGroup(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slug_and_store_key() {
        assert_eq!("cache-cleanup".parse::<RuleId>().unwrap(), RuleId::CacheCleanup);
        assert_eq!("rule3".parse::<RuleId>().unwrap(), RuleId::CacheCleanup);
        assert_eq!("ruleX".parse::<RuleId>().unwrap(), RuleId::ArchitectureCheck);
    }

    #[test]
    fn unknown_rule_is_error() {
        let err = "rule9".parse::<RuleId>().unwrap_err();
        assert_eq!(err, CoreError::UnknownRule("rule9".to_string()));
    }

    #[test]
    fn store_keys_are_unique() {
        let mut keys: Vec<_> = RuleId::ALL.iter().map(|r| r.store_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), RuleId::ALL.len());
    }

    #[test]
    fn emergency_runs_every_rule() {
        let mut rules = RuleGroup::Emergency.rules().to_vec();
        rules.sort();
        let mut all = RuleId::ALL.to_vec();
        all.sort();
        assert_eq!(rules, all);
    }

    #[test]
    fn comprehensive_excludes_full_suite() {
        assert!(!RuleGroup::Comprehensive.rules().contains(&RuleId::FullSuite));
        assert_eq!(RuleGroup::Comprehensive.rules().len(), 5);
    }

    #[test]
    fn rule_id_serializes_as_slug() {
        let json = serde_json::to_string(&RuleId::ArchitectureCheck).unwrap();
        assert_eq!(json, "\"architecture-check\"");
    }
}
