//! [`RuleCatalog`]: the active rule definitions.
//!
//! Starts from the built-in set and optionally applies per-rule overrides
//! from a YAML file:
//!
//! ```yaml
//! rules:
//!   - id: architecture-check
//!     evaluation:
//!       type: score
//!       command: node verify.mjs architecture
//!       field: architectureScore
//!       threshold: 80
//!       perfect: 95
//!   - id: rule3
//!     title: Nightly cleanup
//! ```
//!
//! Fields left out of an override keep their built-in value.

mod builtin;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use caseflow_core::RuleId;
use serde::Deserialize;
use tracing::info;

use crate::definition::{AlertCodes, Evaluation, RuleDefinition};

pub use builtin::task_chain;

/// Errors loading a rule override file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error for rule '{rule}': {reason}")]
    Validation { rule: RuleId, reason: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    rules: Vec<RuleOverride>,
}

#[derive(Debug, Deserialize)]
struct RuleOverride {
    id: RuleIdRef,
    title: Option<String>,
    alerts: Option<AlertCodes>,
    evaluation: Option<Evaluation>,
}

/// Rule reference in YAML: accepts the slug or the store key.
#[derive(Debug)]
struct RuleIdRef(RuleId);

impl<'de> Deserialize<'de> for RuleIdRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map(RuleIdRef).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: BTreeMap<RuleId, RuleDefinition>,
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleCatalog {
    pub fn builtin() -> Self {
        let rules = RuleId::ALL
            .into_iter()
            .map(|id| (id, builtin::definition(id)))
            .collect();
        Self { rules }
    }

    /// Built-in rules with overrides from `path` applied.
    pub fn load(path: &Path) -> Result<Self> {
        let mut catalog = Self::builtin();
        let content = fs::read_to_string(path)?;
        let applied = catalog.apply_overrides(&content)?;
        info!(path = %path.display(), overrides = applied, "rule overrides loaded");
        Ok(catalog)
    }

    /// Apply overrides from YAML text. Either every override applies or none does.
    pub fn apply_overrides(&mut self, yaml: &str) -> Result<usize> {
        let file: OverrideFile = serde_yaml::from_str(yaml)?;
        let mut staged = self.rules.clone();

        for ov in &file.rules {
            let id = ov.id.0;
            let def = staged
                .entry(id)
                .or_insert_with(|| builtin::definition(id));
            if let Some(ref title) = ov.title {
                def.title = title.clone();
            }
            if let Some(ref alerts) = ov.alerts {
                def.alerts = alerts.clone();
            }
            if let Some(ref evaluation) = ov.evaluation {
                def.evaluation = evaluation.clone();
            }
            validate(def)?;
        }

        self.rules = staged;
        Ok(file.rules.len())
    }

    pub fn get(&self, id: RuleId) -> Option<&RuleDefinition> {
        self.rules.get(&id)
    }

    /// Definitions in `RuleId` declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn validate(def: &RuleDefinition) -> Result<()> {
    let fail = |reason: &str| -> Result<()> {
        Err(CatalogError::Validation {
            rule: def.id,
            reason: reason.to_string(),
        })
    };

    if def.title.trim().is_empty() {
        return fail("title must not be empty");
    }
    if def.evaluation.commands().iter().any(|c| c.trim().is_empty()) {
        return fail("commands must not be empty");
    }

    match &def.evaluation {
        Evaluation::PassRate {
            threshold, perfect, ..
        } => {
            if *threshold > 100 || *perfect > 100 {
                return fail("pass rate thresholds are percentages (0-100)");
            }
            if perfect < threshold {
                return fail("perfect must be at least threshold");
            }
        }
        Evaluation::Score {
            field,
            threshold,
            perfect,
            ..
        } => {
            if field.trim().is_empty() {
                return fail("score field must not be empty");
            }
            if perfect < threshold {
                return fail("perfect must be at least threshold");
            }
        }
        Evaluation::Probes { probes, .. } => {
            if probes.is_empty() {
                return fail("probe rules need at least one probe");
            }
        }
        Evaluation::AutoFix { .. } | Evaluation::ReportedVerdict { .. } => {}
    }
    Ok(())
}
