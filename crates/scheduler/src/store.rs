//! [`ResultStore`]: the most recent result per rule.
//!
//! Process-local and lost on restart. Reads take a snapshot and may happen
//! while a run is in progress; writes require the [`RunPermit`] of the gate
//! the store was created with.

use std::collections::BTreeMap;
use std::sync::RwLock;

use caseflow_core::{Verdict, WorkflowResult};
use serde::Serialize;
use tracing::warn;

use crate::permit::{RunGate, RunPermit};

#[derive(Debug)]
pub struct ResultStore {
    gate: RunGate,
    results: RwLock<BTreeMap<String, WorkflowResult>>,
}

/// Aggregate view over the stored results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub total_workflows: usize,
    pub successful_workflows: usize,
    pub critical_workflows: usize,
    /// Latest result timestamp as Unix milliseconds, 0 when empty.
    pub last_activity: i64,
}

impl ResultStore {
    pub fn new(gate: RunGate) -> Self {
        Self {
            gate,
            results: RwLock::new(BTreeMap::new()),
        }
    }

    /// Overwrite the result stored under `key`.
    ///
    /// Returns `false` (and stores nothing) when `permit` was issued by a
    /// different gate.
    pub fn record(&self, permit: &RunPermit, key: &str, result: WorkflowResult) -> bool {
        if !permit.belongs_to(&self.gate) {
            warn!(key, "refusing store write from a foreign run permit");
            return false;
        }
        let mut results = self.results.write().unwrap_or_else(|e| e.into_inner());
        results.insert(key.to_string(), result);
        true
    }

    pub fn get(&self, key: &str) -> Option<WorkflowResult> {
        self.read().get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, WorkflowResult> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn summary(&self) -> ResultsSummary {
        summarize(&self.read())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, WorkflowResult>> {
        self.results.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn summarize(results: &BTreeMap<String, WorkflowResult>) -> ResultsSummary {
    ResultsSummary {
        total_workflows: results.len(),
        successful_workflows: results.values().filter(|r| r.success).count(),
        critical_workflows: results
            .values()
            .filter(|r| r.verdict == Verdict::Critical)
            .count(),
        last_activity: results
            .values()
            .filter_map(WorkflowResult::timestamp_millis)
            .max()
            .unwrap_or(0),
    }
}
