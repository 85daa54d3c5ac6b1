//! Workflow scheduler: single-run coordination of rule runs.
//!
//! This crate provides:
//! - `RunGate` / `RunPermit`: the process-wide "one workflow at a time" guard
//! - `ResultStore`: last result per rule, writable only by the permit holder
//! - `Trigger`: every way a run can start (HTTP, cron, task hooks, CLI)
//! - `WorkflowScheduler`: fires triggers, records results, hands them to the notifier
//! - cron helpers for the daily maintenance loop

pub mod cron;
pub mod error;
pub mod permit;
pub mod scheduler;
pub mod store;
pub mod trigger;

pub use error::SchedulerError;
pub use permit::{RunGate, RunPermit};
pub use scheduler::{SchedulerStatus, Schedules, WorkflowScheduler};
pub use store::{ResultStore, ResultsSummary};
pub use trigger::{ChainRun, GroupRun, GroupSummary, RuleRun, Trigger, TriggerOutcome, TriggerSource};
