//! Rule definitions and the rule runner for the workflow scheduler.
//!
//! This crate provides:
//! - `RuleDefinition` / `Evaluation`: rules described as data (commands + thresholds)
//! - `RuleCatalog`: the built-in rule set with optional YAML overrides
//! - `CommandRunner`: the external process seam, with a `sh -c` implementation
//! - `RuleRunner`: executes a rule and normalizes its output into a `WorkflowResult`

pub mod catalog;
pub mod command;
pub mod definition;
pub mod evaluate;
pub mod runner;

pub use catalog::{task_chain, CatalogError, RuleCatalog};
pub use command::{CommandOutput, CommandRunner, RunError, ShellRunner};
pub use definition::{AlertCodes, Evaluation, Probe, RuleDefinition};
pub use evaluate::Assessment;
pub use runner::RuleRunner;
