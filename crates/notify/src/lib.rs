//! Delivery of workflow reports.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - Email (SMTP), webhook and Slack notifier implementations
//! - Minijinja rendering of per-verdict report subjects and bodies
//! - `Dispatcher` that fans a report out to every configured channel

pub mod dispatcher;
pub mod email;
pub mod report;
pub mod slack;
pub mod traits;
pub mod webhook;

pub use dispatcher::Dispatcher;
pub use report::{ReportContext, ReportRenderer};
pub use traits::{DispatchResult, Notification, Notifier, NotifyError};
