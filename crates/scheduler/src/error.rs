/// Errors surfaced to callers of the scheduler.
///
/// Rule failures are not errors: they are folded into the result's verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Another workflow is currently running. Please wait.")]
    Busy,

    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}
