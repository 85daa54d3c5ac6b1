use std::sync::Arc;

use caseflow_scheduler::WorkflowScheduler;

/// Shared handler state.
pub struct AppState {
    pub scheduler: Arc<WorkflowScheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<WorkflowScheduler>) -> Self {
        Self { scheduler }
    }
}
