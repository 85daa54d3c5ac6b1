//! HTTP API endpoint modules.

pub mod doc;
mod health;
mod workflows;

pub use health::health;
pub use workflows::workflows_router;
