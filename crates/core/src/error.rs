use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Unknown rule group: {0}")]
    UnknownGroup(String),
}
