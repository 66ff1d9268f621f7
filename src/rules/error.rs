use thiserror::Error;

/// A business rule refused the operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("{0}")]
    Business(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Other records still reference the target
    #[error("{0}")]
    Dependents(String),
}

impl RuleViolation {
    pub fn business(message: impl Into<String>) -> Self {
        RuleViolation::Business(message.into())
    }

    pub fn dependents(message: impl Into<String>) -> Self {
        RuleViolation::Dependents(message.into())
    }
}
