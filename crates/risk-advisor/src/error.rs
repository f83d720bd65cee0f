//! Error Types for the Risk Advisor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiskError>;

#[derive(Error, Debug)]
pub enum RiskError {
    /// Snapshot is malformed or incomplete
    #[error("Invalid snapshot: {0}")]
    Validation(String),

    /// Internal failure while deriving metrics or recommendations
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RiskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Whether the caller sent a bad snapshot (as opposed to an engine fault)
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("The portfolio snapshot is invalid: {msg}"),
            Self::Evaluation(_) => "The risk engine could not evaluate this portfolio.".into(),
            Self::Config(_) => "Risk rules are misconfigured.".into(),
            Self::Serialization(_) => "The request could not be decoded.".into(),
        }
    }
}
