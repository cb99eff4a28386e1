use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid corner {input:?}: {reason}")]
    InvalidCorner { input: String, reason: String },

    #[error("invalid claim id: {0:?}")]
    InvalidClaimId(String),

    #[error("invalid player id: {0:?}")]
    InvalidPlayerId(String),
}
