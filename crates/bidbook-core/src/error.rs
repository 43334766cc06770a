// Error taxonomy for ledger operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Every failure a ledger operation can report. A failed operation never
/// leaves a partial write behind: the enclosing transaction is rolled back
/// before the error reaches the caller.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A required field was missing, zero, or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Duplicate team name, or a delete blocked by a live reference.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("team {team_id} has {available} remaining, cannot pay {requested}")]
    InsufficientFunds {
        team_id: i64,
        available: i64,
        requested: i64,
    },

    /// The entity exists but is in the wrong settlement state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl LedgerError {
    /// Machine-readable error kind, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InvalidState(_) => "invalid_state",
            LedgerError::Store(_) => "internal",
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        LedgerError::NotFound { entity, id }
    }
}

/// Reject an id or amount that is zero, negative, or absent. Zero is never a
/// valid id or price.
pub fn require_positive(field: &str, value: Option<i64>) -> Result<i64> {
    match value {
        Some(v) if v > 0 => Ok(v),
        Some(v) => Err(LedgerError::Validation(format!(
            "`{field}` must be greater than 0, got {v}"
        ))),
        None => Err(LedgerError::Validation(format!("missing required field `{field}`"))),
    }
}

pub(crate) fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(format!("`{field}` must not be empty")));
    }
    Ok(trimmed)
}
