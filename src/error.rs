use thiserror::Error;

/// Errors returned by ledger operations.
///
/// Every failure leaves the ledger exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid content")]
    InvalidContent,

    #[error("Invalid category")]
    InvalidCategory,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Thought not found: {0}")]
    NotFound(u64),

    #[error("Poisoned Lock")]
    Poisoned,

    #[error("Record IDs exhausted")]
    IdsExhausted,

    #[error("snapshot serialization failed: {0}")]
    Snapshot(String),

    #[error("snapshot archive failed validation")]
    CorruptSnapshot,
}

impl LedgerError {
    /// Stable short code used on the wire and in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidContent => "invalid_content",
            LedgerError::InvalidCategory => "invalid_category",
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Poisoned
            | LedgerError::IdsExhausted
            | LedgerError::Snapshot(_)
            | LedgerError::CorruptSnapshot => "internal",
        }
    }
}
