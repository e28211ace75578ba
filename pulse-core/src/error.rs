use thiserror::Error;

/// Errors returned by the productivity engine and its storage contract.
///
/// The engine never logs or formats user-facing messages; callers translate
/// these variants into whatever their transport needs.
#[derive(Debug, Error)]
pub enum Error {
    /// The record does not exist or is not owned by the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input that cannot be normalized or violates a model constraint.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
