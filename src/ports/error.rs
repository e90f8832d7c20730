use thiserror::Error;

/// Failure of a market-data or execution collaborator.
///
/// Never a statistical condition: the engine propagates these to the
/// scheduler and leaves its state untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid data from collaborator: {0}")]
    InvalidData(String),
}
