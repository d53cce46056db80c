use thiserror::Error;

/// Failure surface of the transactional store collaborator.
///
/// These are transport/transaction failures, not business rejections: the
/// cells roll back and surface them as-is, without internal retries.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("transaction serialization failure: {0}")]
    Serialization(String),

    #[error("store state corrupted: {0}")]
    Corrupted(String),
}
