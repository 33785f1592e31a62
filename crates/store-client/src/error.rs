//! Store client errors

use thiserror::Error;

/// Errors that can occur when talking to the object store or its discovery API
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object already exists (create raced with another writer)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The API server rejected the request (validation, conflict, forbidden...)
    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// Transport or client-side failure
    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Type discovery failed
    #[error("Discovery failed: {0}")]
    Discovery(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
