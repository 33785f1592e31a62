//! Applier-specific error types.
//!
//! Errors raised by the binary itself, outside the reconciliation library.

use thiserror::Error;

/// Errors that can occur while starting the manifest applier.
#[derive(Debug, Error)]
pub enum ApplierError {
    /// Invalid or missing configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not connect to the cluster
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// TLS crypto provider could not be installed
    #[error("TLS setup failed: {0}")]
    Tls(String),
}
