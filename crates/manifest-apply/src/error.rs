//! Applier error types.
//!
//! Errors are split by the stage that produces them: loading manifests from
//! disk, resolving a kind to its endpoint, applying one manifest, and the run
//! as a whole.

use crate::manifest::Manifest;
use std::path::PathBuf;
use store_client::{GroupVersionKind, StoreError};
use thiserror::Error;

/// Errors raised while loading manifests from a directory
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Directory or file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid YAML/JSON
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Document lacks a field every object needs
    #[error("{} is missing required field {field}", .path.display())]
    MissingField { path: PathBuf, field: &'static str },
}

/// The resolver has no endpoint for a kind
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Discovery does not serve this kind in this group version (yet)
    #[error("no matches for kind {kind:?} in version {api_version:?}")]
    NoMatch { kind: String, api_version: String },
}

/// Why one attempt to apply one manifest failed
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Kind is not (yet) known to discovery; triggers a reload before the next round
    #[error("unable to get REST mapping for {path:?}: {source}")]
    TypeNotResolved {
        path: String,
        #[source]
        source: ResolveError,
    },

    #[error("failed to get {resource}: {source}")]
    Get {
        resource: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to create {resource}: {source}")]
    Create {
        resource: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to patch {resource}: {source}")]
    Patch {
        resource: String,
        #[source]
        source: StoreError,
    },

    /// The run deadline passed while a store call was in flight
    #[error("deadline exceeded while applying {path:?}")]
    DeadlineExceeded { path: String },
}

impl ApplyError {
    pub fn is_type_not_resolved(&self) -> bool {
        matches!(self, ApplyError::TypeNotResolved { .. })
    }
}

/// Errors that end a whole run
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Load(#[from] ManifestError),

    /// The deadline elapsed with manifests still unapplied
    #[error("timed out waiting for {remaining} manifest(s) to be applied: {last}")]
    DeadlineExceeded { remaining: usize, last: String },
}

/// A run that ended with a non-empty retry set
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    /// Manifests that never reached a successful outcome, in source order
    pub remaining: Vec<Manifest>,
    /// Whether the last round asked for a discovery reload
    pub needs_reload: bool,
    #[source]
    pub error: ReconcileError,
}

impl ResolveError {
    pub fn no_match(gvk: &GroupVersionKind) -> Self {
        ResolveError::NoMatch {
            kind: gvk.kind.clone(),
            api_version: gvk.api_version(),
        }
    }
}
