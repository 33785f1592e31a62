//! Manifest Apply
//!
//! Ensures a directory of declarative manifests exists in a Kubernetes-style
//! API store. Objects that are missing are created; objects that exist are left
//! alone, or have a small allow-listed set of fields patched when updates are
//! enabled.
//!
//! Manifests may define new types for later manifests in the same batch (a
//! CustomResourceDefinition and its custom resources). Kinds discovery does not
//! serve yet are retried in later rounds after the type mapping is reloaded,
//! until everything is applied or the deadline passes.
//!
//! # Example
//!
//! ```no_run
//! use manifest_apply::{ensure_manifests_created, has_prefix, ApplyOptions};
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use store_client::KubeStoreClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(KubeStoreClient::try_default().await?);
//! let options = ApplyOptions {
//!     verbose: true,
//!     filters: vec![has_prefix("00")],
//!     ..Default::default()
//! };
//! let summary = ensure_manifests_created(
//!     Path::new("manifests"),
//!     client.clone(),
//!     client,
//!     options,
//!     Duration::from_secs(300),
//! )
//! .await?;
//! println!("{} manifests applied", summary.applied());
//! # Ok(())
//! # }
//! ```

pub mod apply;
pub mod error;
pub mod manifest;
pub mod options;
pub mod reconcile;
pub mod resolver;

pub use apply::{compute_patch, ApplyEngine, ApplyOutcome, PATCHABLE_PATHS};
pub use error::{ApplyError, ManifestError, ReconcileError, ResolveError, RunFailure};
pub use manifest::{has_prefix, load, FilePredicate, Manifest};
pub use options::{ApplyOptions, OutputSink, DEFAULT_RETRY_INTERVAL};
pub use reconcile::{ensure_manifests_created, Reconciler, RunSummary, SweepReport};
pub use resolver::TypeResolver;
