//! Manifest Applier
//!
//! Applies every manifest under `MANIFEST_DIR` to the cluster. Manifests whose
//! types are not yet served (for example custom resources whose definitions
//! are in the same directory) are retried with fresh discovery until they
//! resolve or the deadline passes.

mod config;
mod error;

use crate::config::ApplierConfig;
use crate::error::ApplierError;
use manifest_apply::ensure_manifests_created;
use std::sync::Arc;
use store_client::KubeStoreClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube's rustls-tls feature needs a process-wide provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| ApplierError::Tls(format!("failed to install ring crypto provider: {e:?}")))?;

    info!("Starting Manifest Applier");

    let config = ApplierConfig::from_env()?;
    info!("Configuration:");
    info!("  Manifest dir: {}", config.manifest_dir.display());
    info!("  Prefix filter: {}", config.prefix.as_deref().unwrap_or("none"));
    info!("  Update existing: {}", config.update);
    info!("  Timeout: {:?}", config.timeout);

    let client = kube::Client::try_default().await.map_err(ApplierError::from)?;
    let store = Arc::new(KubeStoreClient::new(client));

    match ensure_manifests_created(
        &config.manifest_dir,
        store.clone(),
        store,
        config.apply_options(),
        config.timeout,
    )
    .await
    {
        Ok(summary) => {
            info!(
                "Applied {} manifest(s) in {} round(s): {} created, {} patched, {} unchanged",
                summary.applied(),
                summary.rounds,
                summary.created,
                summary.patched,
                summary.unchanged
            );
            Ok(())
        }
        Err(e) => {
            error!("Manifest application failed: {}", e);
            Err(e.into())
        }
    }
}
