//! Store Client
//!
//! Narrow interfaces to a Kubernetes-style API store, as used by the manifest
//! applier: object GET/CREATE/PATCH against any resource collection, and type
//! discovery.
//!
//! # Example
//!
//! ```no_run
//! use store_client::{DiscoverySource, KubeStoreClient, StoreClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeStoreClient::try_default().await?;
//!
//! // List every served resource type
//! let groups = client.server_resources().await?;
//! let endpoint = groups
//!     .iter()
//!     .flat_map(|g| g.endpoints())
//!     .find(|e| e.kind == "ConfigMap")
//!     .expect("core group is always served");
//!
//! // Fetch an object through the resolved endpoint
//! let object = client.get(&endpoint, Some("kube-system"), "kube-root-ca.crt").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **test-util**: `MockStoreClient` and `MockDiscovery` for unit tests

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeStoreClient;
pub use error::StoreError;
pub use models::*;
pub use store_trait::{DiscoverySource, StoreClientTrait};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockDiscovery, MockStoreClient, StoreAction, StoreVerb};
