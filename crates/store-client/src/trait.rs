//! Store and discovery traits
//!
//! These traits abstract the cluster API so the applier can run against
//! `KubeStoreClient` in production and the in-memory mocks in unit tests.

use crate::error::StoreError;
use crate::models::{ApiGroupResources, ResourceEndpoint};
use serde_json::Value;

/// Object CRUD against an arbitrary resource collection
///
/// `namespace` is ignored for cluster-scoped endpoints.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait StoreClientTrait: Send + Sync {
    /// Fetch an object by name. Returns `StoreError::NotFound` if it does not exist.
    async fn get(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str) -> Result<Value, StoreError>;

    /// Create an object from its full attribute tree
    async fn create(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, object: &Value) -> Result<Value, StoreError>;

    /// Apply a JSON merge patch to an existing object
    async fn patch(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str, patch: &Value) -> Result<Value, StoreError>;
}

/// Source of the set of resource types the store currently serves
#[async_trait::async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Every group with all of its served versions and resources
    async fn server_resources(&self) -> Result<Vec<ApiGroupResources>, StoreError>;
}
