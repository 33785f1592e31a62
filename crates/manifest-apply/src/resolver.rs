//! Type resolver.
//!
//! Caches the (group, version, kind) → endpoint mapping built from discovery.
//! The mapping is only ever replaced wholesale: `refresh` holds the write lock
//! across the discovery call and swaps in the new mapping on success, so a
//! `resolve` never sees a half-built table.

use crate::error::ResolveError;
use std::collections::HashMap;
use std::sync::Arc;
use store_client::{DiscoverySource, GroupVersionKind, ResourceEndpoint, StoreError};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Mapping {
    loaded: bool,
    endpoints: HashMap<GroupVersionKind, ResourceEndpoint>,
    // group name → preferred version
    preferred: HashMap<String, String>,
}

/// Maps resource kinds to the collections they are served from
pub struct TypeResolver {
    discovery: Arc<dyn DiscoverySource>,
    mapping: RwLock<Mapping>,
}

impl std::fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeResolver").finish_non_exhaustive()
    }
}

impl TypeResolver {
    /// Create a resolver with an empty mapping; call `refresh` before resolving
    pub fn new(discovery: Arc<dyn DiscoverySource>) -> Self {
        Self {
            discovery,
            mapping: RwLock::new(Mapping::default()),
        }
    }

    /// Whether at least one refresh has succeeded
    pub async fn is_loaded(&self) -> bool {
        self.mapping.read().await.loaded
    }

    /// Look up the endpoint for a kind. An empty version selects the group's preferred version.
    pub async fn resolve(&self, gvk: &GroupVersionKind) -> Result<ResourceEndpoint, ResolveError> {
        let mapping = self.mapping.read().await;
        let lookup;
        let key = if gvk.version.is_empty() {
            let version = mapping
                .preferred
                .get(&gvk.group)
                .ok_or_else(|| ResolveError::no_match(gvk))?;
            lookup = GroupVersionKind::new(gvk.group.clone(), version.clone(), gvk.kind.clone());
            &lookup
        } else {
            gvk
        };
        mapping
            .endpoints
            .get(key)
            .cloned()
            .ok_or_else(|| ResolveError::no_match(gvk))
    }

    /// Rebuild the mapping from discovery and return the number of known kinds.
    ///
    /// On error the previous mapping is kept.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let mut mapping = self.mapping.write().await;
        let groups = self.discovery.server_resources().await?;

        let mut rebuilt = Mapping {
            loaded: true,
            ..Default::default()
        };
        for group in &groups {
            rebuilt
                .preferred
                .insert(group.name.clone(), group.preferred_version.clone());
            for endpoint in group.endpoints() {
                let gvk = GroupVersionKind::new(endpoint.group.clone(), endpoint.version.clone(), endpoint.kind.clone());
                rebuilt.endpoints.entry(gvk).or_insert(endpoint);
            }
        }

        let count = rebuilt.endpoints.len();
        *mapping = rebuilt;
        if count == 0 {
            debug!("Discovery returned no resource types");
        } else {
            info!("Refreshed type mapping: {} kinds across {} groups", count, groups.len());
        }
        Ok(count)
    }
}
