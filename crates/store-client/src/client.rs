//! kube-rs backed store client
//!
//! Talks to a Kubernetes API server through `DynamicObject`, so any resource
//! type (including freshly registered custom resources) can be read, created
//! and patched once discovery knows about it.

use crate::error::StoreError;
use crate::models::{ApiGroupResources, ApiResourceInfo, ResourceEndpoint};
use crate::store_trait::{DiscoverySource, StoreClientTrait};
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams, PostParams};
use kube::discovery::{Discovery, Scope as KubeScope};
use kube::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Store client over a live Kubernetes API server
#[derive(Clone)]
pub struct KubeStoreClient {
    client: Client,
}

impl std::fmt::Debug for KubeStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStoreClient").finish_non_exhaustive()
    }
}

impl KubeStoreClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the ambient kubeconfig or in-cluster service account
    pub async fn try_default() -> Result<Self, StoreError> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn api(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&endpoint.group, &endpoint.version, &endpoint.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &endpoint.plural);
        match namespace {
            Some(ns) if endpoint.is_namespaced() => Api::namespaced_with(self.client.clone(), ns, &resource),
            _ => Api::all_with(self.client.clone(), &resource),
        }
    }
}

/// Map API status codes onto the error kinds the applier distinguishes
fn map_kube_error(err: kube::Error, what: &str) -> StoreError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound(what.to_string()),
        kube::Error::Api(ae) if ae.code == 409 => StoreError::AlreadyExists(what.to_string()),
        kube::Error::Api(ae) => StoreError::Api {
            code: ae.code,
            message: ae.message.clone(),
        },
        other => StoreError::Kube(other),
    }
}

fn describe(endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if endpoint.is_namespaced() => format!("{endpoint} {ns}/{name}"),
        _ => format!("{endpoint} {name}"),
    }
}

#[async_trait::async_trait]
impl StoreClientTrait for KubeStoreClient {
    async fn get(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str) -> Result<Value, StoreError> {
        debug!("GET {}", describe(endpoint, namespace, name));
        let object = self
            .api(endpoint, namespace)
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, &describe(endpoint, namespace, name)))?;
        Ok(serde_json::to_value(object)?)
    }

    async fn create(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, object: &Value) -> Result<Value, StoreError> {
        let dynamic: DynamicObject = serde_json::from_value(object.clone())?;
        let name = dynamic.metadata.name.clone().unwrap_or_default();
        debug!("CREATE {}", describe(endpoint, namespace, &name));
        let created = self
            .api(endpoint, namespace)
            .create(&PostParams::default(), &dynamic)
            .await
            .map_err(|e| map_kube_error(e, &describe(endpoint, namespace, &name)))?;
        Ok(serde_json::to_value(created)?)
    }

    async fn patch(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str, patch: &Value) -> Result<Value, StoreError> {
        debug!("PATCH {} with {}", describe(endpoint, namespace, name), patch);
        let patched = self
            .api(endpoint, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| map_kube_error(e, &describe(endpoint, namespace, name)))?;
        Ok(serde_json::to_value(patched)?)
    }
}

#[async_trait::async_trait]
impl DiscoverySource for KubeStoreClient {
    async fn server_resources(&self) -> Result<Vec<ApiGroupResources>, StoreError> {
        let discovery = Discovery::new(self.client.clone())
            .run()
            .await
            .map_err(|e| StoreError::Discovery(e.to_string()))?;

        let mut groups = Vec::new();
        for group in discovery.groups() {
            let mut versions = BTreeMap::new();
            for version in group.versions() {
                let resources = group
                    .versioned_resources(version)
                    .into_iter()
                    .map(|(resource, caps)| {
                        ApiResourceInfo::new(resource.plural, resource.kind, matches!(caps.scope, KubeScope::Namespaced))
                    })
                    .collect::<Vec<_>>();
                versions.insert(version.to_string(), resources);
            }
            groups.push(ApiGroupResources {
                name: group.name().to_string(),
                preferred_version: group.preferred_version_or_latest().to_string(),
                versions,
            });
        }
        debug!("Discovered {} API groups", groups.len());
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scope;

    fn endpoint(plural: &str, scope: Scope) -> ResourceEndpoint {
        ResourceEndpoint {
            group: String::new(),
            version: "v1".to_string(),
            kind: String::new(),
            plural: plural.to_string(),
            scope,
        }
    }

    #[test]
    fn test_describe_namespaced_object() {
        let cm = endpoint("configmaps", Scope::Namespaced);
        assert_eq!(describe(&cm, Some("kube-system"), "ca"), "configmaps.v1 kube-system/ca");
        assert_eq!(describe(&cm, None, "ca"), "configmaps.v1 ca");
    }

    #[test]
    fn test_describe_ignores_namespace_for_cluster_scope() {
        let ns = endpoint("namespaces", Scope::Cluster);
        assert_eq!(describe(&ns, Some("ignored"), "openshift"), "namespaces.v1 openshift");
    }
}
