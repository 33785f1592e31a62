//! Mock store and discovery clients for unit testing
//!
//! This module provides in-memory implementations of `StoreClientTrait` and
//! `DiscoverySource` that can be used in unit tests without a running API server.
//!
//! The mock is organized into:
//! - `mod.rs` - `MockStoreClient` (object storage, action recording, failure and delay injection)
//! - `discovery.rs` - `MockDiscovery` (mutable type registry)
//! - `helpers.rs` - merge patch and locking helpers

mod discovery;
mod helpers;

pub use discovery::MockDiscovery;

use crate::error::StoreError;
use crate::models::ResourceEndpoint;
use crate::store_trait::StoreClientTrait;
use helpers::{lock, merge_patch, object_name, object_namespace};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Kind of call made against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreVerb {
    Get,
    Create,
    Patch,
}

/// One recorded call against the mock store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreAction {
    pub verb: StoreVerb,
    /// Plural resource name of the endpoint
    pub resource: String,
    /// Namespace, only for namespaced endpoints
    pub namespace: Option<String>,
    pub name: String,
    /// Created object or patch body
    pub body: Option<Value>,
}

impl StoreAction {
    /// `resource/namespace/name` or `resource/name`
    pub fn path(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}/{}", self.resource, ns, self.name),
            None => format!("{}/{}", self.resource, self.name),
        }
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    verb: StoreVerb,
    name: Option<String>,
    code: u16,
    message: String,
}

type ObjectKey = (String, String, String, String);

/// Mock store client for testing
///
/// Stores objects in memory keyed by endpoint, namespace and name, records every
/// call, and can be told to fail specific calls.
#[derive(Clone, Default)]
pub struct MockStoreClient {
    pub(crate) objects: Arc<Mutex<BTreeMap<ObjectKey, Value>>>,
    pub(crate) actions: Arc<Mutex<Vec<StoreAction>>>,
    failures: Arc<Mutex<Vec<InjectedFailure>>>,
    delays: Arc<Mutex<Vec<(StoreVerb, Duration)>>>,
}

impl std::fmt::Debug for MockStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStoreClient")
            .field("objects", &lock(&self.objects).len())
            .field("actions", &lock(&self.actions).len())
            .finish()
    }
}

fn scoped_namespace<'a>(endpoint: &ResourceEndpoint, namespace: Option<&'a str>) -> Option<&'a str> {
    if endpoint.is_namespaced() { namespace } else { None }
}

fn object_key(endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str) -> ObjectKey {
    (
        endpoint.group.clone(),
        endpoint.plural.clone(),
        scoped_namespace(endpoint, namespace).unwrap_or_default().to_string(),
        name.to_string(),
    )
}

impl MockStoreClient {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing object (for test setup). Not recorded as an action.
    pub fn add_object(&self, endpoint: &ResourceEndpoint, object: Value) {
        let name = object_name(&object).unwrap_or_default().to_string();
        let key = object_key(endpoint, object_namespace(&object), &name);
        lock(&self.objects).insert(key, object);
    }

    /// Current stored state of an object
    pub fn object(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str) -> Option<Value> {
        lock(&self.objects).get(&object_key(endpoint, namespace, name)).cloned()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    /// Every call made so far, in order
    pub fn actions(&self) -> Vec<StoreAction> {
        lock(&self.actions).clone()
    }

    /// Calls of one verb, in order
    pub fn actions_of(&self, verb: StoreVerb) -> Vec<StoreAction> {
        lock(&self.actions).iter().filter(|a| a.verb == verb).cloned().collect()
    }

    pub fn clear_actions(&self) {
        lock(&self.actions).clear();
    }

    /// Make every `verb` call for `name` (or for any name when `None`) fail with an API error
    pub fn fail_on(&self, verb: StoreVerb, name: Option<&str>, code: u16, message: impl Into<String>) {
        lock(&self.failures).push(InjectedFailure {
            verb,
            name: name.map(str::to_string),
            code,
            message: message.into(),
        });
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Hold every `verb` call for `delay` before it is answered
    pub fn delay_on(&self, verb: StoreVerb, delay: Duration) {
        lock(&self.delays).push((verb, delay));
    }

    async fn injected_delay(&self, verb: StoreVerb) {
        let delay = lock(&self.delays).iter().find(|(v, _)| *v == verb).map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, verb: StoreVerb, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str, body: Option<&Value>) {
        lock(&self.actions).push(StoreAction {
            verb,
            resource: endpoint.plural.clone(),
            namespace: scoped_namespace(endpoint, namespace).map(str::to_string),
            name: name.to_string(),
            body: body.cloned(),
        });
    }

    fn injected_failure(&self, verb: StoreVerb, name: &str) -> Option<StoreError> {
        lock(&self.failures)
            .iter()
            .find(|f| f.verb == verb && f.name.as_deref().is_none_or(|n| n == name))
            .map(|f| StoreError::Api {
                code: f.code,
                message: f.message.clone(),
            })
    }
}

#[async_trait::async_trait]
impl StoreClientTrait for MockStoreClient {
    async fn get(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str) -> Result<Value, StoreError> {
        self.record(StoreVerb::Get, endpoint, namespace, name, None);
        self.injected_delay(StoreVerb::Get).await;
        if let Some(err) = self.injected_failure(StoreVerb::Get, name) {
            return Err(err);
        }
        self.object(endpoint, namespace, name)
            .ok_or_else(|| StoreError::NotFound(format!("{endpoint} \"{name}\" not found")))
    }

    async fn create(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, object: &Value) -> Result<Value, StoreError> {
        let name = object_name(object).unwrap_or_default().to_string();
        self.record(StoreVerb::Create, endpoint, namespace, &name, Some(object));
        self.injected_delay(StoreVerb::Create).await;
        if let Some(err) = self.injected_failure(StoreVerb::Create, &name) {
            return Err(err);
        }
        if name.is_empty() {
            return Err(StoreError::Api {
                code: 422,
                message: "metadata.name: Required value".to_string(),
            });
        }
        let key = object_key(endpoint, namespace, &name);
        let mut objects = lock(&self.objects);
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!("{endpoint} \"{name}\" already exists")));
        }
        objects.insert(key, object.clone());
        Ok(object.clone())
    }

    async fn patch(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str, patch: &Value) -> Result<Value, StoreError> {
        self.record(StoreVerb::Patch, endpoint, namespace, name, Some(patch));
        self.injected_delay(StoreVerb::Patch).await;
        if let Some(err) = self.injected_failure(StoreVerb::Patch, name) {
            return Err(err);
        }
        let mut objects = lock(&self.objects);
        let existing = objects
            .get_mut(&object_key(endpoint, namespace, name))
            .ok_or_else(|| StoreError::NotFound(format!("{endpoint} \"{name}\" not found")))?;
        merge_patch(existing, patch);
        Ok(existing.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scope;
    use serde_json::json;

    fn configmaps() -> ResourceEndpoint {
        ResourceEndpoint {
            group: String::new(),
            version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            plural: "configmaps".to_string(),
            scope: Scope::Namespaced,
        }
    }

    #[tokio::test]
    async fn test_get_missing_object_is_not_found() {
        let store = MockStoreClient::new();
        let err = store.get(&configmaps(), Some("default"), "missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.actions().len(), 1);
        assert_eq!(store.actions()[0].path(), "configmaps/default/missing");
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MockStoreClient::new();
        let object = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "settings", "namespace": "apps"},
            "data": {"key": "value"}
        });
        store.create(&configmaps(), Some("apps"), &object).await.unwrap();
        let fetched = store.get(&configmaps(), Some("apps"), "settings").await.unwrap();
        assert_eq!(fetched, object);

        let err = store.create(&configmaps(), Some("apps"), &object).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_patch_merges_into_existing() {
        let store = MockStoreClient::new();
        store.add_object(
            &configmaps(),
            json!({"metadata": {"name": "settings", "namespace": "apps"}, "data": {"a": "1"}}),
        );
        let patched = store
            .patch(&configmaps(), Some("apps"), "settings", &json!({"data": {"b": "2"}}))
            .await
            .unwrap();
        assert_eq!(patched["data"], json!({"a": "1", "b": "2"}));
        assert_eq!(store.actions_of(StoreVerb::Patch).len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_only_hits_named_object() {
        let store = MockStoreClient::new();
        store.fail_on(StoreVerb::Create, Some("bad"), 422, "invalid object");

        let bad = json!({"metadata": {"name": "bad", "namespace": "apps"}});
        let good = json!({"metadata": {"name": "good", "namespace": "apps"}});
        let err = store.create(&configmaps(), Some("apps"), &bad).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { code: 422, .. }));
        store.create(&configmaps(), Some("apps"), &good).await.unwrap();
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_delay_holds_only_matching_verb() {
        let store = MockStoreClient::new();
        store.delay_on(StoreVerb::Get, Duration::from_millis(50));

        let started = std::time::Instant::now();
        let object = json!({"metadata": {"name": "settings", "namespace": "apps"}});
        store.create(&configmaps(), Some("apps"), &object).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));

        store.get(&configmaps(), Some("apps"), "settings").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
