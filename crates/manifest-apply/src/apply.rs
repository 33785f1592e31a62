//! Apply engine.
//!
//! Decides, for one manifest and its resolved endpoint, whether to create the
//! object, leave it alone, or patch a small allow-listed set of fields. The
//! engine makes at most one write per call and never retries.

use crate::error::ApplyError;
use crate::manifest::Manifest;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use store_client::{ResourceEndpoint, StoreClientTrait, StoreError};
use tracing::{debug, info};

/// Top-level attribute paths eligible for patch-based update.
///
/// Everything else in an existing object belongs to whoever manages it.
pub const PATCHABLE_PATHS: &[&[&str]] = &[&["spec", "managementState"], &["status", "observedGeneration"]];

/// Successful result of one apply attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Unchanged,
    Patched,
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::Created => write!(f, "Created"),
            ApplyOutcome::Unchanged => write!(f, "Unchanged"),
            ApplyOutcome::Patched => write!(f, "Patched"),
        }
    }
}

fn value_at<'a>(object: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(object, |node, key| node.get(*key))
}

fn insert_at(target: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = target;
    for key in parents {
        let child = node
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        let Value::Object(map) = child else {
            return;
        };
        node = map;
    }
    node.insert((*last).to_string(), value);
}

/// Build a merge patch carrying the allow-listed paths whose desired value
/// differs from the live one. Paths the manifest does not set are ignored.
/// Returns `None` when nothing differs.
pub fn compute_patch(desired: &Value, live: &Value) -> Option<Value> {
    let mut patch = Map::new();
    for path in PATCHABLE_PATHS {
        let Some(want) = value_at(desired, path) else {
            continue;
        };
        // A merge patch null removes the key, so null and absent are the same state
        let have = value_at(live, path).unwrap_or(&Value::Null);
        if have != want {
            insert_at(&mut patch, path, want.clone());
        }
    }
    (!patch.is_empty()).then_some(Value::Object(patch))
}

/// Applies single manifests against a store
#[derive(Clone)]
pub struct ApplyEngine {
    store: Arc<dyn StoreClientTrait>,
    update: bool,
}

impl fmt::Debug for ApplyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyEngine")
            .field("update", &self.update)
            .finish_non_exhaustive()
    }
}

impl ApplyEngine {
    /// `update` allows patching allow-listed fields of existing objects
    pub fn new(store: Arc<dyn StoreClientTrait>, update: bool) -> Self {
        Self { store, update }
    }

    /// Ensure `manifest` exists at `endpoint`.
    ///
    /// 1. GET the object; NotFound → CREATE it with the full attribute tree
    /// 2. Exists and update is off → `Unchanged`
    /// 3. Exists and update is on → PATCH only the differing allow-listed paths, if any
    pub async fn apply(&self, manifest: &Manifest, endpoint: &ResourceEndpoint) -> Result<ApplyOutcome, ApplyError> {
        let namespace = manifest.namespace();
        let resource = || manifest.resource_string(endpoint);

        let existing = match self.store.get(endpoint, namespace, &manifest.name).await {
            Ok(existing) => existing,
            Err(StoreError::NotFound(_)) => {
                self.store
                    .create(endpoint, namespace, &manifest.object)
                    .await
                    .map_err(|source| ApplyError::Create {
                        resource: resource(),
                        source,
                    })?;
                info!("Created {} from {}", resource(), manifest.path);
                return Ok(ApplyOutcome::Created);
            }
            Err(source) => {
                return Err(ApplyError::Get {
                    resource: resource(),
                    source,
                });
            }
        };

        if !self.update {
            debug!("{} already exists, leaving it untouched", resource());
            return Ok(ApplyOutcome::Unchanged);
        }

        let Some(patch) = compute_patch(&manifest.object, &existing) else {
            debug!("{} already up-to-date", resource());
            return Ok(ApplyOutcome::Unchanged);
        };

        self.store
            .patch(endpoint, namespace, &manifest.name, &patch)
            .await
            .map_err(|source| ApplyError::Patch {
                resource: resource(),
                source,
            })?;
        info!("Patched {} with {}", resource(), patch);
        Ok(ApplyOutcome::Patched)
    }
}
