//! Helpers shared by the mock implementations

use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mock's state, recovering the data if a panicking test poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply a JSON merge patch (RFC 7386) to `target` in place
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// `metadata.name` of an object, if set
pub(crate) fn object_name(object: &Value) -> Option<&str> {
    object.pointer("/metadata/name").and_then(Value::as_str)
}

/// `metadata.namespace` of an object, if set
pub(crate) fn object_namespace(object: &Value) -> Option<&str> {
    object.pointer("/metadata/namespace").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_nested() {
        let mut target = json!({
            "spec": {"managementState": "Managed", "replicas": 3},
            "status": {"observedGeneration": 1}
        });
        merge_patch(&mut target, &json!({"status": {"observedGeneration": 2}}));
        assert_eq!(
            target,
            json!({
                "spec": {"managementState": "Managed", "replicas": 3},
                "status": {"observedGeneration": 2}
            })
        );
    }

    #[test]
    fn test_merge_patch_null_removes_key() {
        let mut target = json!({"spec": {"a": 1, "b": 2}});
        merge_patch(&mut target, &json!({"spec": {"a": null}}));
        assert_eq!(target, json!({"spec": {"b": 2}}));
    }

    #[test]
    fn test_merge_patch_creates_missing_objects() {
        let mut target = json!({"metadata": {"name": "x"}});
        merge_patch(&mut target, &json!({"status": {"observedGeneration": 2}}));
        assert_eq!(target["status"]["observedGeneration"], 2);
    }
}
