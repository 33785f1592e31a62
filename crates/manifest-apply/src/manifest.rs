//! Manifest loading.
//!
//! A manifest is one decoded object document plus the identity the applier
//! needs: its type, name, namespace and the path it was loaded from.

use crate::error::ManifestError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store_client::{GroupVersionKind, ResourceEndpoint};
use tracing::debug;
use walkdir::WalkDir;

/// Predicate over a manifest file path; a file is loaded only if every predicate accepts it
pub type FilePredicate = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Accept files whose name starts with `prefix`
pub fn has_prefix(prefix: impl Into<String>) -> FilePredicate {
    let prefix = prefix.into();
    Arc::new(move |path: &Path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix))
    })
}

/// One declarative object to be ensured present in the store
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Path relative to the manifest directory
    pub path: String,
    pub gvk: GroupVersionKind,
    pub name: String,
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    /// Full attribute tree as decoded from the source document
    pub object: Value,
}

impl Manifest {
    /// Build a manifest from a decoded document
    pub fn from_value(path: impl Into<String>, object: Value) -> Result<Self, ManifestError> {
        let path = path.into();
        let missing = |field| ManifestError::MissingField {
            path: PathBuf::from(&path),
            field,
        };

        let api_version = object
            .get("apiVersion")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| missing("apiVersion"))?;
        let kind = object
            .get("kind")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing("kind"))?;
        let name = object
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| missing("metadata.name"))?
            .to_string();
        let namespace = object
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);

        Ok(Self {
            gvk: GroupVersionKind::from_api_version(api_version, kind),
            path,
            name,
            namespace,
            object,
        })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Human readable target, e.g. `configmaps.v1/settings -n apps`
    pub fn resource_string(&self, endpoint: &ResourceEndpoint) -> String {
        match self.namespace() {
            Some(ns) if endpoint.is_namespaced() => format!("{endpoint}/{} -n {ns}", self.name),
            _ => format!("{endpoint}/{}", self.name),
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ManifestError + '_ {
    move |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Collect regular files under `dir`.
///
/// Directory symlinks are not descended into; symlinks to regular files are kept.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ManifestError::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;
        let file_type = entry.file_type();
        if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Load every manifest under `dir` that passes all `filters`, sorted by relative path
pub fn load(dir: &Path, filters: &[FilePredicate]) -> Result<Vec<Manifest>, ManifestError> {
    let mut files = collect_files(dir)?;
    files.sort();

    let mut manifests = Vec::new();
    for file in files {
        if !filters.iter().all(|accept| accept(&file)) {
            debug!("Skipping {} (filtered)", file.display());
            continue;
        }
        let content = fs::read_to_string(&file).map_err(io_error(&file))?;
        let object: Value = serde_yaml::from_str(&content).map_err(|source| ManifestError::Decode {
            path: file.clone(),
            source,
        })?;
        let relative = file.strip_prefix(dir).unwrap_or(&file).to_string_lossy().into_owned();
        manifests.push(Manifest::from_value(relative, object)?);
    }

    debug!("Loaded {} manifests from {}", manifests.len(), dir.display());
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn testdata() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
    }

    #[test]
    fn test_load_all_manifests() {
        let manifests = load(&testdata(), &[]).unwrap();
        assert_eq!(manifests.len(), 5);

        let paths: Vec<_> = manifests.iter().map(|m| m.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted, "manifests should be in path order");

        let crd = &manifests[0];
        assert_eq!(crd.gvk.kind, "CustomResourceDefinition");
        assert_eq!(crd.gvk.group, "apiextensions.k8s.io");
        assert_eq!(crd.namespace, None);
    }

    #[test]
    fn test_load_with_prefix_filter() {
        let manifests = load(&testdata(), &[has_prefix("00")]).unwrap();
        assert_eq!(manifests.len(), 2);
        assert!(manifests.iter().all(|m| m.path.starts_with("00")));
    }

    #[test]
    fn test_load_missing_dir_is_io_error() {
        let err = load(Path::new("does-not-exist"), &[]).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }), "got {err:?}");
    }

    #[test]
    fn test_load_recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(
            nested.join("cm.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: nested\n  namespace: apps\n",
        )
        .unwrap();

        let manifests = load(dir.path(), &[]).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].path, Path::new("nested").join("cm.yaml").to_string_lossy());
        assert_eq!(manifests[0].namespace(), Some("apps"));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_does_not_follow_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ns.yaml"), "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: apps\n").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let manifests = load(dir.path(), &[]).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].path, "ns.yaml");
    }

    #[cfg(unix)]
    #[test]
    fn test_load_reads_symlinked_files() {
        let source = tempfile::tempdir().unwrap();
        let target = source.path().join("cm.yaml");
        fs::write(&target, "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: linked\n").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("10_cm.yaml")).unwrap();

        let manifests = load(dir.path(), &[]).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].name, "linked");
    }

    #[test]
    fn test_load_invalid_yaml_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.yaml"), "kind: [unterminated\n").unwrap();
        let err = load(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, ManifestError::Decode { .. }), "got {err:?}");
    }

    #[test]
    fn test_from_value_requires_name() {
        let err = Manifest::from_value("cm.yaml", json!({"apiVersion": "v1", "kind": "ConfigMap"})).unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { field: "metadata.name", .. }));
    }

    #[test]
    fn test_from_value_empty_namespace_is_cluster_scoped() {
        let manifest = Manifest::from_value(
            "ns.yaml",
            json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": "apps", "namespace": ""}}),
        )
        .unwrap();
        assert_eq!(manifest.namespace(), None);
        assert_eq!(manifest.gvk, GroupVersionKind::new("", "v1", "Namespace"));
    }
}
