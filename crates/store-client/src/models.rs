//! Store and discovery data models
//!
//! Identifies resource types (group/version/kind), the collection a type is
//! served from, and the raw discovery documents the resolver is built from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Group, version and kind of a resource type
///
/// The core API group is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Build from an `apiVersion` string (`group/version` or bare `version`) and a kind
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
        Self::new(group, version, kind)
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Whether objects of a type live inside a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// The collection a resource type is served from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceEndpoint {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural resource name, e.g. `configmaps`
    pub plural: String,
    pub scope: Scope,
}

impl ResourceEndpoint {
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceEndpoint {
    /// `plural.version.group`, e.g. `customresourcedefinitions.v1.apiextensions.k8s.io`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}.{}", self.plural, self.version)
        } else {
            write!(f, "{}.{}.{}", self.plural, self.version, self.group)
        }
    }
}

/// One resource type as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResourceInfo {
    /// Plural resource name
    pub name: String,
    pub kind: String,
    pub namespaced: bool,
}

impl ApiResourceInfo {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, namespaced: bool) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            namespaced,
        }
    }
}

/// All resources served by one API group, keyed by version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiGroupResources {
    /// Group name, empty for the core group
    pub name: String,
    pub preferred_version: String,
    pub versions: BTreeMap<String, Vec<ApiResourceInfo>>,
}

impl ApiGroupResources {
    /// A group serving a single version
    pub fn single_version(
        name: impl Into<String>,
        version: impl Into<String>,
        resources: Vec<ApiResourceInfo>,
    ) -> Self {
        let version = version.into();
        let mut versions = BTreeMap::new();
        versions.insert(version.clone(), resources);
        Self {
            name: name.into(),
            preferred_version: version,
            versions,
        }
    }

    /// Flatten into one endpoint per (version, resource)
    pub fn endpoints(&self) -> impl Iterator<Item = ResourceEndpoint> + '_ {
        self.versions.iter().flat_map(move |(version, resources)| {
            resources.iter().map(move |r| ResourceEndpoint {
                group: self.name.clone(),
                version: version.clone(),
                kind: r.kind.clone(),
                plural: r.name.clone(),
                scope: if r.namespaced { Scope::Namespaced } else { Scope::Cluster },
            })
        })
    }
}
