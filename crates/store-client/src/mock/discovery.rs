//! Mock discovery source

use super::helpers::lock;
use crate::error::StoreError;
use crate::models::ApiGroupResources;
use crate::store_trait::DiscoverySource;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock discovery source for testing
///
/// Serves a mutable list of API groups. Groups can be scheduled to appear on a
/// later call to model a type registry that catches up while the applier runs.
#[derive(Clone, Default)]
pub struct MockDiscovery {
    groups: Arc<Mutex<Vec<ApiGroupResources>>>,
    // (call number from which the group is served, group)
    pending: Arc<Mutex<Vec<(usize, ApiGroupResources)>>>,
    failure: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDiscovery")
            .field("groups", &lock(&self.groups).len())
            .field("calls", &self.calls())
            .finish()
    }
}

impl MockDiscovery {
    pub fn new(groups: Vec<ApiGroupResources>) -> Self {
        Self {
            groups: Arc::new(Mutex::new(groups)),
            ..Default::default()
        }
    }

    pub fn set_groups(&self, groups: Vec<ApiGroupResources>) {
        *lock(&self.groups) = groups;
    }

    pub fn add_group(&self, group: ApiGroupResources) {
        lock(&self.groups).push(group);
    }

    /// Serve `group` starting with the `call`-th call (1-based)
    pub fn reveal_on_call(&self, call: usize, group: ApiGroupResources) {
        lock(&self.pending).push((call, group));
    }

    /// Make every call fail until `clear_failure` is called
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    pub fn clear_failure(&self) {
        *lock(&self.failure) = None;
    }

    /// Number of `server_resources` calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DiscoverySource for MockDiscovery {
    async fn server_resources(&self) -> Result<Vec<ApiGroupResources>, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let mut pending = lock(&self.pending);
        let (due, later): (Vec<_>, Vec<_>) = pending.drain(..).partition(|(from, _)| *from <= call);
        *pending = later;
        drop(pending);
        lock(&self.groups).extend(due.into_iter().map(|(_, group)| group));

        if let Some(message) = lock(&self.failure).clone() {
            return Err(StoreError::Discovery(message));
        }
        Ok(lock(&self.groups).clone())
    }
}
