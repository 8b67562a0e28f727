use std::collections::BTreeMap;
use std::sync::Arc;

use crate::coordinator::LockCoordinator;
use crate::endpoint::Endpoint;

/// Prefix under which every coordinator's rpc path lives.
pub const LOCK_RPC_PREFIX: &str = "/awsomefs/lock";

/// Rpc path of the coordinator governing `endpoint` (host part dropped).
pub fn lock_rpc_path(endpoint: &Endpoint) -> String {
    let path = endpoint.path().trim_matches('/');
    if path.is_empty() {
        LOCK_RPC_PREFIX.to_string()
    } else {
        format!("{}/{}", LOCK_RPC_PREFIX, path)
    }
}

/// One lock coordinator per locally owned, non-ignored disk, keyed by rpc path.
#[derive(Debug, Default)]
pub struct CoordinatorRegistry {
    coordinators: BTreeMap<String, Arc<LockCoordinator>>,
}

impl CoordinatorRegistry {
    pub fn from_endpoints<S: AsRef<str>>(
        disks: &[Endpoint],
        ignored: &[Endpoint],
        local_hosts: &[S],
    ) -> Self {
        let mut registry = Self::default();
        for disk in disks {
            if ignored.iter().any(|skip| skip.as_str() == disk.as_str()) {
                tracing::debug!("Skipping ignored disk {}", disk);
                continue;
            }
            if !disk.is_local(local_hosts) {
                continue;
            }
            let rpc_path = lock_rpc_path(disk);
            if registry.coordinators.contains_key(&rpc_path) {
                tracing::warn!("Disk {} maps to an already registered rpc path {}", disk, rpc_path);
                continue;
            }
            registry
                .coordinators
                .insert(rpc_path.clone(), Arc::new(LockCoordinator::new(rpc_path)));
        }
        registry
    }

    pub fn insert(&mut self, coordinator: LockCoordinator) {
        self.coordinators
            .insert(coordinator.rpc_path().to_string(), Arc::new(coordinator));
    }

    pub fn get(&self, rpc_path: &str) -> Option<Arc<LockCoordinator>> {
        self.coordinators.get(rpc_path).cloned()
    }

    pub fn rpc_paths(&self) -> impl Iterator<Item = &str> {
        self.coordinators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }
}
