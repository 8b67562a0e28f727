use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use lock_service::Endpoint;
use thiserror::Error;

pub mod format;
pub mod local;
pub mod remote;
pub mod service;

pub use format::{FormatDescriptor, FORMAT_RECORD_SIZE};
pub use local::LocalDisk;
pub use remote::{PeerAccess, RemoteDisk};
pub use service::{build_format_server, FormatRpcService};

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("disk not found")]
    DiskNotFound,
    #[error("unformatted disk found")]
    UnformattedDisk,
    #[error("corrupted backend format: {reason}")]
    CorruptedFormat { reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DiskError {
    pub fn corrupted(reason: impl Into<String>) -> Self {
        DiskError::CorruptedFormat {
            reason: reason.into(),
        }
    }
}

/// Storage behind one configured disk endpoint, as seen by bootstrap.
#[tonic::async_trait]
pub trait StorageDisk: Debug + Send + Sync {
    fn endpoint(&self) -> &str;
    async fn load_format(&self) -> Result<FormatDescriptor, DiskError>;
    async fn save_format(&self, format: &FormatDescriptor) -> Result<(), DiskError>;
}

/// Configured disks in order; ignored disks leave an empty slot.
pub type DiskSet = Vec<Option<Arc<dyn StorageDisk>>>;

/// Opens every configured endpoint: local ones on the filesystem, remote ones
/// through a [`RemoteDisk`] reaching the owning peer.
pub fn open_disks<S: AsRef<str>>(
    endpoints: &[Endpoint],
    ignored: &[Endpoint],
    local_hosts: &[S],
    peers: &PeerAccess,
) -> Result<DiskSet, DiskError> {
    endpoints
        .iter()
        .map(|endpoint| -> Result<Option<Arc<dyn StorageDisk>>, DiskError> {
            if ignored.iter().any(|skip| skip.as_str() == endpoint.as_str()) {
                return Ok(None);
            }
            let disk: Arc<dyn StorageDisk> = if endpoint.is_local(local_hosts) {
                Arc::new(LocalDisk::from_endpoint(endpoint))
            } else {
                Arc::new(RemoteDisk::new(endpoint.clone(), peers)?)
            };
            Ok(Some(disk))
        })
        .collect()
}

/// Local, non-ignored disks keyed by their path, as served to peers.
pub fn local_disks<S: AsRef<str>>(
    endpoints: &[Endpoint],
    ignored: &[Endpoint],
    local_hosts: &[S],
) -> HashMap<String, Arc<dyn StorageDisk>> {
    let mut disks: HashMap<String, Arc<dyn StorageDisk>> = HashMap::new();
    for endpoint in endpoints {
        if !endpoint.is_local(local_hosts)
            || ignored.iter().any(|skip| skip.as_str() == endpoint.as_str())
        {
            continue;
        }
        disks
            .entry(endpoint.path().to_string())
            .or_insert_with(|| Arc::new(LocalDisk::from_endpoint(endpoint)));
    }
    disks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(raw: &[&str]) -> Vec<Endpoint> {
        raw.iter().map(|e| e.parse().unwrap()).collect()
    }

    #[test]
    fn ignored_disks_leave_empty_slots() {
        let endpoints = endpoints(&["/mnt/disk1", "/mnt/disk2", "node2:/mnt/disk1"]);
        let ignored = vec![endpoints[1].clone()];
        let disks = open_disks(&endpoints, &ignored, &["node1"], &PeerAccess::default()).unwrap();

        assert_eq!(disks.len(), 3);
        assert!(disks[1].is_none());
        assert_eq!(disks[0].as_ref().unwrap().endpoint(), "/mnt/disk1");
        assert_eq!(disks[2].as_ref().unwrap().endpoint(), "node2:/mnt/disk1");
    }

    #[test]
    fn only_local_disks_are_served_to_peers() {
        let endpoints = endpoints(&[
            "node1:/mnt/disk1",
            "node1:/mnt/disk2",
            "node2:/mnt/disk1",
            "node1:/mnt/disk2",
        ]);
        let ignored = vec![endpoints[1].clone()];
        let served = local_disks(&endpoints, &ignored, &["node1"]);

        assert_eq!(served.len(), 1);
        assert_eq!(served["/mnt/disk1"].endpoint(), "node1:/mnt/disk1");
    }
}
