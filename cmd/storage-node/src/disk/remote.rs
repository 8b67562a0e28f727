use std::io;
use std::time::Duration;

use lock_service::{lock_rpc_path, Endpoint};
use proto::lock::{LockerClient, LoginArgs, RPC_PATH_METADATA_KEY};
use proto::storage::{DiskFormatClient, LoadFormatArgs, SaveFormatArgs};
use tokio::sync::Mutex;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint as RpcTarget};
use tonic::{Code, Request, Status};

use super::{DiskError, FormatDescriptor, StorageDisk};

/// How this node reaches the rpc servers of its peers.
#[derive(Debug, Clone)]
pub struct PeerAccess {
    /// Port used when a disk endpoint names no port of its own.
    pub port: u16,
    pub access_key: String,
    pub secret_key: String,
    pub connect_timeout: Duration,
}

impl Default for PeerAccess {
    fn default() -> Self {
        Self {
            port: 50051,
            access_key: String::new(),
            secret_key: String::new(),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// A disk owned by another node, reached through its `storage.DiskFormat`
/// service.
///
/// An unreachable peer, or one that does not serve the disk, probes as
/// offline. The token comes from a `dsync.Locker` login against the disk's
/// lock coordinator and is renewed once when the peer rejects it.
#[derive(Debug)]
pub struct RemoteDisk {
    endpoint: Endpoint,
    target: RpcTarget,
    access_key: String,
    secret_key: String,
    token: Mutex<Option<String>>,
}

impl RemoteDisk {
    pub fn new(endpoint: Endpoint, peers: &PeerAccess) -> Result<Self, DiskError> {
        let uri = format!(
            "http://{}:{}",
            endpoint.host_name().unwrap_or("localhost"),
            endpoint.port().unwrap_or(peers.port)
        );
        let target = RpcTarget::from_shared(uri.clone())
            .map_err(|e| {
                DiskError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("peer address {} for {}: {}", uri, endpoint, e),
                ))
            })?
            .connect_timeout(peers.connect_timeout);
        Ok(Self {
            endpoint,
            target,
            access_key: peers.access_key.clone(),
            secret_key: peers.secret_key.clone(),
            token: Mutex::new(None),
        })
    }

    /// Explicit peer address, bypassing the endpoint's host.
    pub fn with_address(
        endpoint: Endpoint,
        address: &str,
        peers: &PeerAccess,
    ) -> Result<Self, DiskError> {
        let mut disk = Self::new(endpoint, peers)?;
        disk.target = RpcTarget::from_shared(address.to_string())
            .map_err(|e| DiskError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?
            .connect_timeout(peers.connect_timeout);
        Ok(disk)
    }

    async fn channel(&self) -> Result<Channel, DiskError> {
        self.target.connect().await.map_err(|e| {
            tracing::debug!("Peer of {} unreachable: {}", self.endpoint, e);
            DiskError::DiskNotFound
        })
    }

    async fn login(&self, channel: Channel) -> Result<String, DiskError> {
        let rpc_path = MetadataValue::try_from(lock_rpc_path(&self.endpoint).as_str())
            .map_err(|e| DiskError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let mut request = Request::new(LoginArgs {
            username: self.access_key.clone(),
            password: self.secret_key.clone(),
        });
        request.metadata_mut().insert(RPC_PATH_METADATA_KEY, rpc_path);

        let reply = LockerClient::new(channel).login(request).await?;
        Ok(reply.into_inner().token)
    }

    async fn token(&self, channel: &Channel, renew: bool) -> Result<String, DiskError> {
        let mut cached = self.token.lock().await;
        if renew {
            *cached = None;
        }
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login(channel.clone()).await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[tonic::async_trait]
impl StorageDisk for RemoteDisk {
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn load_format(&self) -> Result<FormatDescriptor, DiskError> {
        let channel = self.channel().await?;
        let mut renew = false;
        loop {
            let request = LoadFormatArgs {
                token: self.token(&channel, renew).await?,
                disk_path: self.endpoint.path().to_string(),
            };
            match DiskFormatClient::new(channel.clone()).load_format(request).await {
                Ok(reply) => return FormatDescriptor::decode(&reply.into_inner().format),
                Err(status) if status.code() == Code::Unauthenticated && !renew => renew = true,
                Err(status) => return Err(status.into()),
            }
        }
    }

    async fn save_format(&self, format: &FormatDescriptor) -> Result<(), DiskError> {
        let record = format.encode()?;
        let channel = self.channel().await?;
        let mut renew = false;
        loop {
            let request = SaveFormatArgs {
                token: self.token(&channel, renew).await?,
                disk_path: self.endpoint.path().to_string(),
                format: record.clone(),
            };
            match DiskFormatClient::new(channel.clone()).save_format(request).await {
                Ok(_) => return Ok(()),
                Err(status) if status.code() == Code::Unauthenticated && !renew => renew = true,
                Err(status) => return Err(status.into()),
            }
        }
    }
}

impl From<Status> for DiskError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::NotFound | Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
                DiskError::DiskNotFound
            }
            Code::FailedPrecondition => DiskError::UnformattedDisk,
            Code::DataLoss => DiskError::corrupted(status.message()),
            Code::Unauthenticated | Code::PermissionDenied => DiskError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                status.message().to_string(),
            )),
            _ => DiskError::Io(io::Error::new(io::ErrorKind::Other, status.to_string())),
        }
    }
}
