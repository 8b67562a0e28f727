use std::collections::HashMap;
use std::sync::Arc;

use lock_service::CredentialValidator;
use proto::storage::{
    DiskFormat, DiskFormatServer, LoadFormatArgs, LoadFormatReply, SaveFormatArgs,
    SaveFormatReply,
};
use tonic::{Request, Response, Status};

use super::{DiskError, FormatDescriptor, StorageDisk};

/// `storage.DiskFormat` handler exposing this node's disks to peers during
/// bootstrap.
pub struct FormatRpcService {
    disks: HashMap<String, Arc<dyn StorageDisk>>,
    credentials: Arc<dyn CredentialValidator>,
}

impl FormatRpcService {
    pub fn new(
        disks: HashMap<String, Arc<dyn StorageDisk>>,
        credentials: Arc<dyn CredentialValidator>,
    ) -> Self {
        Self { disks, credentials }
    }

    fn disk(&self, token: &str, path: &str) -> Result<&Arc<dyn StorageDisk>, Status> {
        if !self.credentials.validate(token) {
            return Err(Status::unauthenticated("authentication failed"));
        }
        self.disks
            .get(path)
            .ok_or_else(|| Status::not_found(format!("no disk at {}", path)))
    }
}

impl From<DiskError> for Status {
    fn from(err: DiskError) -> Self {
        match err {
            DiskError::DiskNotFound => Status::not_found(err.to_string()),
            DiskError::UnformattedDisk => Status::failed_precondition(err.to_string()),
            DiskError::CorruptedFormat { reason } => Status::data_loss(reason),
            DiskError::Io(e) => Status::internal(e.to_string()),
        }
    }
}

#[tonic::async_trait]
impl DiskFormat for FormatRpcService {
    async fn load_format(
        &self,
        request: Request<LoadFormatArgs>,
    ) -> Result<Response<LoadFormatReply>, Status> {
        let args = request.into_inner();
        let disk = self.disk(&args.token, &args.disk_path)?;
        let format = disk.load_format().await?.encode()?;
        Ok(Response::new(LoadFormatReply { format }))
    }

    async fn save_format(
        &self,
        request: Request<SaveFormatArgs>,
    ) -> Result<Response<SaveFormatReply>, Status> {
        let args = request.into_inner();
        let disk = self.disk(&args.token, &args.disk_path)?;
        let format = FormatDescriptor::decode(&args.format)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        disk.save_format(&format).await?;
        tracing::info!("Peer wrote format descriptor to {}", disk.endpoint());
        Ok(Response::new(SaveFormatReply {}))
    }
}

pub fn build_format_server(
    disks: HashMap<String, Arc<dyn StorageDisk>>,
    credentials: Arc<dyn CredentialValidator>,
) -> DiskFormatServer<FormatRpcService> {
    DiskFormatServer::new(FormatRpcService::new(disks, credentials))
}
