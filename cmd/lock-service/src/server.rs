use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tonic::{Request, Response, Status};

use proto::lock::{
    Locker, LockerServer, LockArgs, LockReply, LoginArgs, LoginReply, RPC_PATH_METADATA_KEY,
};

use crate::auth::CredentialValidator;
use crate::coordinator::LockCoordinator;
use crate::epoch::Epoch;
use crate::error::LockError;
use crate::registry::CoordinatorRegistry;

/// `dsync.Locker` handler fronting every coordinator of a node.
///
/// Each request names its coordinator through the rpc path metadata entry.
pub struct LockRpcService {
    registry: Arc<CoordinatorRegistry>,
    credentials: Arc<dyn CredentialValidator>,
}

impl LockRpcService {
    pub fn new(registry: Arc<CoordinatorRegistry>, credentials: Arc<dyn CredentialValidator>) -> Self {
        Self {
            registry,
            credentials,
        }
    }

    fn coordinator<T>(&self, request: &Request<T>) -> Result<Arc<LockCoordinator>, LockError> {
        let path = request
            .metadata()
            .get(RPC_PATH_METADATA_KEY)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        self.registry
            .get(path)
            .ok_or_else(|| LockError::UnknownCoordinator {
                path: path.to_string(),
            })
    }

    /// Checks the session token, then resolves the coordinator; the epoch is
    /// checked by the coordinator itself. Unauthenticated callers learn
    /// nothing about which rpc paths exist.
    fn admit(&self, request: Request<LockArgs>) -> Result<(Arc<LockCoordinator>, LockArgs), Status> {
        if !self.credentials.validate(&request.get_ref().token) {
            return Err(LockError::Unauthenticated.into());
        }
        let coordinator = self.coordinator(&request)?;
        Ok((coordinator, request.into_inner()))
    }
}

fn reply(result: Result<bool, LockError>) -> Result<Response<LockReply>, Status> {
    let success = result?;
    Ok(Response::new(LockReply { success }))
}

#[tonic::async_trait]
impl Locker for LockRpcService {
    async fn login(&self, request: Request<LoginArgs>) -> Result<Response<LoginReply>, Status> {
        let token = self
            .credentials
            .authenticate(&request.get_ref().username, &request.get_ref().password)?;
        let coordinator = self.coordinator(&request)?;
        let args = request.into_inner();
        tracing::debug!("Login for {} on {}", args.username, coordinator.rpc_path());

        Ok(Response::new(LoginReply {
            token,
            epoch: coordinator.epoch().as_nanos(),
        }))
    }

    async fn lock(&self, request: Request<LockArgs>) -> Result<Response<LockReply>, Status> {
        let (coordinator, args) = self.admit(request)?;
        let result = coordinator.lock(&args.name, Epoch::from(args.epoch)).await;
        tracing::debug!("Lock '{}' on {}: {:?}", args.name, coordinator.rpc_path(), result);
        reply(result)
    }

    async fn unlock(&self, request: Request<LockArgs>) -> Result<Response<LockReply>, Status> {
        let (coordinator, args) = self.admit(request)?;
        let result = coordinator.unlock(&args.name, Epoch::from(args.epoch)).await;
        if let Err(LockError::NotLocked { name }) = &result {
            tracing::warn!("Unlock of un-locked '{}' on {}", name, coordinator.rpc_path());
        }
        reply(result)
    }

    async fn r_lock(&self, request: Request<LockArgs>) -> Result<Response<LockReply>, Status> {
        let (coordinator, args) = self.admit(request)?;
        let result = coordinator.rlock(&args.name, Epoch::from(args.epoch)).await;
        tracing::debug!("RLock '{}' on {}: {:?}", args.name, coordinator.rpc_path(), result);
        reply(result)
    }

    async fn r_unlock(&self, request: Request<LockArgs>) -> Result<Response<LockReply>, Status> {
        let (coordinator, args) = self.admit(request)?;
        let result = coordinator.runlock(&args.name, Epoch::from(args.epoch)).await;
        if let Err(LockError::NotRLocked { name }) = &result {
            tracing::warn!("RUnlock of un-locked '{}' on {}", name, coordinator.rpc_path());
        }
        reply(result)
    }
}

pub fn build_lock_server(
    registry: Arc<CoordinatorRegistry>,
    credentials: Arc<dyn CredentialValidator>,
) -> LockerServer<LockRpcService> {
    LockerServer::new(LockRpcService::new(registry, credentials))
}

/// Serves the lock coordinators on `addr` until `shutdown` resolves.
pub async fn serve<F>(
    addr: SocketAddr,
    registry: Arc<CoordinatorRegistry>,
    credentials: Arc<dyn CredentialValidator>,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()>,
{
    for path in registry.rpc_paths() {
        tracing::info!("Lock coordinator registered at {}", path);
    }
    tracing::info!("Lock service listening on {}", addr);

    Server::builder()
        .add_service(build_lock_server(registry, credentials))
        .serve_with_shutdown(addr, shutdown)
        .await
}
