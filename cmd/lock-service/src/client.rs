use proto::lock::{LockArgs, LockerClient, LoginArgs, RPC_PATH_METADATA_KEY};
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::Channel;

use crate::epoch::Epoch;
use crate::error::LockError;

#[derive(Debug, Clone)]
struct Session {
    token: String,
    epoch: Epoch,
}

/// Client for one remote lock coordinator.
///
/// Holds the token and epoch from the last login. A request failing with
/// [`LockError::EpochMismatch`] means the coordinator restarted: log in again
/// and retry. Acquisition never waits, so retry and backoff are up to the
/// caller.
#[derive(Debug, Clone)]
pub struct RemoteLocker {
    client: LockerClient<Channel>,
    rpc_path: MetadataValue<Ascii>,
    session: Option<Session>,
}

impl RemoteLocker {
    pub async fn connect<D: Into<String>>(dst: D, rpc_path: &str) -> Result<Self, LockError> {
        let rpc_path = rpc_path
            .parse::<MetadataValue<Ascii>>()
            .map_err(|e| LockError::Transport(format!("invalid rpc path {:?}: {}", rpc_path, e)))?;
        let client = LockerClient::connect(dst.into()).await?;
        Ok(Self {
            client,
            rpc_path,
            session: None,
        })
    }

    pub fn epoch(&self) -> Option<Epoch> {
        self.session.as_ref().map(|s| s.epoch)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<Epoch, LockError> {
        let mut request = tonic::Request::new(LoginArgs {
            username: username.to_string(),
            password: password.to_string(),
        });
        request
            .metadata_mut()
            .insert(RPC_PATH_METADATA_KEY, self.rpc_path.clone());

        let reply = self.client.login(request).await?.into_inner();
        let epoch = Epoch::from(reply.epoch);
        self.session = Some(Session {
            token: reply.token,
            epoch,
        });
        Ok(epoch)
    }

    fn request(&self, name: &str) -> Result<tonic::Request<LockArgs>, LockError> {
        let session = self.session.as_ref().ok_or(LockError::Unauthenticated)?;
        let mut request = tonic::Request::new(LockArgs {
            name: name.to_string(),
            token: session.token.clone(),
            epoch: session.epoch.as_nanos(),
        });
        request
            .metadata_mut()
            .insert(RPC_PATH_METADATA_KEY, self.rpc_path.clone());
        Ok(request)
    }

    pub async fn lock(&self, name: &str) -> Result<bool, LockError> {
        let mut client = self.client.clone();
        let reply = client.lock(self.request(name)?).await?;
        Ok(reply.into_inner().success)
    }

    pub async fn unlock(&self, name: &str) -> Result<bool, LockError> {
        let mut client = self.client.clone();
        let reply = client.unlock(self.request(name)?).await?;
        Ok(reply.into_inner().success)
    }

    pub async fn rlock(&self, name: &str) -> Result<bool, LockError> {
        let mut client = self.client.clone();
        let reply = client.r_lock(self.request(name)?).await?;
        Ok(reply.into_inner().success)
    }

    pub async fn runlock(&self, name: &str) -> Result<bool, LockError> {
        let mut client = self.client.clone();
        let reply = client.r_unlock(self.request(name)?).await?;
        Ok(reply.into_inner().success)
    }
}
