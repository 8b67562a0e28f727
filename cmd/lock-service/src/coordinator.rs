use tokio::sync::Mutex;

use crate::epoch::Epoch;
use crate::error::LockError;
use crate::table::{LockState, LockTable};

/// Lock coordinator for one locally owned disk.
///
/// All four operations take the same guard, so requests against one table
/// apply strictly in the order they are admitted. The epoch is fixed at
/// construction and checked on every call.
#[derive(Debug)]
pub struct LockCoordinator {
    rpc_path: String,
    epoch: Epoch,
    table: Mutex<LockTable>,
}

impl LockCoordinator {
    pub fn new(rpc_path: impl Into<String>) -> Self {
        Self::with_epoch(rpc_path, Epoch::now())
    }

    pub fn with_epoch(rpc_path: impl Into<String>, epoch: Epoch) -> Self {
        Self {
            rpc_path: rpc_path.into(),
            epoch,
            table: Mutex::new(LockTable::new()),
        }
    }

    pub fn rpc_path(&self) -> &str {
        &self.rpc_path
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn verify_epoch(&self, caller: Epoch) -> Result<(), LockError> {
        if caller == self.epoch {
            Ok(())
        } else {
            Err(LockError::EpochMismatch)
        }
    }

    pub async fn lock(&self, name: &str, caller: Epoch) -> Result<bool, LockError> {
        let mut table = self.table.lock().await;
        self.verify_epoch(caller)?;
        Ok(table.try_lock(name))
    }

    pub async fn unlock(&self, name: &str, caller: Epoch) -> Result<bool, LockError> {
        let mut table = self.table.lock().await;
        self.verify_epoch(caller)?;
        table.unlock(name)?;
        Ok(true)
    }

    pub async fn rlock(&self, name: &str, caller: Epoch) -> Result<bool, LockError> {
        let mut table = self.table.lock().await;
        self.verify_epoch(caller)?;
        Ok(table.try_rlock(name))
    }

    pub async fn runlock(&self, name: &str, caller: Epoch) -> Result<bool, LockError> {
        let mut table = self.table.lock().await;
        self.verify_epoch(caller)?;
        table.runlock(name)?;
        Ok(true)
    }

    pub async fn state(&self, name: &str) -> LockState {
        self.table.lock().await.state(name)
    }
}
