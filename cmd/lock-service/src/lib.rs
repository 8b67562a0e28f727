//! Per-disk distributed lock coordinators.
//!
//! Every locally owned disk gets a [`LockCoordinator`] holding its own
//! [`LockTable`]. Locks are fail-fast test-and-set operations guarded by the
//! coordinator's [`Epoch`]; they are never persisted.

pub mod auth;
pub mod client;
pub mod coordinator;
pub mod endpoint;
pub mod epoch;
pub mod error;
pub mod registry;
pub mod server;
pub mod table;

pub use auth::{CredentialValidator, StaticCredentials, DEFAULT_TOKEN_TTL};
pub use client::RemoteLocker;
pub use coordinator::LockCoordinator;
pub use endpoint::{Endpoint, EndpointError};
pub use epoch::Epoch;
pub use error::{LockError, EPOCH_MISMATCH_MSG};
pub use registry::{lock_rpc_path, CoordinatorRegistry, LOCK_RPC_PREFIX};
pub use server::{build_lock_server, serve, LockRpcService};
pub use table::{LockState, LockTable};
