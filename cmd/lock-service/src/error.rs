//! Errors surfaced by lock coordinators and their clients.

use proto::lock::RPC_PATH_METADATA_KEY;
use thiserror::Error;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Status};

/// Returned whenever a caller's epoch differs from the coordinator's.
pub const EPOCH_MISMATCH_MSG: &str = "Timestamps don't match, server may have restarted.";

const NOT_LOCKED_PREFIX: &str = "Unlock attempted on an un-locked entity: ";
const NOT_RLOCKED_PREFIX: &str = "RUnlock attempted on an un-locked entity: ";
const UNKNOWN_COORDINATOR_PREFIX: &str = "no lock coordinator at rpc path ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The coordinator restarted since the caller logged in.
    #[error("Timestamps don't match, server may have restarted.")]
    EpochMismatch,

    /// Exclusive release of a name nobody holds.
    #[error("Unlock attempted on an un-locked entity: {name}")]
    NotLocked { name: String },

    /// Shared release of a name nobody holds.
    #[error("RUnlock attempted on an un-locked entity: {name}")]
    NotRLocked { name: String },

    #[error("authentication failed")]
    Unauthenticated,

    #[error("no lock coordinator at rpc path {path}")]
    UnknownCoordinator { path: String },

    #[error("lock rpc transport error: {0}")]
    Transport(String),
}

impl LockError {
    /// Timeout-like errors: the caller should log in again and retry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::EpochMismatch)
    }

    pub fn is_temporary(&self) -> bool {
        false
    }
}

impl From<LockError> for Status {
    fn from(err: LockError) -> Self {
        let code = match &err {
            LockError::EpochMismatch => Code::Unavailable,
            LockError::NotLocked { .. } | LockError::NotRLocked { .. } => Code::FailedPrecondition,
            LockError::Unauthenticated => Code::Unauthenticated,
            LockError::UnknownCoordinator { .. } => Code::NotFound,
            LockError::Transport(_) => Code::Internal,
        };
        let mut metadata = MetadataMap::new();
        if let LockError::UnknownCoordinator { path } = &err {
            if let Ok(value) = MetadataValue::try_from(path.as_str()) {
                metadata.insert(RPC_PATH_METADATA_KEY, value);
            }
        }
        Status::with_metadata(code, err.to_string(), metadata)
    }
}

impl From<Status> for LockError {
    fn from(status: Status) -> Self {
        let message = status.message();
        match status.code() {
            Code::Unavailable if message == EPOCH_MISMATCH_MSG => LockError::EpochMismatch,
            Code::FailedPrecondition => {
                if let Some(name) = message.strip_prefix(NOT_RLOCKED_PREFIX) {
                    LockError::NotRLocked { name: name.to_string() }
                } else if let Some(name) = message.strip_prefix(NOT_LOCKED_PREFIX) {
                    LockError::NotLocked { name: name.to_string() }
                } else {
                    LockError::Transport(message.to_string())
                }
            }
            Code::Unauthenticated => LockError::Unauthenticated,
            Code::NotFound => {
                let path = status
                    .metadata()
                    .get(RPC_PATH_METADATA_KEY)
                    .and_then(|value| value.to_str().ok())
                    .or_else(|| message.strip_prefix(UNKNOWN_COORDINATOR_PREFIX))
                    .unwrap_or_default();
                LockError::UnknownCoordinator {
                    path: path.to_string(),
                }
            }
            _ => LockError::Transport(status.to_string()),
        }
    }
}

impl From<tonic::transport::Error> for LockError {
    fn from(err: tonic::transport::Error) -> Self {
        LockError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_mismatch_keeps_its_exact_text() {
        assert_eq!(LockError::EpochMismatch.to_string(), EPOCH_MISMATCH_MSG);
    }

    #[test]
    fn only_epoch_mismatch_is_timeout() {
        assert!(LockError::EpochMismatch.is_timeout());
        assert!(!LockError::EpochMismatch.is_temporary());
        assert!(!LockError::NotLocked { name: "a".into() }.is_timeout());
        assert!(!LockError::Unauthenticated.is_timeout());
    }

    #[test]
    fn errors_survive_a_status_round_trip() {
        for err in [
            LockError::EpochMismatch,
            LockError::NotLocked { name: "bucket/obj1".into() },
            LockError::NotRLocked { name: "bucket/obj1".into() },
            LockError::Unauthenticated,
            LockError::UnknownCoordinator { path: "/awsomefs/lock/mnt/disk9".into() },
            LockError::UnknownCoordinator { path: "/awsomefs/lock/mnt/my disk".into() },
        ] {
            let status: Status = err.clone().into();
            assert_eq!(LockError::from(status), err);
        }
    }

    #[test]
    fn unknown_coordinator_path_travels_in_metadata() {
        let status: Status = LockError::UnknownCoordinator {
            path: "/awsomefs/lock/a b c".into(),
        }
        .into();
        assert_eq!(
            status
                .metadata()
                .get(RPC_PATH_METADATA_KEY)
                .unwrap()
                .to_str()
                .unwrap(),
            "/awsomefs/lock/a b c"
        );

        let bare = Status::not_found("no lock coordinator at rpc path /x y");
        assert_eq!(
            LockError::from(bare),
            LockError::UnknownCoordinator { path: "/x y".into() }
        );
    }

    #[test]
    fn unrelated_unavailable_status_is_not_an_epoch_mismatch() {
        let err = LockError::from(Status::unavailable("connection refused"));
        assert!(!err.is_timeout());
    }
}
