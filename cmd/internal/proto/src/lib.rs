//! Wire types for the distributed lock and disk format RPCs.
//!
//! Messages are plain prost structs (no `.proto` file); the `dsync.Locker`
//! and `storage.DiskFormat` services are generated by `build.rs`.

pub mod lock {
    /// Metadata key carrying the rpc path of the coordinator a request targets.
    pub const RPC_PATH_METADATA_KEY: &str = "x-lock-rpc-path";

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LoginArgs {
        #[prost(string, tag = "1")]
        pub username: String,
        #[prost(string, tag = "2")]
        pub password: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LoginReply {
        #[prost(string, tag = "1")]
        pub token: String,
        /// Coordinator start time, nanoseconds since the unix epoch.
        #[prost(uint64, tag = "2")]
        pub epoch: u64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LockArgs {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub token: String,
        /// The epoch the caller last observed at login.
        #[prost(uint64, tag = "3")]
        pub epoch: u64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LockReply {
        #[prost(bool, tag = "1")]
        pub success: bool,
    }

    include!(concat!(env!("OUT_DIR"), "/dsync.Locker.rs"));

    pub use locker_client::LockerClient;
    pub use locker_server::{Locker, LockerServer};
}

pub mod storage {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LoadFormatArgs {
        /// Token from a `dsync.Locker` login on the same node.
        #[prost(string, tag = "1")]
        pub token: String,
        #[prost(string, tag = "2")]
        pub disk_path: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LoadFormatReply {
        /// The raw on-disk format record.
        #[prost(bytes = "vec", tag = "1")]
        pub format: Vec<u8>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SaveFormatArgs {
        #[prost(string, tag = "1")]
        pub token: String,
        #[prost(string, tag = "2")]
        pub disk_path: String,
        #[prost(bytes = "vec", tag = "3")]
        pub format: Vec<u8>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SaveFormatReply {}

    include!(concat!(env!("OUT_DIR"), "/storage.DiskFormat.rs"));

    pub use disk_format_client::DiskFormatClient;
    pub use disk_format_server::{DiskFormat, DiskFormatServer};
}
