pub mod bootstrap;
pub mod cli;
pub mod disk;
pub mod node;

pub use bootstrap::*;
pub use cli::*;
pub use disk::{
    build_format_server, local_disks, open_disks, DiskError, DiskSet, FormatDescriptor, LocalDisk,
    PeerAccess, RemoteDisk, StorageDisk,
};
pub use node::*;
