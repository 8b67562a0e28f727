//! Deciding what a node does with its disks at startup: format, wait, heal
//! or serve.

pub mod decision;
pub mod prepare;
pub mod status;

pub use decision::{decide, quorum, BootstrapAction};
pub use prepare::{
    check_sufficient_disks, format_disks, prepare_storage, probe_disks, BackoffConfig,
    BootstrapError, BootstrapLoop, HealNotifier, ProbeReport, MIN_PROBE_INTERVAL,
};
pub use status::{DiskStatus, DiskTally};
