use clap::{Args, Parser, Subcommand};
use lock_service::Endpoint;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::bootstrap::BackoffConfig;
use crate::disk::PeerAccess;
use crate::node::NodeConfig;

#[derive(Parser)]
#[command(name = "awsomefs-node")]
#[command(about = "Bootstrap awsomefs disks and serve their lock coordinators", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring the disk set up, then serve one lock coordinator per local disk
    Serve(ServeArgs),
    /// Write a fresh format descriptor to blank local disks
    Format {
        #[arg(short, long = "disk", required = true)]
        disks: Vec<PathBuf>,
    },
    /// Print every disk's probe outcome and the resulting bootstrap action
    Probe(ProbeArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(short, long, default_value = "127.0.0.1:50051")]
    pub address: SocketAddr,

    /// Disk endpoints of the whole cluster, in order: `/path`, `host:/path`
    /// or `host:port:/path`
    #[arg(short, long = "disk", required = true)]
    pub disks: Vec<Endpoint>,

    #[arg(long = "ignore-disk")]
    pub ignored_disks: Vec<Endpoint>,

    /// Host names under which this node appears in disk endpoints
    #[arg(long = "local-host")]
    pub local_hosts: Vec<String>,

    #[arg(long, env = "AWSOMEFS_ACCESS_KEY")]
    pub access_key: String,

    #[arg(long, env = "AWSOMEFS_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Lifetime of login tokens issued to peers
    #[arg(long, default_value_t = 86_400, value_parser = clap::value_parser!(u64).range(1..))]
    pub token_ttl_secs: u64,

    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub backoff_initial_ms: u64,

    #[arg(long, default_value_t = 30_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub backoff_max_ms: u64,
}

#[derive(Args)]
pub struct ProbeArgs {
    #[arg(short, long = "disk", required = true)]
    pub disks: Vec<Endpoint>,

    #[arg(long = "local-host")]
    pub local_hosts: Vec<String>,

    /// Rpc port of peers whose endpoints name none
    #[arg(long, default_value_t = 50051)]
    pub port: u16,

    #[arg(long, env = "AWSOMEFS_ACCESS_KEY")]
    pub access_key: Option<String>,

    #[arg(long, env = "AWSOMEFS_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
}

impl ProbeArgs {
    pub fn peer_access(&self) -> PeerAccess {
        PeerAccess {
            port: self.port,
            access_key: self.access_key.clone().unwrap_or_default(),
            secret_key: self.secret_key.clone().unwrap_or_default(),
            ..PeerAccess::default()
        }
    }
}

impl From<ServeArgs> for NodeConfig {
    fn from(args: ServeArgs) -> Self {
        NodeConfig {
            address: args.address,
            disks: args.disks,
            ignored_disks: args.ignored_disks,
            local_hosts: args.local_hosts,
            access_key: args.access_key,
            secret_key: args.secret_key,
            token_ttl: Duration::from_secs(args.token_ttl_secs),
            backoff: BackoffConfig {
                initial: Duration::from_millis(args.backoff_initial_ms),
                max: Duration::from_millis(args.backoff_max_ms),
            },
        }
    }
}
