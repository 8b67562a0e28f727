use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use lock_service::{CoordinatorRegistry, Endpoint, StaticCredentials};

/// Serve lock coordinators for the local disks without bootstrapping them.
#[derive(Parser)]
#[command(name = "lock-service")]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1:50051")]
    address: SocketAddr,

    /// Disk endpoints of the whole cluster, `/path` or `host:/path`.
    #[arg(short, long = "disk", required = true)]
    disks: Vec<Endpoint>,

    #[arg(long = "ignore-disk")]
    ignored_disks: Vec<Endpoint>,

    /// Host names under which this node appears in disk endpoints.
    #[arg(long = "local-host")]
    local_hosts: Vec<String>,

    #[arg(long, env = "AWSOMEFS_ACCESS_KEY")]
    access_key: String,

    #[arg(long, env = "AWSOMEFS_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// Lifetime of login tokens.
    #[arg(long, default_value_t = 86_400, value_parser = clap::value_parser!(u64).range(1..))]
    token_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_log::LogTracer::init()?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();
    let registry =
        CoordinatorRegistry::from_endpoints(&args.disks, &args.ignored_disks, &args.local_hosts);
    if registry.is_empty() {
        anyhow::bail!("none of the configured disks is local to this node");
    }
    let credentials = Arc::new(
        StaticCredentials::new(args.access_key, args.secret_key)
            .with_token_ttl(Duration::from_secs(args.token_ttl_secs)),
    );

    lock_service::serve(args.address, Arc::new(registry), credentials, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down lock service");
    })
    .await
    .context("lock service failed")?;

    Ok(())
}
