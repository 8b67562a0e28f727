use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lock_service::{build_lock_server, CoordinatorRegistry, Endpoint, StaticCredentials};
use tokio::sync::watch;
use tonic::transport::Server;

use crate::bootstrap::{
    format_disks, prepare_storage, probe_disks, BackoffConfig, DiskStatus, HealNotifier,
};
use crate::disk::{
    build_format_server, local_disks, open_disks, DiskSet, LocalDisk, PeerAccess, StorageDisk,
};

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub address: SocketAddr,
    pub disks: Vec<Endpoint>,
    pub ignored_disks: Vec<Endpoint>,
    pub local_hosts: Vec<String>,
    pub access_key: String,
    pub secret_key: String,
    pub token_ttl: Duration,
    pub backoff: BackoffConfig,
}

impl NodeConfig {
    /// Only the node owning the first configured disk formats a blank cluster.
    pub fn first_disk_local(&self) -> bool {
        self.disks
            .first()
            .map(|disk| disk.is_local(&self.local_hosts))
            .unwrap_or(false)
    }

    /// Peers listen on this node's port unless an endpoint names another.
    pub fn peer_access(&self) -> PeerAccess {
        PeerAccess {
            port: self.address.port(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            ..PeerAccess::default()
        }
    }
}

/// Level-triggered stop signal shared by the rpc server and the bootstrap.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Resolves once [`trigger`](Self::trigger) was called, even if that
    /// happened before the wait began.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            let _ = receiver.wait_for(|stopped| *stopped).await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

fn forward_ctrl_c(shutdown: Shutdown) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            shutdown.trigger();
        }
    });
}

/// SIGHUP wakes a bootstrap loop that is waiting for an operator heal.
#[cfg(unix)]
fn forward_heal_signal(notifier: HealNotifier) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            notifier.wake();
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_heal_signal(_notifier: HealNotifier) -> anyhow::Result<()> {
    Ok(())
}

/// Serves the lock coordinators and the disk format service, then brings the
/// disk set up. Peers probe this node's disks while it is still bootstrapping,
/// so the rpc server starts first.
pub async fn serve(config: NodeConfig) -> anyhow::Result<()> {
    tracing::info!("Bootstrapping {} disks", config.disks.len());

    let shutdown = Shutdown::new();
    forward_ctrl_c(shutdown.clone());
    let notifier = HealNotifier::new();
    forward_heal_signal(notifier.clone())?;

    let registry = CoordinatorRegistry::from_endpoints(
        &config.disks,
        &config.ignored_disks,
        &config.local_hosts,
    );
    if registry.is_empty() {
        anyhow::bail!("none of the configured disks is local to this node");
    }
    for path in registry.rpc_paths() {
        tracing::info!("Lock coordinator registered at {}", path);
    }
    let credentials = Arc::new(
        StaticCredentials::new(config.access_key.clone(), config.secret_key.clone())
            .with_token_ttl(config.token_ttl),
    );
    let served = local_disks(&config.disks, &config.ignored_disks, &config.local_hosts);

    let rpc = Server::builder()
        .add_service(build_lock_server(Arc::new(registry), credentials.clone()))
        .add_service(build_format_server(served, credentials))
        .serve_with_shutdown(config.address, shutdown.wait());
    let mut server = tokio::spawn(rpc);
    tracing::info!("Listening on {}", config.address);

    let disks = open_disks(
        &config.disks,
        &config.ignored_disks,
        &config.local_hosts,
        &config.peer_access(),
    )
    .context("opening disks")?;

    let prepared = tokio::select! {
        prepared = prepare_storage(
            disks,
            config.first_disk_local(),
            config.backoff,
            notifier,
            shutdown.wait(),
        ) => prepared,
        stopped = &mut server => {
            stopped.context("rpc server task failed")??;
            anyhow::bail!("rpc server stopped before the disks were ready");
        }
    };
    let disks = match prepared {
        Ok(disks) => disks,
        Err(e) => {
            shutdown.trigger();
            let _ = server.await;
            return Err(e).context("preparing storage");
        }
    };
    tracing::info!("{} disks ready", disks.iter().flatten().count());

    server
        .await
        .context("rpc server task failed")?
        .context("rpc server failed")?;
    tracing::info!("Node stopped");
    Ok(())
}

/// One-shot format of local disks. Refuses to touch a set where any disk is
/// already formatted, corrupted or missing.
pub async fn format(paths: &[PathBuf]) -> anyhow::Result<()> {
    let disks: DiskSet = paths
        .iter()
        .map(|path| Some(Arc::new(LocalDisk::new(path)) as Arc<dyn StorageDisk>))
        .collect();

    let report = probe_disks(&disks).await;
    for (endpoint, status) in &report.statuses {
        if *status != DiskStatus::Unformatted {
            anyhow::bail!("refusing to format: {} is {:?}", endpoint, status);
        }
    }

    format_disks(&disks).await.context("formatting disks")?;
    tracing::info!("Format complete.");
    Ok(())
}

/// Logs each disk's status and the action a bootstrap would take now.
pub async fn probe(
    endpoints: &[Endpoint],
    local_hosts: &[String],
    peers: &PeerAccess,
) -> anyhow::Result<()> {
    let disks = open_disks(endpoints, &[], local_hosts, peers).context("opening disks")?;
    let report = probe_disks(&disks).await;
    for (endpoint, status) in &report.statuses {
        tracing::info!("{}: {:?}", endpoint, status);
    }

    let first_disk_local = endpoints
        .first()
        .map(|disk| disk.is_local(local_hosts))
        .unwrap_or(false);
    tracing::info!("Tally {:?}", report.tally);
    tracing::info!("Action {:?}", report.tally.decide(first_disk_local));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_reaches_late_waiters() {
        let shutdown = Shutdown::new();
        let early = tokio::spawn(shutdown.wait());
        shutdown.trigger();
        early.await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
            .await
            .unwrap();
    }

    #[test]
    fn peers_default_to_this_nodes_port() {
        let config = NodeConfig {
            address: "0.0.0.0:9100".parse().unwrap(),
            disks: vec![],
            ignored_disks: vec![],
            local_hosts: vec![],
            access_key: "access".into(),
            secret_key: "secret".into(),
            token_ttl: Duration::from_secs(60),
            backoff: BackoffConfig::default(),
        };
        let peers = config.peer_access();
        assert_eq!(peers.port, 9100);
        assert_eq!(peers.access_key, "access");
    }
}
