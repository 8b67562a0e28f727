//! End-to-end lock RPCs over a loopback gRPC server.

use std::net::SocketAddr;
use std::sync::Arc;

use lock_service::{
    build_lock_server, CoordinatorRegistry, Endpoint, LockError, RemoteLocker, StaticCredentials,
};
use proto::lock::{LockArgs, LockerClient, LoginArgs, RPC_PATH_METADATA_KEY};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

const DISK1: &str = "/awsomefs/lock/mnt/disk1";
const DISK2: &str = "/awsomefs/lock/mnt/disk2";

async fn start_node() -> SocketAddr {
    let disks: Vec<Endpoint> = ["/mnt/disk1", "/mnt/disk2", "node2:/mnt/disk1"]
        .iter()
        .map(|d| d.parse().unwrap())
        .collect();
    let none: [&str; 0] = [];
    let registry = Arc::new(CoordinatorRegistry::from_endpoints(&disks, &[], &none));
    let credentials = Arc::new(StaticCredentials::new("access", "secret"));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        Server::builder()
            .add_service(build_lock_server(registry, credentials))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    addr
}

async fn logged_in(addr: SocketAddr, rpc_path: &str) -> RemoteLocker {
    let mut locker = RemoteLocker::connect(format!("http://{}", addr), rpc_path)
        .await
        .unwrap();
    locker.login("access", "secret").await.unwrap();
    locker
}

#[tokio::test]
async fn lock_unlock_over_the_wire() {
    let addr = start_node().await;
    let locker = logged_in(addr, DISK1).await;

    assert!(locker.lock("bucket/obj1").await.unwrap());
    assert!(!locker.lock("bucket/obj1").await.unwrap());
    assert!(!locker.rlock("bucket/obj1").await.unwrap());
    assert!(locker.unlock("bucket/obj1").await.unwrap());

    let err = locker.unlock("bucket/obj1").await.unwrap_err();
    assert_eq!(err, LockError::NotLocked { name: "bucket/obj1".into() });
}

#[tokio::test]
async fn readers_share_and_release() {
    let addr = start_node().await;
    let locker = logged_in(addr, DISK1).await;

    assert!(locker.rlock("obj").await.unwrap());
    assert!(locker.rlock("obj").await.unwrap());
    assert!(locker.runlock("obj").await.unwrap());
    assert!(locker.runlock("obj").await.unwrap());

    let err = locker.runlock("obj").await.unwrap_err();
    assert_eq!(err, LockError::NotRLocked { name: "obj".into() });
}

#[tokio::test]
async fn coordinators_of_one_node_are_independent() {
    let addr = start_node().await;
    let disk1 = logged_in(addr, DISK1).await;
    let disk2 = logged_in(addr, DISK2).await;

    assert!(disk1.lock("obj").await.unwrap());
    assert!(disk2.lock("obj").await.unwrap());
    assert_ne!(disk1.epoch(), None);
}

#[tokio::test]
async fn stale_epoch_is_reported_as_timeout() {
    let addr = start_node().await;
    let mut client = LockerClient::connect(format!("http://{}", addr)).await.unwrap();

    let mut login = tonic::Request::new(LoginArgs {
        username: "access".into(),
        password: "secret".into(),
    });
    login
        .metadata_mut()
        .insert(RPC_PATH_METADATA_KEY, DISK1.parse().unwrap());
    let session = client.login(login).await.unwrap().into_inner();

    let mut lock = tonic::Request::new(LockArgs {
        name: "obj".into(),
        token: session.token,
        epoch: session.epoch.wrapping_sub(1),
    });
    lock.metadata_mut()
        .insert(RPC_PATH_METADATA_KEY, DISK1.parse().unwrap());
    let status = client.lock(lock).await.unwrap_err();

    assert_eq!(status.message(), "Timestamps don't match, server may have restarted.");
    let err = LockError::from(status);
    assert_eq!(err, LockError::EpochMismatch);
    assert!(err.is_timeout());
}

#[tokio::test]
async fn unauthenticated_and_unknown_paths_are_rejected() {
    let addr = start_node().await;

    let mut locker = RemoteLocker::connect(format!("http://{}", addr), DISK1)
        .await
        .unwrap();
    assert_eq!(locker.lock("obj").await.unwrap_err(), LockError::Unauthenticated);
    assert_eq!(
        locker.login("access", "wrong").await.unwrap_err(),
        LockError::Unauthenticated
    );

    let mut unknown = RemoteLocker::connect(format!("http://{}", addr), "/awsomefs/lock/nope")
        .await
        .unwrap();
    assert_eq!(
        unknown.login("access", "wrong").await.unwrap_err(),
        LockError::Unauthenticated
    );
    assert!(matches!(
        unknown.login("access", "secret").await.unwrap_err(),
        LockError::UnknownCoordinator { .. }
    ));
}

fn lock_request(path: &str, token: &str) -> tonic::Request<LockArgs> {
    let mut request = tonic::Request::new(LockArgs {
        name: "obj".into(),
        token: token.into(),
        epoch: 0,
    });
    request
        .metadata_mut()
        .insert(RPC_PATH_METADATA_KEY, path.parse().unwrap());
    request
}

#[tokio::test]
async fn bad_token_hides_which_paths_exist() {
    let addr = start_node().await;
    let mut client = LockerClient::connect(format!("http://{}", addr)).await.unwrap();

    let known = client.lock(lock_request(DISK1, "forged")).await.unwrap_err();
    let unknown = client
        .lock(lock_request("/awsomefs/lock/nope", "forged"))
        .await
        .unwrap_err();
    assert_eq!(known.code(), tonic::Code::Unauthenticated);
    assert_eq!(unknown.code(), tonic::Code::Unauthenticated);
}

#[tokio::test]
async fn unknown_path_with_a_space_is_reported_intact() {
    let addr = start_node().await;
    let mut client = LockerClient::connect(format!("http://{}", addr)).await.unwrap();

    let mut login = tonic::Request::new(LoginArgs {
        username: "access".into(),
        password: "secret".into(),
    });
    login
        .metadata_mut()
        .insert(RPC_PATH_METADATA_KEY, DISK1.parse().unwrap());
    let token = client.login(login).await.unwrap().into_inner().token;

    let missing = "/awsomefs/lock/mnt/my disk";
    let status = client.lock(lock_request(missing, &token)).await.unwrap_err();
    assert_eq!(
        LockError::from(status),
        LockError::UnknownCoordinator { path: missing.into() }
    );
}
