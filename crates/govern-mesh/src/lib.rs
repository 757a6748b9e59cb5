//! Cluster coordination: consensus replica (§4.G), command state machine
//! (§4.H), and the HTTP control API (§4.I) — the "cluster coordination"
//! half of the system (spec §1).

pub mod config;
pub mod control;
pub mod error;
pub mod raft;
pub mod state_machine;
pub mod wal;

pub use config::MeshConfig;
pub use control::{router, ControlState, MeshClient};
pub use error::{ConsensusError, HttpError};
pub use raft::{ConsensusReplica, MembershipEntry, Role};
pub use state_machine::{CommandStateMachine, LookupQuery, LookupResult};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Start the consensus replica and both HTTP servers (internal raft RPC on
/// `raft_address`, control API on `http_address`), then block until
/// `shutdown` is cancelled. This is `mesh start`'s entire body (spec §6).
pub async fn run_mesh(config: MeshConfig, laws_root: PathBuf, shutdown: CancellationToken) -> anyhow::Result<()> {
    let replica = ConsensusReplica::start(config.clone()).await?;

    let raft_listener = tokio::net::TcpListener::bind(&config.raft_address).await?;
    let raft_app = raft::server::router(replica.clone());
    let raft_shutdown = shutdown.clone();
    info!(address = %config.raft_address, replica_id = replica.replica_id(), "raft RPC listening");
    let raft_task = tokio::spawn(async move {
        axum::serve(raft_listener, raft_app)
            .with_graceful_shutdown(async move { raft_shutdown.cancelled().await })
            .await
    });

    let control_listener = tokio::net::TcpListener::bind(&config.http_address).await?;
    let control_state = ControlState { replica: replica.clone(), laws_root };
    let control_app = control::router(control_state);
    let control_shutdown = shutdown.clone();
    info!(address = %config.http_address, "control API listening");
    let control_task = tokio::spawn(async move {
        axum::serve(control_listener, control_app)
            .with_graceful_shutdown(async move { control_shutdown.cancelled().await })
            .await
    });

    shutdown.cancelled().await;
    info!("shutdown requested, draining in-flight work");

    // Bounded 30s grace period (spec §5): give the servers a chance to
    // finish in-flight requests, then persist a snapshot regardless.
    let _ = tokio::time::timeout(Duration::from_secs(30), async {
        let _ = raft_task.await;
        let _ = control_task.await;
    })
    .await;

    replica.shutdown().await?;
    info!("mesh replica shut down cleanly");
    Ok(())
}
