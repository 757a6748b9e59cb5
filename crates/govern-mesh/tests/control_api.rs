//! Full HTTP round trip against an in-process control API server (spec
//! §4.I, §8 scenario 6).

use std::time::Duration;

use govern_core::CommandResult;
use govern_mesh::config::MeshConfig;
use govern_mesh::control::{router, ControlState};
use govern_mesh::raft::ConsensusReplica;

async fn spawn_server() -> (String, std::sync::Arc<ConsensusReplica>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut members = std::collections::BTreeMap::new();
    members.insert(1, "127.0.0.1:19100".to_string());
    let config = MeshConfig {
        replica_id: govern_core::ReplicaId::new(1),
        shard_id: govern_core::ShardId::default(),
        raft_address: "127.0.0.1:19100".to_string(),
        http_address: "127.0.0.1:0".to_string(),
        data_dir: dir.path().to_path_buf(),
        initial_members: members,
        join: false,
        rtt_ms: 15,
        election_rtt: 2,
        heartbeat_rtt: 1,
        snapshot_entries: 10,
        compaction_overhead: 5,
    };

    let replica = ConsensusReplica::start(config).await.unwrap();
    for _ in 0..200 {
        if replica.is_leader().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ControlState { replica: replica.clone(), laws_root: dir.path().to_path_buf() };
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("127.0.0.1:{}", addr.port()), replica, dir)
}

#[tokio::test]
async fn status_reports_self_as_leader() {
    let (addr, _replica, _dir) = spawn_server().await;
    let resp = reqwest::get(format!("http://{addr}/status")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["node_id"], 1);
    assert_eq!(body["is_leader"], true);
}

#[tokio::test]
async fn command_executes_facts_and_returns_success() {
    let (addr, _replica, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/command"))
        .json(&serde_json::json!({"type": "facts", "payload": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let result: CommandResult = resp.json().await.unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn broadcast_response_is_keyed_by_local_replica_id() {
    let (addr, replica, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/broadcast"))
        .json(&serde_json::json!({"type": "facts", "payload": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: std::collections::HashMap<String, CommandResult> = resp.json().await.unwrap();
    assert_eq!(body.len(), 1);
    assert!(body.contains_key(&replica.replica_id().to_string()));
}

#[tokio::test]
async fn malformed_command_body_is_bad_request() {
    let (addr, _replica, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/command"))
        .json(&serde_json::json!({"payload": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
