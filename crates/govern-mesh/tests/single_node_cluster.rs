//! End-to-end behavior of a single-node mesh: election, propose/commit,
//! and the `/command` vs `/broadcast` control API contract (spec §8
//! scenario 4, scenario 6).

use std::time::Duration;

use govern_core::{ApplyLawsPayload, Command, CommandType, FactsPayload};
use govern_mesh::config::MeshConfig;
use govern_mesh::control::commands;
use govern_mesh::raft::ConsensusReplica;

fn fast_config(data_dir: std::path::PathBuf) -> MeshConfig {
    let mut members = std::collections::BTreeMap::new();
    members.insert(1, "127.0.0.1:19000".to_string());
    MeshConfig {
        replica_id: govern_core::ReplicaId::new(1),
        shard_id: govern_core::ShardId::default(),
        raft_address: "127.0.0.1:19000".to_string(),
        http_address: "127.0.0.1:19001".to_string(),
        data_dir,
        initial_members: members,
        join: false,
        rtt_ms: 15,
        election_rtt: 2,
        heartbeat_rtt: 1,
        snapshot_entries: 10,
        compaction_overhead: 5,
    }
}

async fn wait_for_leadership(replica: &std::sync::Arc<ConsensusReplica>) {
    for _ in 0..200 {
        if replica.is_leader().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("replica never became leader within the test's budget");
}

#[tokio::test]
async fn single_node_cluster_self_elects_leader() {
    let dir = tempfile::tempdir().unwrap();
    let replica = ConsensusReplica::start(fast_config(dir.path().to_path_buf())).await.unwrap();
    wait_for_leadership(&replica).await;
    let (leader_id, _, valid) = replica.get_leader().await;
    assert!(valid);
    assert_eq!(leader_id, 1);
}

#[tokio::test]
async fn propose_commits_and_grows_command_table() {
    let dir = tempfile::tempdir().unwrap();
    let replica = ConsensusReplica::start(fast_config(dir.path().to_path_buf())).await.unwrap();
    wait_for_leadership(&replica).await;

    let before = replica.command_count().await;
    let command = Command::new(CommandType::Facts, serde_json::to_value(FactsPayload::default()).unwrap());
    replica.propose(command, Duration::from_secs(2)).await.unwrap();
    assert_eq!(replica.command_count().await, before + 1);
}

#[tokio::test]
async fn non_leader_propose_is_rejected() {
    // A freshly started follower (before its election timer fires) must
    // reject `propose` rather than silently no-op.
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config(dir.path().to_path_buf());
    config.election_rtt = 1000; // never elects within this test's lifetime
    let replica = ConsensusReplica::start(config).await.unwrap();

    let command = Command::new(CommandType::Facts, serde_json::json!({}));
    let err = replica.propose(command, Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, govern_mesh::ConsensusError::NotLeader(_)));
}

#[tokio::test]
async fn dry_run_apply_laws_command_mutates_no_host_state() {
    let laws_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        laws_dir.path().join("law.yaml"),
        "files:\n  templates:\n    - name: /tmp/govern-mesh-test-dry-run\n      text: \"hi\\n\"\n",
    )
    .unwrap();

    let command = Command::new(
        CommandType::ApplyLaws,
        serde_json::to_value(ApplyLawsPayload { law_files: vec![], dry_run: true }).unwrap(),
    );
    let result = commands::execute(&command, Duration::from_secs(5), laws_dir.path()).await;
    assert!(result.success);
    assert!(!std::path::Path::new("/tmp/govern-mesh-test-dry-run").exists());
}
