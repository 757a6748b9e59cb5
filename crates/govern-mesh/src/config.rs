//! Consensus replica configuration (spec §4.G).

use std::collections::BTreeMap;
use std::path::PathBuf;

use govern_core::{ReplicaId, ShardId};

/// Mirrors `pkg/mesh/service.go`'s `Config` — see `DESIGN.md` and
/// `SPEC_FULL.md` §1.3 for the field-default provenance.
#[derive(Clone, Debug)]
pub struct MeshConfig {
    /// Non-zero identity of this replica within its shard.
    pub replica_id: ReplicaId,
    pub shard_id: ShardId,
    /// Address this replica's internal raft RPC (vote/append-entries)
    /// listens on — distinct from the control API's `http_address`.
    pub raft_address: String,
    /// Address the HTTP control API (§4.I) listens on.
    pub http_address: String,
    pub data_dir: PathBuf,
    /// Starting membership: `replica_id -> raft_address`.
    pub initial_members: BTreeMap<u64, String>,
    /// When true, contact a peer named in `initial_members` to join an
    /// existing shard rather than bootstrapping a new one.
    pub join: bool,
    pub rtt_ms: u64,
    pub election_rtt: u64,
    pub heartbeat_rtt: u64,
    pub snapshot_entries: u64,
    pub compaction_overhead: u64,
}

impl MeshConfig {
    pub fn default_data_dir() -> PathBuf {
        dirs_home().join(".govern").join("mesh-data")
    }

    /// `<data_dir>/node<replica_id>/` — the only persistent state the core
    /// writes (spec §6 "Persisted state").
    pub fn node_dir(&self) -> PathBuf {
        self.data_dir.join(format!("node{}", self.replica_id.get()))
    }

    pub fn election_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.rtt_ms * self.election_rtt)
    }

    pub fn heartbeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.rtt_ms * self.heartbeat_rtt)
    }

    /// Default status-worker period: the original's 30s ticker (spec
    /// §4.G), independent of `election_rtt`.
    pub fn status_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    /// Validate the `--join` / `--initial-members` interaction (spec §8
    /// boundary behavior: refuses to start with empty members on join).
    pub fn validate(&self) -> Result<(), crate::error::ConsensusError> {
        if self.join && self.initial_members.is_empty() {
            return Err(crate::error::ConsensusError::JoinWithoutPeers);
        }
        Ok(())
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            replica_id: ReplicaId::new(1),
            shard_id: ShardId::default(),
            raft_address: "127.0.0.1:7000".to_string(),
            http_address: "127.0.0.1:8000".to_string(),
            data_dir: Self::default_data_dir(),
            initial_members: BTreeMap::new(),
            join: false,
            rtt_ms: 200,
            election_rtt: 10,
            heartbeat_rtt: 1,
            snapshot_entries: 10,
            compaction_overhead: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_without_members_is_rejected() {
        let config = MeshConfig { join: true, initial_members: BTreeMap::new(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn join_with_members_is_accepted() {
        let mut members = BTreeMap::new();
        members.insert(2, "127.0.0.1:7001".to_string());
        let config = MeshConfig { join: true, initial_members: members, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
