//! Internal raft RPC wire types, exchanged over each replica's
//! `raft_address` — distinct from the control API's JSON surface on
//! `http_address` (spec §4.G/§4.I keep these two address spaces separate).

use serde::{Deserialize, Serialize};

use crate::wal::LogEntry;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestVoteRequest {
    pub term: u64,
    pub candidate_id: u64,
    pub last_log_index: u64,
    pub last_log_term: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestVoteResponse {
    pub term: u64,
    pub vote_granted: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppendEntriesRequest {
    pub term: u64,
    pub leader_id: u64,
    pub prev_log_index: u64,
    pub prev_log_term: u64,
    pub entries: Vec<LogEntry>,
    pub leader_commit: u64,
    /// The leader's current membership, piggybacked on every heartbeat so
    /// a join accepted by the leader reaches the rest of the cluster
    /// without a dedicated membership-replication path.
    pub membership: std::collections::BTreeMap<u64, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppendEntriesResponse {
    pub term: u64,
    pub success: bool,
    pub match_index: u64,
}

/// Membership-change payload. Applied directly to the leader's in-memory
/// membership (not routed through `propose`); reaches the rest of the
/// cluster via the `membership` map piggybacked on every subsequent
/// `AppendEntriesRequest`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub replica_id: u64,
    pub raft_address: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_hint: Option<String>,
    pub membership: std::collections::BTreeMap<u64, String>,
}
