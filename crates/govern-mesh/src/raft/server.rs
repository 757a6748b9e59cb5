//! Internal raft RPC server, bound to `raft_address`. Separate from the
//! control API's `http_address` server in `control/server.rs` — the two
//! address spaces are distinct CLI flags (spec §6 `mesh start`).

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use crate::raft::replica::ConsensusReplica;
use crate::raft::rpc::{AppendEntriesRequest, AppendEntriesResponse, JoinRequest, JoinResponse, RequestVoteRequest, RequestVoteResponse};

pub fn router(replica: Arc<ConsensusReplica>) -> Router {
    Router::new()
        .route("/raft/vote", post(vote_handler))
        .route("/raft/append_entries", post(append_entries_handler))
        .route("/raft/join", post(join_handler))
        .with_state(replica)
}

async fn vote_handler(
    State(replica): State<Arc<ConsensusReplica>>,
    Json(req): Json<RequestVoteRequest>,
) -> Json<RequestVoteResponse> {
    Json(replica.handle_request_vote(req).await)
}

async fn append_entries_handler(
    State(replica): State<Arc<ConsensusReplica>>,
    Json(req): Json<AppendEntriesRequest>,
) -> Json<AppendEntriesResponse> {
    Json(replica.handle_append_entries(req).await)
}

async fn join_handler(
    State(replica): State<Arc<ConsensusReplica>>,
    Json(req): Json<JoinRequest>,
) -> Json<JoinResponse> {
    Json(replica.handle_join(req).await)
}
