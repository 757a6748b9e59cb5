//! HTTP control API (spec §4.I): `/status`, `/nodes`, `/command`,
//! `/broadcast`. JSON bodies, UTF-8, a `timeout` query parameter (seconds,
//! default 30) on the two command-dispatching routes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use govern_core::{Command, CommandResult, CommandType, MeshStatus, Node, NodeStatus};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::control::commands;
use crate::error::HttpError;
use crate::raft::ConsensusReplica;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct ControlState {
    pub replica: Arc<ConsensusReplica>,
    pub laws_root: PathBuf,
}

pub fn router(state: ControlState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/nodes", get(nodes_handler))
        .route("/command", post(command_handler))
        .route("/broadcast", post(broadcast_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

#[derive(Deserialize)]
struct TimeoutQuery {
    timeout: Option<u64>,
}

fn timeout_from(query: &TimeoutQuery) -> Duration {
    Duration::from_secs(query.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
}

async fn status_handler(State(state): State<ControlState>) -> Json<MeshStatus> {
    let nodes: Vec<Node> = state
        .replica
        .get_membership()
        .await
        .into_iter()
        .map(|m| Node {
            id: m.replica_id,
            address: m.address,
            status: if m.is_leader { NodeStatus::Leader } else { NodeStatus::Follower },
        })
        .collect();

    Json(MeshStatus {
        node_id: state.replica.replica_id(),
        shard_id: state.replica.shard_id(),
        is_leader: state.replica.is_leader().await,
        nodes,
        timestamp: Utc::now(),
    })
}

async fn nodes_handler(State(state): State<ControlState>) -> Json<Vec<Node>> {
    let nodes = state
        .replica
        .get_membership()
        .await
        .into_iter()
        .map(|m| Node {
            id: m.replica_id,
            address: m.address,
            status: if m.is_leader { NodeStatus::Leader } else { NodeStatus::Follower },
        })
        .collect();
    Json(nodes)
}

/// `POST /command` — execute locally, assigning an id if the caller left
/// it empty. Per Open Question (c), the command record is still proposed
/// through the replicated log so every replica's `commands` table stays
/// consistent (spec invariant: "replaying the replicated log ... yields a
/// bitwise-identical in-memory command table").
async fn command_handler(
    State(state): State<ControlState>,
    Query(query): Query<TimeoutQuery>,
    body: Result<Json<serde_json::Value>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<CommandResult>, HttpError> {
    let Json(body) = body.map_err(|e| HttpError::BadRequest(e.to_string()))?;
    let command = parse_command(body)?;
    let timeout = timeout_from(&query);

    let result = dispatch_one(&state, command, timeout).await?;
    Ok(Json(result))
}

/// `POST /broadcast` — propose, then execute locally; the response map is
/// keyed by this replica's id and currently contains only the local
/// result (spec §4.I).
async fn broadcast_handler(
    State(state): State<ControlState>,
    Query(query): Query<TimeoutQuery>,
    body: Result<Json<serde_json::Value>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<HashMap<String, CommandResult>>, HttpError> {
    let Json(body) = body.map_err(|e| HttpError::BadRequest(e.to_string()))?;
    let command = parse_command(body)?;
    let timeout = timeout_from(&query);

    let result = dispatch_one(&state, command, timeout).await?;
    let mut map = HashMap::new();
    map.insert(state.replica.replica_id().to_string(), result);
    Ok(Json(map))
}

async fn dispatch_one(state: &ControlState, command: Command, timeout: Duration) -> Result<CommandResult, HttpError> {
    if let Err(e) = state.replica.propose(command.clone(), timeout).await {
        error!(error = %e, "failed to propose command to the log");
        return Err(HttpError::Internal(e.to_string()));
    }
    let result = commands::execute(&command, timeout, &state.laws_root).await;
    state.replica.store_result(result.clone()).await;
    info!(id = %command.id, success = result.success, "command executed");
    Ok(result)
}

fn parse_command(body: serde_json::Value) -> Result<Command, HttpError> {
    let kind_str = body
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HttpError::BadRequest("missing `type` field".to_string()))?;
    let kind = match kind_str {
        "exec" => CommandType::Exec,
        "facts" => CommandType::Facts,
        "apply_laws" => CommandType::ApplyLaws,
        other => return Err(HttpError::BadRequest(format!("unknown command type: {other}"))),
    };
    let payload = body.get("payload").cloned().unwrap_or(serde_json::json!({}));
    let id = body.get("id").and_then(|v| v.as_str()).map(String::from);
    Ok(Command::with_id(kind, payload, id))
}
