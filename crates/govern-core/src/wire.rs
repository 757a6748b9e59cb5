//! Wire types shared between the control API, the replicated log, and the
//! command state machine. Mirrors the JSON shapes a peer or client sends
//! over HTTP, so every field here is `serde`-round-trippable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The three command kinds a replica can execute.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Exec,
    Facts,
    ApplyLaws,
}

/// A single proposed/executed unit of work, identified by `id`.
///
/// `id` is generated once, at creation time (see [`Command::new`]), rather
/// than left to be filled in downstream — an empty `id` reaching the state
/// machine is a caller bug, not a case to special-case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CommandType,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl Command {
    pub fn new(kind: CommandType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// As `new`, but keeps a caller-supplied id if non-empty, generating one
    /// only when absent — the behavior the control API needs for `/command`
    /// and `/broadcast`, which accept an optional client-chosen id.
    pub fn with_id(kind: CommandType, payload: serde_json::Value, id: Option<String>) -> Self {
        let mut cmd = Self::new(kind, payload);
        if let Some(id) = id.filter(|s| !s.is_empty()) {
            cmd.id = id;
        }
        cmd
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecPayload {
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FactsPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApplyLawsPayload {
    pub law_files: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Outcome of executing a [`Command`], recorded against its id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandResult {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl CommandResult {
    pub fn ok(id: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            output: Some(output),
            error: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn err(id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            id: id.into(),
            success: false,
            output: None,
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Leader,
    Follower,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub address: String,
    pub status: NodeStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshStatus {
    pub node_id: u64,
    pub shard_id: u64,
    pub is_leader: bool,
    pub nodes: Vec<Node>,
    pub timestamp: DateTime<Utc>,
}
