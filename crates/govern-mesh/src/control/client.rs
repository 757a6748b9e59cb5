//! HTTP client for the control API (spec §4.I, §6 "mesh status"/"nodes"/
//! "exec"/"facts"/"apply"). Used by the `govern` CLI's `mesh` subcommands
//! to talk to a running peer.

use std::collections::HashMap;
use std::time::Duration;

use govern_core::{Command, CommandResult, CommandType, MeshStatus, Node};

use crate::error::HttpError;

pub struct MeshClient {
    http: reqwest::Client,
    node_address: String,
}

impl MeshClient {
    pub fn new(node_address: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), node_address: node_address.into() }
    }

    pub async fn status(&self) -> Result<MeshStatus, HttpError> {
        self.get_json("/status").await
    }

    pub async fn nodes(&self) -> Result<Vec<Node>, HttpError> {
        self.get_json("/nodes").await
    }

    /// `POST /command` with an already-serialized payload — the CLI builds
    /// `ExecPayload`/`FactsPayload`/`ApplyLawsPayload` itself and hands the
    /// encoded value here, since every `mesh` subcommand also needs the
    /// `--broadcast` choice between this and [`Self::broadcast`].
    pub async fn dispatch(&self, kind: CommandType, payload: serde_json::Value, timeout: Duration) -> Result<CommandResult, HttpError> {
        self.post_command(kind, payload, timeout).await
    }

    pub async fn broadcast(
        &self,
        kind: CommandType,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<HashMap<String, CommandResult>, HttpError> {
        let command = Command::new(kind, payload);
        let url = format!("http://{}/broadcast?timeout={}", self.node_address, timeout.as_secs());
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({"id": command.id, "type": kind_str(kind), "payload": command.payload}))
            .send()
            .await
            .map_err(|e| HttpError::Internal(e.to_string()))?;
        resp.json().await.map_err(|e| HttpError::Internal(e.to_string()))
    }

    async fn post_command(&self, kind: CommandType, payload: serde_json::Value, timeout: Duration) -> Result<CommandResult, HttpError> {
        let url = format!("http://{}/command?timeout={}", self.node_address, timeout.as_secs());
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({"type": kind_str(kind), "payload": payload}))
            .send()
            .await
            .map_err(|e| HttpError::Internal(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HttpError::Internal(format!("{status}: {text}")));
        }
        resp.json().await.map_err(|e| HttpError::Internal(e.to_string()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let url = format!("http://{}{}", self.node_address, path);
        let resp = self.http.get(&url).send().await.map_err(|e| HttpError::Internal(e.to_string()))?;
        resp.json().await.map_err(|e| HttpError::Internal(e.to_string()))
    }
}

fn kind_str(kind: CommandType) -> &'static str {
    match kind {
        CommandType::Exec => "exec",
        CommandType::Facts => "facts",
        CommandType::ApplyLaws => "apply_laws",
    }
}
