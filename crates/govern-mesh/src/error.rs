//! Error taxonomy for the cluster coordination layer (spec §7).

use thiserror::Error;

/// Propose/commit/timeout failures from the replicated log. Bubbles to the
/// HTTP handler as a 500 with the error text (spec §7 propagation policy).
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("no leader is currently known")]
    NoLeader,
    #[error("this replica ({0}) is not the leader")]
    NotLeader(u64),
    #[error("proposal timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("replication to a majority of {0} replicas failed")]
    ReplicationFailed(usize),
    #[error("`--join` requires at least one entry in `--initial-members`")]
    JoinWithoutPeers,
    #[error("election failed: {0}")]
    Election(String),
    #[error("snapshot I/O error: {0}")]
    Snapshot(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Method, body, or routing failure surfaced by the control API as a 4xx
/// response (spec §7).
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("malformed request body: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            HttpError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Consensus(_) | HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
