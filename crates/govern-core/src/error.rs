//! Crate-wide error taxonomy shared by wire-level consumers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown command type: {0}")]
    UnknownCommandType(String),
}

pub type Result<T> = std::result::Result<T, Error>;
