//! Shared wire types and error taxonomy for Govern.

pub mod error;
pub mod ids;
pub mod wire;

pub use error::{Error, Result};
pub use ids::{ReplicaId, ShardId};
pub use wire::*;
