//! Leader-elected replicated log (spec §4.G) — see `replica.rs` for the
//! protocol and `server.rs` for the internal RPC transport.

pub mod replica;
pub mod rpc;
pub mod server;

pub use replica::{ConsensusReplica, MembershipEntry, Role};
