//! HTTP control API (spec §4.I): the axum server peers and CLI operators
//! talk to, plus the client used by `mesh status`/`nodes`/`exec`/`facts`/
//! `apply`.

pub mod client;
pub mod commands;
pub mod server;

pub use client::MeshClient;
pub use server::{router, ControlState};
