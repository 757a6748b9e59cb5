//! Law pipeline: template rendering, decoding, dependency graph, resource
//! drivers, and the sequential orchestrator (spec §4.B–§4.F).
//!
//! `load_and_apply` ties the whole pipeline together for the CLI surface's
//! `local lint`/`pretend`/`apply` subcommands; `decode`/`graph`/
//! `orchestrator` are also exposed individually for finer-grained use
//! (e.g. the mesh's `apply_laws` command handler, which needs to decode a
//! specific list of files rather than a whole directory).

pub mod decode;
pub mod drivers;
pub mod error;
pub mod graph;
pub mod model;
pub mod orchestrator;
pub mod template;

#[cfg(test)]
mod test_support;

pub use error::{DecodeError, GraphError, PipelineError, ResourceError, TemplateError};
pub use model::{ChangeReport, Law, LawSet, LawVertex, Resource};
pub use orchestrator::{apply, ApplyReport, VertexOutcome};

use std::path::Path;

use govern_facts::Facts;

/// Render+decode every law file under `path`, then schedule and apply them
/// in dependency order. This is the single entry point `local lint`,
/// `local pretend`, and `local apply` all drive (differing only in
/// `dry_run`, and `lint` which stops after scheduling).
pub async fn load_and_apply(path: &Path, facts: &Facts, dry_run: bool) -> Result<ApplyReport, PipelineError> {
    let laws = decode::load(path, facts)?;
    let report = orchestrator::apply(&laws, facts, dry_run).await?;
    Ok(report)
}

/// Render+decode every law file under `path` and schedule it without
/// applying anything — `local lint`'s contract.
pub fn load_and_lint(path: &Path, facts: &Facts) -> Result<usize, PipelineError> {
    let laws = decode::load(path, facts)?;
    let scheduled = graph::schedule(&laws)?;
    Ok(scheduled.len())
}
