//! Error taxonomy for the law pipeline (spec §7).
//!
//! Each stage of the pipeline owns its own error type, mirroring
//! `agenticlaw-core`'s one-enum-per-concern style: callers convert the
//! structured error they care about and let `?` carry the rest, rather
//! than funneling everything through one crate-wide enum.

use thiserror::Error;

/// Template syntax or execution failure, scoped to a single file so a
/// render pass can keep going with the other files in a directory.
#[derive(Error, Debug)]
#[error("template error in {file}{}: {cause}", line.map(|l| format!(":{l}")).unwrap_or_default())]
pub struct TemplateError {
    pub file: String,
    pub line: Option<usize>,
    pub cause: String,
}

impl TemplateError {
    pub fn new(file: impl Into<String>, line: Option<usize>, cause: impl std::fmt::Display) -> Self {
        Self { file: file.into(), line, cause: cause.to_string() }
    }
}

/// YAML structural or field-parse failure; aborts the containing apply pass.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{file}: {path}: {cause}")]
    Field { file: String, path: String, cause: String },
    #[error("{file}: {conflict}")]
    Merge { file: String, conflict: String },
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DecodeError {
    pub fn field(file: impl Into<String>, path: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Field { file: file.into(), path: path.into(), cause: cause.to_string() }
    }

    pub fn merge(file: impl Into<String>, conflict: impl Into<String>) -> Self {
        Self::Merge { file: file.into(), conflict: conflict.into() }
    }
}

/// Unresolved dependency token, cycle, or duplicate identity — always fatal
/// for the whole graph-construction step.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("unresolved dependency token: {0}")]
    UnresolvedToken(String),
    #[error("duplicate law identity: {0}")]
    DuplicateIdentity(String),
    #[error("dependency cycle among: {}", .vertices_on_cycle.join(" -> "))]
    Cycle { vertices_on_cycle: Vec<String> },
}

/// Driver failure. Transient kinds are logged and the vertex retried by a
/// later apply pass; permanent kinds stop the offending subtree (spec §7).
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("transient error: {0}")]
    Transient(String),
    #[error("permanent error: {0}")]
    Permanent(String),
}

impl ResourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn transient(msg: impl std::fmt::Display) -> Self {
        Self::Transient(msg.to_string())
    }

    pub fn permanent(msg: impl std::fmt::Display) -> Self {
        Self::Permanent(msg.to_string())
    }
}

impl From<std::io::Error> for ResourceError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::PermissionDenied => Self::Permanent(format!("permission denied: {e}")),
            ErrorKind::NotFound => Self::Permanent(format!("not found: {e}")),
            _ => Self::Transient(e.to_string()),
        }
    }
}

/// Umbrella error for one end-to-end render-decode-graph pass, used by the
/// `local lint/pretend/apply` CLI surface to report a single failure
/// regardless of which pipeline stage produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
