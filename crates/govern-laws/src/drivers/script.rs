//! `Script` driver (spec §4.E): run a shell over an inline body or a
//! downloaded URL, skipped entirely when any `creates` path exists.

use async_trait::async_trait;
use govern_facts::Facts;
use std::time::Duration;
use tokio::process::Command;

use crate::error::ResourceError;
use crate::model::{ChangeReport, Resource, Script};

/// No external deadline is threaded into a local `ensure` call (only
/// mesh-dispatched `exec` commands carry a caller deadline per spec §5);
/// this bounds a runaway script so one driver can't hang an entire apply
/// pass indefinitely.
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(300);

fn parse_run_as(spec: &str) -> Result<(u32, u32), ResourceError> {
    let (uid, gid) = spec
        .split_once(':')
        .ok_or_else(|| ResourceError::permanent(format!("run_as must be uid:gid, got {spec:?}")))?;
    let uid: u32 = uid.parse().map_err(|_| ResourceError::permanent(format!("invalid uid in run_as: {uid}")))?;
    let gid: u32 = gid.parse().map_err(|_| ResourceError::permanent(format!("invalid gid in run_as: {gid}")))?;
    Ok((uid, gid))
}

#[async_trait]
impl Resource for Script {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        if self.creates.iter().any(|p| std::path::Path::new(p).exists()) {
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would run script {}", self.name) });
        }

        let script_path = if self.script.starts_with("http://") || self.script.starts_with("https://") {
            let body = reqwest::get(&self.script)
                .await
                .map_err(|e| ResourceError::transient(format!("downloading script: {e}")))?
                .bytes()
                .await
                .map_err(|e| ResourceError::transient(format!("reading script body: {e}")))?;
            let tmp = std::env::temp_dir().join(format!("govern-script-{}", uuid::Uuid::new_v4()));
            std::fs::write(&tmp, &body)?;
            Some(tmp)
        } else {
            None
        };

        let mut cmd = Command::new(&self.shell);
        match &script_path {
            Some(path) => {
                cmd.arg(path);
            }
            None => {
                cmd.arg("-c").arg(&self.script);
            }
        }

        if let Some(run_as) = &self.run_as {
            let (uid, gid) = parse_run_as(run_as)?;
            cmd.uid(uid).gid(gid);
        }
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(SCRIPT_TIMEOUT, cmd.output())
            .await
            .map_err(|_| ResourceError::transient(format!("script {} timed out after {SCRIPT_TIMEOUT:?}", self.name)))??;

        if let Some(path) = &script_path {
            let _ = std::fs::remove_file(path);
        }

        if !output.status.success() {
            return Err(ResourceError::transient(format!(
                "script {} exited with {:?}: {}",
                self.name,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(ChangeReport::Changed { summary: format!("ran script {}", self.name) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::minimal_facts;
    use tempfile::tempdir;

    #[tokio::test]
    async fn skipped_when_creates_path_exists() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("marker");
        std::fs::write(&marker, "x").unwrap();
        let law = Script {
            name: "s".into(),
            script: "echo hi".into(),
            creates: vec![marker.to_string_lossy().into_owned()],
            ..Default::default()
        };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(report, ChangeReport::Unchanged);
    }

    #[tokio::test]
    async fn runs_inline_body() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let law = Script { name: "s".into(), script: format!("echo ran > {}", out.display()), ..Default::default() };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert!(matches!(report, ChangeReport::Changed { .. }));
        assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "ran");
    }

    #[test]
    fn rejects_malformed_run_as() {
        let err = parse_run_as("not-a-uid").unwrap_err();
        assert!(matches!(err, ResourceError::Permanent(_)));
    }
}
