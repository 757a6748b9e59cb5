//! `Container` driver (spec §4.E): presence via the local container
//! runtime CLI (`docker`), pulling and creating as needed. `dry_run` only
//! logs intent, matching the driver contract.

use async_trait::async_trait;
use govern_facts::Facts;
use std::time::Duration;
use tokio::process::Command;

use crate::error::ResourceError;
use crate::model::{ChangeReport, Container, Resource};

/// Bounds the docker CLI round-trips this driver shells out to, same
/// rationale as `script.rs`'s `SCRIPT_TIMEOUT` (spec §5).
const DOCKER_TIMEOUT: Duration = Duration::from_secs(300);

async fn with_timeout(cmd: &mut Command) -> Result<std::process::Output, ResourceError> {
    cmd.kill_on_drop(true);
    tokio::time::timeout(DOCKER_TIMEOUT, cmd.output())
        .await
        .map_err(|_| ResourceError::transient(format!("docker command timed out after {DOCKER_TIMEOUT:?}")))?
        .map_err(ResourceError::from)
}

async fn container_running(name: &str) -> Result<bool, ResourceError> {
    let mut cmd = Command::new("docker");
    cmd.args(["inspect", "-f", "{{.State.Running}}", name]);
    let output = with_timeout(&mut cmd).await?;
    if !output.status.success() {
        return Ok(false);
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
}

async fn image_cached(image: &str) -> Result<bool, ResourceError> {
    let mut cmd = Command::new("docker");
    cmd.args(["image", "inspect", image]);
    let output = with_timeout(&mut cmd).await?;
    Ok(output.status.success())
}

#[async_trait]
impl Resource for Container {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let running = container_running(&self.name).await?;

        if running == self.running {
            return Ok(ChangeReport::Unchanged);
        }

        if !self.running {
            // Stopping a container is out of scope for this driver
            // contract (only presence+start is specced); report only.
            return Ok(ChangeReport::WouldChange { reason: format!("{} is running but running=false; stop not implemented", self.name) });
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would pull/create/start {}", self.name) });
        }

        if !image_cached(&self.image).await? {
            let mut cmd = Command::new("docker");
            cmd.args(["pull", &self.image]);
            let output = with_timeout(&mut cmd).await?;
            if !output.status.success() {
                return Err(ResourceError::transient(format!("docker pull of {} exited with {:?}", self.image, output.status.code())));
            }
        }

        let mut cmd = Command::new("docker");
        cmd.args(["run", "-d", "--name", &self.name]);
        if self.privileged {
            cmd.arg("--privileged");
        }
        for (key, value) in &self.labels {
            cmd.arg("--label").arg(format!("{key}={value}"));
        }
        for volume in &self.volumes {
            cmd.arg("-v").arg(volume);
        }
        for (key, value) in &self.environment {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        if let Some(network) = &self.network {
            cmd.arg("--network").arg(network);
        }
        if let Some(policy) = &self.restart_policy {
            cmd.arg("--restart").arg(policy);
        }
        if let Some(healthcheck) = &self.healthcheck {
            cmd.arg("--health-cmd").arg(healthcheck);
        }
        cmd.arg(&self.image);

        let output = with_timeout(&mut cmd).await?;
        if !output.status.success() {
            return Err(ResourceError::transient(format!("docker run of {} exited with {:?}", self.name, output.status.code())));
        }

        Ok(ChangeReport::Changed { summary: format!("started container {}", self.name) })
    }
}
