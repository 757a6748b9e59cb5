//! `Service` driver (spec §4.E): distro-specific status probe, exit code
//! 0 → started, 3 → stopped; transitions and run-level persistence shell
//! out to the distro-appropriate init tooling.

use async_trait::async_trait;
use govern_facts::Facts;
use std::process::Command;

use crate::error::ResourceError;
use crate::model::{ChangeReport, Resource, Service};

fn probe_state(name: &str, init_system: &str) -> Result<String, ResourceError> {
    let status = match init_system {
        "openrc" => Command::new("rc-service").args([name, "status"]).status()?,
        "systemd" => Command::new("systemctl").args(["is-active", name]).status()?,
        other => return Err(ResourceError::permanent(format!("unsupported init system for service driver: {other}"))),
    };
    match status.code() {
        Some(0) => Ok("started".to_string()),
        Some(3) => Ok("stopped".to_string()),
        other => Err(ResourceError::transient(format!("unexpected status probe exit code for {name}: {other:?}"))),
    }
}

fn transition(name: &str, state: &str, init_system: &str) -> Result<(), ResourceError> {
    let action = match state {
        "started" => "start",
        "stopped" => "stop",
        other => return Err(ResourceError::permanent(format!("unsupported service state: {other}"))),
    };
    let status = match init_system {
        "openrc" => Command::new("rc-service").args([name, action]).status()?,
        "systemd" => Command::new("systemctl").args([action, name]).status()?,
        other => return Err(ResourceError::permanent(format!("unsupported init system for service driver: {other}"))),
    };
    if !status.success() {
        return Err(ResourceError::transient(format!("service {action} of {name} exited with {:?}", status.code())));
    }
    Ok(())
}

fn persist(name: &str, run_level: &str, init_system: &str) -> Result<(), ResourceError> {
    let status = match init_system {
        "openrc" => Command::new("rc-update").args(["add", name, run_level]).status()?,
        "systemd" => Command::new("systemctl").args(["enable", name]).status()?,
        other => return Err(ResourceError::permanent(format!("unsupported init system for service driver: {other}"))),
    };
    if !status.success() {
        return Err(ResourceError::transient(format!("persisting service {name} exited with {:?}", status.code())));
    }
    Ok(())
}

#[async_trait]
impl Resource for Service {
    async fn ensure(&self, dry_run: bool, facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let current = probe_state(&self.name, &facts.init_system)?;

        if current == self.state {
            if self.persistent && !dry_run {
                persist(&self.name, &self.run_level, &facts.init_system)?;
            }
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would transition {} from {current} to {}", self.name, self.state) });
        }

        transition(&self.name, &self.state, &facts.init_system)?;
        if self.persistent {
            persist(&self.name, &self.run_level, &facts.init_system)?;
        }

        Ok(ChangeReport::Changed { summary: format!("transitioned {} from {current} to {}", self.name, self.state) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_init_system() {
        let err = probe_state("nginx", "upstart").unwrap_err();
        assert!(matches!(err, ResourceError::Permanent(_)));
    }

    #[test]
    fn rejects_unsupported_state() {
        let err = transition("nginx", "paused", "systemd").unwrap_err();
        assert!(matches!(err, ResourceError::Permanent(_)));
    }
}
