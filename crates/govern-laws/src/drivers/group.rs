//! `Group` driver (spec §4.E). GID mismatches are reported but not
//! forcibly fixed by default — see Open Question (a)'s resolution.

use async_trait::async_trait;
use govern_facts::Facts;
use std::process::Command;

use crate::error::ResourceError;
use crate::model::{ChangeReport, Group, Resource};

fn lookup_gid(name: &str) -> Option<u32> {
    let text = std::fs::read_to_string("/etc/group").ok()?;
    for line in text.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.first() == Some(&name) && fields.len() >= 3 {
            return fields[2].parse().ok();
        }
    }
    None
}

#[async_trait]
impl Resource for Group {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let Some(existing_gid) = lookup_gid(&self.name) else {
            if dry_run {
                return Ok(ChangeReport::WouldChange { reason: format!("would create group {}", self.name) });
            }
            let mut cmd = Command::new("groupadd");
            if self.system {
                cmd.arg("-r");
            }
            if let Some(gid) = self.gid {
                cmd.arg("-g").arg(gid.to_string());
            }
            cmd.arg(&self.name);
            let status = cmd.status()?;
            if !status.success() {
                return Err(ResourceError::transient(format!("group creation for {} exited with {:?}", self.name, status.code())));
            }
            return Ok(ChangeReport::Changed { summary: format!("created group {}", self.name) });
        };

        let Some(expected_gid) = self.gid else {
            return Ok(ChangeReport::Unchanged);
        };

        if expected_gid == existing_gid {
            return Ok(ChangeReport::Unchanged);
        }

        let reason = format!("gid {existing_gid} != {expected_gid}");
        if dry_run || !self.reconcile_mismatches {
            return Ok(ChangeReport::WouldChange { reason });
        }

        let status = Command::new("groupmod").arg("-g").arg(expected_gid.to_string()).arg(&self.name).status()?;
        if !status.success() {
            return Err(ResourceError::transient(format!("group reconcile for {} exited with {:?}", self.name, status.code())));
        }
        Ok(ChangeReport::Changed { summary: format!("reconciled group {}: {}", self.name, reason) })
    }
}
