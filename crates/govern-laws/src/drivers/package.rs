//! `Package` driver (spec §4.E): distro-family switch over `apk`/`dpkg`.

use async_trait::async_trait;
use govern_facts::Facts;
use std::process::{Command, Stdio};

use crate::error::ResourceError;
use crate::model::{ChangeReport, Package, Resource};

impl Package {
    fn is_installed(&self, family: &str) -> Result<bool, ResourceError> {
        match family {
            "alpine" => {
                let status = Command::new("apk")
                    .args(["info", "-e", &self.name])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()?;
                if !status.success() {
                    return Ok(false);
                }
                if self.version.is_empty() {
                    return Ok(true);
                }
                let output = Command::new("apk").args(["info", "-a", &self.name]).output()?;
                let text = String::from_utf8_lossy(&output.stdout);
                Ok(text.contains(&self.version))
            }
            "debian" => {
                let output = Command::new("dpkg-query")
                    .args(["-W", "-f", "${Version}", &self.name])
                    .output()?;
                Ok(output.status.success() && !output.stdout.is_empty())
            }
            other => Err(ResourceError::permanent(format!("unsupported distro family for package driver: {other}"))),
        }
    }

    fn install(&self, family: &str) -> Result<(), ResourceError> {
        let status = match family {
            "alpine" => {
                let spec = if self.version.is_empty() { self.name.clone() } else { format!("{}={}", self.name, self.version) };
                Command::new("apk").args(["add", &spec]).status()?
            }
            "debian" => Command::new("apt-get").args(["install", "-y", &self.name]).status()?,
            other => return Err(ResourceError::permanent(format!("unsupported distro family for package driver: {other}"))),
        };
        if !status.success() {
            return Err(ResourceError::transient(format!("package install of {} exited with {:?}", self.name, status.code())));
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for Package {
    async fn ensure(&self, dry_run: bool, facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let family = facts.distro.family.as_str();
        let installed = self.is_installed(family)?;

        if installed == self.installed {
            return Ok(ChangeReport::Unchanged);
        }

        if !self.installed {
            // Removal is out of scope for the driver contract in spec
            // §4.E (only installation is specified); report only.
            return Ok(ChangeReport::WouldChange { reason: format!("{} is installed but installed=false; removal not implemented", self.name) });
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would install {}", self.name) });
        }

        self.install(family)?;
        Ok(ChangeReport::Changed { summary: format!("installed {}", self.name) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_family_is_permanent_error() {
        let law = Package { name: "vim".into(), ..Default::default() };
        let err = law.is_installed("rhel").unwrap_err();
        assert!(matches!(err, ResourceError::Permanent(_)));
    }
}
