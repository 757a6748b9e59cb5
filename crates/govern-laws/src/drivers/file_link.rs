//! `FileLink` driver (spec §4.E): symbolic or hard link. Pre-existing
//! targets are never removed by this driver.

use async_trait::async_trait;
use govern_facts::Facts;
use std::path::Path;

use crate::error::ResourceError;
use crate::model::{ChangeReport, FileLink, Resource};

#[async_trait]
impl Resource for FileLink {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let path = Path::new(&self.name);

        if self.symbolic {
            if let Ok(existing) = std::fs::read_link(path) {
                if existing == Path::new(&self.target) {
                    return Ok(ChangeReport::Unchanged);
                }
            }
        } else if path.exists() {
            // A hard link's identity can't be distinguished from a plain
            // file without comparing inode numbers against the target;
            // treat existence as converged, matching the driver contract's
            // "does not remove pre-existing targets" rule.
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would link {} -> {}", self.name, self.target) });
        }

        if self.symbolic {
            if path.exists() || path.symlink_metadata().is_ok() {
                std::fs::remove_file(path)?;
            }
            std::os::unix::fs::symlink(&self.target, path)?;
        } else {
            std::fs::hard_link(&self.target, path)?;
        }

        Ok(ChangeReport::Changed { summary: format!("linked {} -> {}", self.name, self.target) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::minimal_facts;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_symlink() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::write(&target, "x").unwrap();
        let link = dir.path().join("link");
        let law = FileLink {
            name: link.to_string_lossy().into_owned(),
            target: target.to_string_lossy().into_owned(),
            symbolic: true,
            ..Default::default()
        };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert!(matches!(report, ChangeReport::Changed { .. }));
        assert_eq!(std::fs::read_link(&link).unwrap(), target);
    }

    #[tokio::test]
    async fn existing_correct_symlink_is_unchanged() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::write(&target, "x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let law = FileLink {
            name: link.to_string_lossy().into_owned(),
            target: target.to_string_lossy().into_owned(),
            symbolic: true,
            ..Default::default()
        };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(report, ChangeReport::Unchanged);
    }
}
