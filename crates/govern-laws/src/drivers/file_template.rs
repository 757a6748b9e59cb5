//! `FileTemplate` driver (spec §4.E).

use async_trait::async_trait;
use govern_facts::Facts;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::ResourceError;
use crate::model::{ChangeReport, FileTemplate, Resource};

#[async_trait]
impl Resource for FileTemplate {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let path = Path::new(&self.name);
        let existing = std::fs::read(path).ok();
        let mode_matches = |p: &Path| -> bool {
            std::fs::metadata(p)
                .map(|m| m.permissions().mode() & 0o7777 == self.mode)
                .unwrap_or(false)
        };

        let contents_match = existing.as_deref() == Some(self.text.as_bytes());
        if contents_match && mode_matches(path) {
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            let reason = if existing.is_none() {
                format!("would create {}", self.name)
            } else {
                format!("would rewrite {} (contents or mode differ)", self.name)
            };
            return Ok(ChangeReport::WouldChange { reason });
        }

        if self.make_dir {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
                let mut perms = std::fs::metadata(parent)?.permissions();
                perms.set_mode(0o755);
                std::fs::set_permissions(parent, perms)?;
            }
        }

        if self.backup && path.exists() {
            let backup_path = format!("{}.bak", self.name);
            std::fs::rename(path, &backup_path)?;
        }

        std::fs::write(path, &self.text)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(self.mode))?;

        Ok(ChangeReport::Changed {
            summary: format!("wrote {} ({} bytes, mode {:o})", self.name, self.text.len(), self.mode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::minimal_facts;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t");
        let law = FileTemplate { name: path.to_string_lossy().into_owned(), text: "hi\n".into(), mode: 0o644, ..Default::default() };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert!(matches!(report, ChangeReport::Changed { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi\n");
    }

    #[tokio::test]
    async fn second_apply_is_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t");
        let law = FileTemplate { name: path.to_string_lossy().into_owned(), text: "hi\n".into(), mode: 0o644, ..Default::default() };
        law.ensure(false, &minimal_facts()).await.unwrap();
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(report, ChangeReport::Unchanged);
    }

    #[tokio::test]
    async fn dry_run_does_not_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t");
        let law = FileTemplate { name: path.to_string_lossy().into_owned(), text: "hi\n".into(), mode: 0o644, ..Default::default() };
        let report = law.ensure(true, &minimal_facts()).await.unwrap();
        assert!(matches!(report, ChangeReport::WouldChange { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn backup_preserves_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t");
        std::fs::write(&path, "old\n").unwrap();
        let law = FileTemplate {
            name: path.to_string_lossy().into_owned(),
            text: "new\n".into(),
            mode: 0o644,
            backup: true,
            ..Default::default()
        };
        law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(std::fs::read_to_string(format!("{}.bak", path.display())).unwrap(), "old\n");
    }
}
