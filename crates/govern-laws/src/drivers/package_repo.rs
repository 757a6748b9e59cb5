//! `PackageRepo` driver (spec §4.E): Alpine repo-list line + keyring file;
//! Debian is permitted to delegate to platform tooling.

use async_trait::async_trait;
use govern_facts::Facts;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::ResourceError;
use crate::model::{ChangeReport, PackageRepo, Resource};

const APK_REPOSITORIES: &str = "/etc/apk/repositories";
const APK_KEYS_DIR: &str = "/etc/apk/keys";

#[async_trait]
impl Resource for PackageRepo {
    async fn ensure(&self, dry_run: bool, facts: &Facts) -> Result<ChangeReport, ResourceError> {
        if facts.distro.family != "alpine" {
            // The driver contract permits delegating to platform tooling
            // on other families; there is no such tool wired in yet, so
            // this is reported rather than silently claiming success.
            return Ok(ChangeReport::WouldChange {
                reason: format!("package repo management not implemented for distro family {}", facts.distro.family),
            });
        }

        let repo_list = std::fs::read_to_string(APK_REPOSITORIES).unwrap_or_default();
        let repo_present = repo_list.lines().any(|l| l == self.contents);

        let key_path = self.key.as_ref().map(|url| {
            let basename = url.rsplit('/').next().unwrap_or(url);
            format!("{APK_KEYS_DIR}/{basename}")
        });
        let key_present = match &key_path {
            Some(p) => Path::new(p).exists(),
            None => true,
        };

        if repo_present && key_present {
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would ensure repo {} and its key are present", self.name) });
        }

        if !repo_present {
            let mut out = repo_list;
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.contents);
            out.push('\n');
            std::fs::write(APK_REPOSITORIES, out)?;
        }

        if let (Some(url), Some(path)) = (&self.key, &key_path) {
            if !Path::new(path).exists() {
                std::fs::create_dir_all(APK_KEYS_DIR)?;
                let body = reqwest::get(url)
                    .await
                    .map_err(|e| ResourceError::transient(format!("fetching repo key: {e}")))?
                    .bytes()
                    .await
                    .map_err(|e| ResourceError::transient(format!("reading repo key body: {e}")))?;
                std::fs::write(path, &body)?;
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
            }
        }

        Ok(ChangeReport::Changed { summary: format!("ensured repo {}", self.name) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::facts_with_family;

    #[tokio::test]
    async fn non_alpine_is_reported_not_implemented() {
        let law = PackageRepo { name: "main".into(), contents: "http://x".into(), ..Default::default() };
        let report = law.ensure(true, &facts_with_family("debian")).await.unwrap();
        assert!(matches!(report, ChangeReport::WouldChange { .. }));
    }
}
