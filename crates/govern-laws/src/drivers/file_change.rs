//! `FileChange` driver (spec §4.E): regex search-and-replace over lines,
//! with an optional convergence sentinel (Open Question (b)).

use async_trait::async_trait;
use govern_facts::Facts;
use regex::Regex;

use crate::error::ResourceError;
use crate::model::{ChangeReport, FileChange, Resource};

#[async_trait]
impl Resource for FileChange {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let contents = std::fs::read_to_string(&self.name)?;
        let lines: Vec<&str> = contents.lines().collect();

        let already_converged = lines.iter().any(|l| {
            *l == self.replace || self.done.as_deref().is_some_and(|sentinel| l.contains(sentinel))
        });
        if already_converged {
            return Ok(ChangeReport::Unchanged);
        }

        let re = Regex::new(&self.search).map_err(|e| ResourceError::permanent(format!("invalid regex: {e}")))?;

        let mut changed = false;
        let new_lines: Vec<String> = lines
            .iter()
            .map(|line| {
                if re.is_match(line) {
                    changed = true;
                    re.replace(line, self.replace.as_str()).into_owned()
                } else {
                    line.to_string()
                }
            })
            .collect();

        if !changed {
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would rewrite lines matching /{}/ in {}", self.search, self.name) });
        }

        let mut out = new_lines.join("\n");
        out.push('\n');
        std::fs::write(&self.name, out)?;

        Ok(ChangeReport::Changed { summary: format!("applied search/replace to {}", self.name) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::minimal_facts;
    use tempfile::tempdir;

    #[tokio::test]
    async fn replaces_matching_lines_with_backreferences() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "foo=1\nbar=2\n").unwrap();
        let law = FileChange {
            name: path.to_string_lossy().into_owned(),
            search: r"^foo=(\d+)$".into(),
            replace: "foo=[$1]".into(),
            ..Default::default()
        };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert!(matches!(report, ChangeReport::Changed { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "foo=[1]\nbar=2\n");
    }

    #[tokio::test]
    async fn sentinel_line_short_circuits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "# DONE\nfoo=1\n").unwrap();
        let law = FileChange {
            name: path.to_string_lossy().into_owned(),
            search: r"^foo=(\d+)$".into(),
            replace: "foo=[$1]".into(),
            done: Some("DONE".into()),
            ..Default::default()
        };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(report, ChangeReport::Unchanged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# DONE\nfoo=1\n");
    }

    #[tokio::test]
    async fn already_replaced_line_is_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "foo=[1]\n").unwrap();
        let law = FileChange {
            name: path.to_string_lossy().into_owned(),
            search: r"^foo=(\d+)$".into(),
            replace: "foo=[1]".into(),
            ..Default::default()
        };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(report, ChangeReport::Unchanged);
    }
}
