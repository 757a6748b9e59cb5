//! `FileInsert` driver (spec §4.E): insert a line after a literal match,
//! or at a fixed 1-based line number. No-op if `text` is already present.

use async_trait::async_trait;
use govern_facts::Facts;

use crate::error::ResourceError;
use crate::model::{ChangeReport, FileInsert, Resource};

#[async_trait]
impl Resource for FileInsert {
    async fn ensure(&self, dry_run: bool, _facts: &Facts) -> Result<ChangeReport, ResourceError> {
        let contents = std::fs::read_to_string(&self.name)?;
        let mut lines: Vec<String> = contents.lines().map(|l| l.trim_end_matches('\r').to_string()).collect();

        if lines.iter().any(|l| l == &self.text) {
            return Ok(ChangeReport::Unchanged);
        }

        if dry_run {
            return Ok(ChangeReport::WouldChange { reason: format!("would insert line into {}", self.name) });
        }

        match (&self.after_line, self.line_number) {
            (Some(after), _) => {
                let idx = lines.iter().position(|l| l == after);
                match idx {
                    Some(pos) => lines.insert(pos + 1, self.text.clone()),
                    None => lines.push(self.text.clone()),
                }
            }
            (None, Some(n)) => {
                let idx = n.saturating_sub(1).min(lines.len());
                lines.insert(idx, self.text.clone());
            }
            (None, None) => lines.push(self.text.clone()),
        }

        let mut out = lines.join("\n");
        out.push('\n');
        std::fs::write(&self.name, out)?;

        Ok(ChangeReport::Changed { summary: format!("inserted line into {}", self.name) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::minimal_facts;
    use tempfile::tempdir;

    #[tokio::test]
    async fn noop_when_line_already_present() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "a\nb\nc\n").unwrap();
        let law = FileInsert { name: path.to_string_lossy().into_owned(), text: "b".into(), ..Default::default() };
        let report = law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(report, ChangeReport::Unchanged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
    }

    #[tokio::test]
    async fn inserts_after_matching_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "a\nb\nc\n").unwrap();
        let law = FileInsert {
            name: path.to_string_lossy().into_owned(),
            text: "x".into(),
            after_line: Some("b".into()),
            ..Default::default()
        };
        law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nx\nc\n");
    }

    #[tokio::test]
    async fn inserts_at_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "a\nb\nc\n").unwrap();
        let law = FileInsert {
            name: path.to_string_lossy().into_owned(),
            text: "x".into(),
            line_number: Some(1),
            ..Default::default()
        };
        law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\na\nb\nc\n");
    }

    #[tokio::test]
    async fn strips_carriage_returns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "a\r\nb\r\n").unwrap();
        let law = FileInsert { name: path.to_string_lossy().into_owned(), text: "x".into(), ..Default::default() };
        law.ensure(false, &minimal_facts()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nx\n");
    }
}
