//! Template rendering (spec §4.B).
//!
//! `original_source/pkg/laws/parser.go` builds a Go `text/template` per file
//! with `sprig`'s function map and executes it with `{"facts": facts.Facts}`
//! as the only binding. `tera` is the pack's templating crate and ships the
//! same category of helpers (string, date, filesystem-adjacent, encoding)
//! as Tera filters/functions rather than Sprig's func map, so rendering
//! here is a one-shot `Tera::one_off` call with `facts` as the sole context
//! key — same contract, different vocabulary.

use govern_facts::Facts;
use tera::{Context, Tera};

use crate::error::TemplateError;

/// Render `text` (the contents of one law file) against `facts`.
///
/// Rendering is side-effect-free: no filesystem or network access happens
/// here beyond what's already in `text` and `facts`.
pub fn render(file: &str, text: &str, facts: &Facts) -> Result<String, TemplateError> {
    let mut context = Context::new();
    context.insert("facts", facts);

    Tera::one_off(text, &context, false).map_err(|e| {
        let line = tera_error_line(&e);
        TemplateError::new(file, line, e)
    })
}

/// Tera's `Error` wraps a source chain rather than exposing a line number
/// directly; the parser error variant embeds one in its message when the
/// failure is a syntax error, so best-effort-extract it from there.
fn tera_error_line(err: &tera::Error) -> Option<usize> {
    let message = err.to_string();
    let marker = "at line ";
    let start = message.find(marker)? + marker.len();
    let digits: String = message[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::minimal_facts;

    #[test]
    fn renders_facts_field() {
        let facts = minimal_facts();
        let rendered = render("inline", "hostname={{ facts.hostname }}", &facts).unwrap();
        assert_eq!(rendered, format!("hostname={}", facts.hostname));
    }

    #[test]
    fn passes_through_plain_text() {
        let facts = minimal_facts();
        let rendered = render("inline", "users:\n  present:\n    - name: root\n", &facts).unwrap();
        assert_eq!(rendered, "users:\n  present:\n    - name: root\n");
    }

    #[test]
    fn reports_template_error_with_file_name() {
        let facts = minimal_facts();
        let err = render("broken.yaml", "{{ facts.nonexistent_field }}", &facts).unwrap_err();
        assert_eq!(err.file, "broken.yaml");
    }
}
