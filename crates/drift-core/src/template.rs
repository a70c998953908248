//! `{{ name }}` placeholder rendering for commit messages, pull request
//! titles and notifications

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").unwrap());

/// Replace each placeholder by the matching (dotted) field of `context`.
/// Unknown fields render empty.
pub fn render(template: &str, context: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let value = caps[1]
                .split('.')
                .try_fold(context, |value, key| value.get(key));
            match value {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn renders_fields_and_nested_paths() {
        let context = json!({"src_module": "db", "to_version": "2.0.0", "pr": {"number": 7}});
        assert_eq!(
            render("Bump {{ src_module }} to {{to_version}} (#{{ pr.number }})", &context),
            "Bump db to 2.0.0 (#7)"
        );
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(render("Bump {db} to 2.0", &json!({"db": "x"})), "Bump {db} to 2.0");
    }

    #[test]
    fn unknown_fields_render_empty() {
        assert_eq!(render("[{{ missing }}]", &json!({})), "[]");
    }
}
