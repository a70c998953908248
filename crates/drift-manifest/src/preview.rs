//! Human-readable previews of manifest edits

use similar::TextDiff;

/// Unified diff of an edit, labelled with `path`.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(2)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string()
}

/// Number of changed lines between two versions of a manifest.
pub fn changed_lines(old: &str, new: &str) -> usize {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .filter(|c| c.tag() != similar::ChangeTag::Equal)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_shows_only_the_version_line() {
        let old = "name: api\nversion: 1.0.0\n";
        let new = "name: api\nversion: 1.1.0\n";
        let diff = unified_diff("Chart.yaml", old, new);
        assert!(diff.contains("--- a/Chart.yaml"));
        assert!(diff.contains("-version: 1.0.0"));
        assert!(diff.contains("+version: 1.1.0"));
        assert_eq!(changed_lines(old, new), 2);
    }

    #[test]
    fn identical_content_has_empty_diff() {
        assert!(unified_diff("x", "a\n", "a\n").is_empty());
    }
}
