//! Deterministic branch names for update pull requests

use crate::{Error, Result};

const PREFIX: &str = "drift";

/// Branch used to propose bumping `src_module` to `to_version` inside
/// `dest_module`.
///
/// The same inputs always give the same name, so a retried mutation resets
/// the existing branch instead of opening a second one.
///
/// `charts/api`, `base-image`, `1.4.0` -> `drift/charts/api/base-image-1.4.0`
pub fn update_branch(dest_module: &str, src_module: &str, to_version: &str) -> Result<String> {
    let raw = format!("{}/{}/{}-{}", PREFIX, dest_module, src_module, to_version);
    let name = sanitize_branch(&raw);
    if name.is_empty() || name == PREFIX {
        return Err(Error::InvalidBranchName { name: raw });
    }
    Ok(name)
}

/// Reduce an arbitrary string to a valid git ref component path.
///
/// Keeps alphanumerics, `-`, `_`, `.` and `/`. Every other character becomes
/// a dash. Repeated separators collapse and components never start or end
/// with a dot.
pub fn sanitize_branch(raw: &str) -> String {
    let mut components = Vec::new();

    for component in raw.split('/') {
        let mut cleaned = String::with_capacity(component.len());
        let mut last_was_dot = false;
        for c in component.chars() {
            let c = if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            };
            // `..` is not allowed anywhere in a ref
            if c == '.' && last_was_dot {
                continue;
            }
            last_was_dot = c == '.';
            cleaned.push(c);
        }

        let mut cleaned = cleaned.trim_matches('.').to_string();
        if let Some(stripped) = cleaned.strip_suffix(".lock") {
            cleaned = format!("{}-lock", stripped);
        }
        if !cleaned.is_empty() {
            components.push(cleaned);
        }
    }

    components.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn update_branch_is_deterministic() {
        let first = update_branch("api", "base-image", "1.4.0").unwrap();
        let second = update_branch("api", "base-image", "1.4.0").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "drift/api/base-image-1.4.0");
    }

    #[test]
    fn update_branch_differs_per_version() {
        assert_ne!(
            update_branch("api", "db", "1.0.0").unwrap(),
            update_branch("api", "db", "1.0.1").unwrap()
        );
    }

    #[rstest]
    #[case("feat/auth", "feat/auth")]
    #[case("a//b", "a/b")]
    #[case("/lead/trail/", "lead/trail")]
    #[case("x:y z", "x-y-z")]
    #[case("v1..2", "v1.2")]
    #[case(".hidden/name.", "hidden/name")]
    #[case("refs.lock", "refs-lock")]
    fn sanitize_branch_cases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_branch(raw), expected);
    }

    #[test]
    fn tags_with_colons_are_sanitized() {
        let name = update_branch("web", "nginx:stable", "master-20240101-120000").unwrap();
        assert_eq!(name, "drift/web/nginx-stable-master-20240101-120000");
    }
}
