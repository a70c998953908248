//! Container image references

use std::fmt;

const DEFAULT_REGISTRY: &str = "docker.io";

/// An image reference as written in a manifest: `repository[:tag]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: Option<String>,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            repository: repository.into(),
            tag,
        }
    }

    /// Parse `repository[:tag][@digest]`. The digest is dropped.
    pub fn parse(reference: &str) -> Self {
        let without_digest = reference.split('@').next().unwrap_or(reference);
        let (repository, tag) = split_tag(without_digest);
        Self {
            repository: repository.to_string(),
            tag: tag.map(str::to_string),
        }
    }

    /// Registry and namespace part: everything before the image name, with the
    /// default registry made explicit.
    ///
    /// `nginx` -> `docker.io/library`, `acme/api` -> `docker.io/acme`,
    /// `registry.example.com/team/api` -> `registry.example.com/team`
    pub fn remote(&self) -> String {
        let qualified = qualify(&self.repository);
        match qualified.rsplit_once('/') {
            Some((remote, _)) => remote.to_string(),
            None => DEFAULT_REGISTRY.to_string(),
        }
    }

    /// Image name: the last path component of the repository.
    pub fn name(&self) -> &str {
        self.repository
            .rsplit_once('/')
            .map_or(self.repository.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => f.write_str(&self.repository),
        }
    }
}

/// Split off a tag: the last `:` after the last `/` (a `:` before that is a
/// registry port).
pub(crate) fn split_tag(reference: &str) -> (&str, Option<&str>) {
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let at = name_start + i;
            (&reference[..at], Some(&reference[at + 1..]))
        }
        None => (reference, None),
    }
}

fn qualify(repository: &str) -> String {
    let first = repository.split('/').next().unwrap_or_default();
    let has_registry = repository.contains('/')
        && (first.contains('.') || first.contains(':') || first == "localhost");

    if has_registry {
        repository.to_string()
    } else if repository.contains('/') {
        format!("{}/{}", DEFAULT_REGISTRY, repository)
    } else {
        format!("{}/library/{}", DEFAULT_REGISTRY, repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("nginx", "docker.io/library", "nginx", None)]
    #[case("nginx:1.25", "docker.io/library", "nginx", Some("1.25"))]
    #[case("acme/api:master-20240101-120000", "docker.io/acme", "api", Some("master-20240101-120000"))]
    #[case("registry.example.com/team/api:1.0.0", "registry.example.com/team", "api", Some("1.0.0"))]
    #[case("localhost:5000/api", "localhost:5000", "api", None)]
    #[case("ghcr.io/acme/api@sha256:abc", "ghcr.io/acme", "api", None)]
    fn parse_reference(
        #[case] reference: &str,
        #[case] remote: &str,
        #[case] name: &str,
        #[case] tag: Option<&str>,
    ) {
        let image = ImageRef::parse(reference);
        assert_eq!(image.remote(), remote);
        assert_eq!(image.name(), name);
        assert_eq!(image.tag.as_deref(), tag);
    }

    #[test]
    fn display_round_trip() {
        assert_eq!(ImageRef::parse("a/b:1").to_string(), "a/b:1");
        assert_eq!(ImageRef::parse("a/b").to_string(), "a/b");
    }
}
