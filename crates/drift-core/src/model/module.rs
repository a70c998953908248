//! Modules and their dependency references

use serde::{Deserialize, Serialize};
use drift_store::Entity;

use super::ModuleKind;

/// A reference from a module to another artifact, as declared in its
/// manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub remote: String,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        kind: ModuleKind,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            kind,
            remote: remote.into(),
        }
    }

    /// Reference to a container image.
    pub fn from_image(image: &drift_manifest::ImageRef) -> Self {
        Self::new(image.name(), image.tag.clone(), ModuleKind::Docker, image.remote())
    }

    /// Whether this reference points at `module` of a repository whose remote
    /// is `remote`.
    pub fn refers_to(&self, module: &Module, remote: &str) -> bool {
        self.kind == module.kind
            && (self.name == module.name || module.alias.as_deref() == Some(self.name.as_str()))
            && drift_git::normalize_remote(&self.remote) == drift_git::normalize_remote(remote)
    }
}

/// A versioned artifact inside a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Manifest location relative to the repository root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Name of the owning repository
    pub repository: String,
}

impl Module {
    pub fn new(repository: impl Into<String>, name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            alias: None,
            versions: Vec::new(),
            current: None,
            dependencies: Vec::new(),
            path: None,
            repository: repository.into(),
        }
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = path;
        self
    }

    pub fn identity(repository: &str, name: &str) -> String {
        format!("{}/{}", repository, name)
    }

    /// Manifest directory relative to the repository root (`""` for the root).
    pub fn dir(&self) -> &str {
        self.path.as_deref().unwrap_or("")
    }
}

impl Entity for Module {
    const KIND: &'static str = "Module";

    fn id(&self) -> Option<String> {
        Some(Self::identity(&self.repository, &self.name))
    }

    fn assign_id(&mut self, _id: String) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn identity_is_repository_scoped() {
        let module = Module::new("charts", "api", ModuleKind::Helm);
        assert_eq!(module.id().as_deref(), Some("charts/api"));
    }

    #[test]
    fn dump_uses_type_discriminator() {
        let module = Module::new("charts", "api", ModuleKind::Helm);
        let dump = module.dump().unwrap();
        assert_eq!(dump["type"], json!("helm"));
        assert_eq!(dump["dependencies"], json!([]));
        assert!(dump.get("path").is_none());
    }

    #[test]
    fn dependency_matches_by_name_alias_and_remote() {
        let mut module = Module::new("hub", "nginx", ModuleKind::Docker);
        let dep = Dependency::new("nginx", None, ModuleKind::Docker, "Docker.io/library");
        assert!(dep.refers_to(&module, "docker.io/library"));
        assert!(!dep.refers_to(&module, "ghcr.io/library"));

        module.name = "web".into();
        assert!(!dep.refers_to(&module, "docker.io/library"));
        module.alias = Some("nginx".into());
        assert!(dep.refers_to(&module, "docker.io/library"));

        let helm = Dependency::new("nginx", None, ModuleKind::Helm, "docker.io/library");
        assert!(!helm.refers_to(&module, "docker.io/library"));
    }
}
