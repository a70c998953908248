//! Type discriminators

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Discriminator of a stored repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    /// A git repository holding chart sources or Dockerfiles
    Git,
    /// A Helm chart repository served through an `index.yaml`
    Helm,
    /// A container registry namespace
    Docker,
}

impl RepositoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryKind::Git => "git",
            RepositoryKind::Helm => "helm",
            RepositoryKind::Docker => "docker",
        }
    }
}

impl FromStr for RepositoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(RepositoryKind::Git),
            "helm" => Ok(RepositoryKind::Helm),
            "docker" => Ok(RepositoryKind::Docker),
            other => Err(Error::UnknownRepositoryType(other.to_string())),
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a module and of a dependency reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Helm,
    Docker,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Helm => "helm",
            ModuleKind::Docker => "docker",
        }
    }
}

impl FromStr for ModuleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "helm" => Ok(ModuleKind::Helm),
            "docker" => Ok(ModuleKind::Docker),
            other => Err(Error::UnknownModuleType(other.to_string())),
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
