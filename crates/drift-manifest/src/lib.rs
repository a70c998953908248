//! Manifest reading and editing for Drift
//!
//! Readers use serde_yaml. Editors work on byte spans so that a version bump
//! changes exactly one scalar and nothing else in the file: comments, key
//! order, quoting and whitespace survive untouched.

pub mod chart;
pub mod dockerfile;
pub mod error;
pub mod image;
pub mod preview;
mod span;
pub mod values;

pub use chart::{ChartDependency, ChartFile, read_chart, set_dependency_version};
pub use dockerfile::{find_base_images, set_base_image_tag};
pub use error::{Error, Result};
pub use image::ImageRef;
pub use preview::{changed_lines, unified_diff};
pub use values::{find_images, set_image_tag};

/// Result of an edit: the new content and the values that were replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edited {
    pub content: String,
    pub previous: Vec<String>,
}

/// Conventional manifest file names.
pub mod files {
    pub const CHART: &str = "Chart.yaml";
    pub const REQUIREMENTS: &str = "requirements.yaml";
    pub const VALUES: &str = "values.yaml";
    pub const DOCKERFILE: &str = "Dockerfile";
}
