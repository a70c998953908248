//! Helm chart manifests: `Chart.yaml` and `requirements.yaml`

use serde::{Deserialize, Serialize};

use crate::span::{self, Line, Splice};
use crate::{Edited, Error, Result};

/// The parts of a chart manifest Drift cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

/// An entry of a chart's `dependencies` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Accept `version: 1.2` (a YAML float) as the string `"1.2"`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Parse a `Chart.yaml` or `requirements.yaml` document.
pub fn read_chart(content: &str) -> Result<ChartFile> {
    if content.trim().is_empty() {
        return Ok(ChartFile::default());
    }
    serde_yaml::from_str(content).map_err(|e| Error::parse("chart", e.to_string()))
}

/// Rewrite the `version` of every dependency accepted by `matches`.
///
/// Only the version scalar is replaced; quoting, comments, ordering and all
/// other bytes are preserved. Fails with [`Error::ReferenceNotFound`] when no
/// dependency matches.
pub fn set_dependency_version(
    content: &str,
    target: &str,
    matches: impl Fn(&ChartDependency) -> bool,
    new_version: &str,
) -> Result<Edited> {
    let mut splices = Vec::new();
    let mut previous = Vec::new();

    for entry in dependency_entries(content) {
        if !matches(&entry.dependency) {
            continue;
        }
        let span = entry.version_span.ok_or_else(|| Error::NotEditable {
            target: entry.dependency.name.clone(),
            field: "version".to_string(),
        })?;
        previous.push(content[span.clone()].to_string());
        splices.push(Splice {
            range: span,
            text: new_version.to_string(),
        });
    }

    if splices.is_empty() {
        return Err(Error::not_found("chart dependency", target));
    }

    Ok(Edited {
        content: span::apply(content, &splices),
        previous,
    })
}

struct DependencyEntry {
    dependency: ChartDependency,
    version_span: Option<std::ops::Range<usize>>,
}

/// Walk the top-level `dependencies:` sequence line by line.
fn dependency_entries(content: &str) -> Vec<DependencyEntry> {
    let lines = span::lines(content);
    let Some(header) = lines.iter().position(|l| {
        l.indent() == 0
            && l.field(0)
                .is_some_and(|f| f.key == "dependencies" && f.value.is_none())
    }) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut current: Option<(usize, DependencyEntry)> = None;
    let mut dash_indent: Option<usize> = None;

    for line in &lines[header + 1..] {
        if line.is_filler() {
            continue;
        }
        // A new top-level key ends the sequence
        if line.indent() == 0 && !line.is_item() {
            break;
        }

        if line.is_item() && dash_indent.is_none_or(|indent| indent == line.indent()) {
            dash_indent = Some(line.indent());
            if let Some((_, entry)) = current.take() {
                entries.push(entry);
            }
            let column = line.key_column();
            let mut entry = DependencyEntry {
                dependency: ChartDependency::default(),
                version_span: None,
            };
            read_field(line, column, content, &mut entry);
            current = Some((column, entry));
        } else if let Some((column, entry)) = current.as_mut()
            && line.indent() == *column
        {
            read_field(line, *column, content, entry);
        }
    }
    if let Some((_, entry)) = current {
        entries.push(entry);
    }

    entries
}

fn read_field(line: &Line<'_>, column: usize, content: &str, entry: &mut DependencyEntry) {
    let Some(field) = line.field(column) else {
        return;
    };
    let Some(span) = field.value else {
        return;
    };
    let value = content[span.clone()].to_string();
    match field.key {
        "name" => entry.dependency.name = value,
        "alias" => entry.dependency.alias = Some(value),
        "repository" => entry.dependency.repository = Some(value),
        "version" => {
            entry.dependency.version = Some(value);
            entry.version_span = Some(span);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHART: &str = "\
apiVersion: v2
name: api
version: 0.3.1 # bumped by CI
dependencies:
  # the database
  - name: postgresql
    version: \"12.1.0\"
    repository: https://charts.example.com/stable
  - name: redis
    alias: cache
    repository: https://charts.example.com/stable
    version: 17.0.0
    tags:
      - cache
maintainers:
  - name: ops
";

    #[test]
    fn read_chart_parses_dependencies() {
        let chart = read_chart(CHART).unwrap();
        assert_eq!(chart.name.as_deref(), Some("api"));
        assert_eq!(chart.version.as_deref(), Some("0.3.1"));
        assert_eq!(chart.dependencies.len(), 2);
        assert_eq!(chart.dependencies[1].alias.as_deref(), Some("cache"));
    }

    #[test]
    fn numeric_versions_read_as_strings() {
        let chart = read_chart("name: x\nversion: 1.2\n").unwrap();
        assert_eq!(chart.version.as_deref(), Some("1.2"));
    }

    #[test]
    fn set_version_only_touches_the_matching_scalar() {
        let edited = set_dependency_version(CHART, "postgresql", |d| d.name == "postgresql", "12.2.0").unwrap();
        assert_eq!(edited.previous, vec!["12.1.0".to_string()]);
        assert_eq!(edited.content, CHART.replace("\"12.1.0\"", "\"12.2.0\""));
    }

    #[test]
    fn version_after_nested_block_is_found() {
        let edited = set_dependency_version(
            CHART,
            "cache",
            |d| d.alias.as_deref() == Some("cache"),
            "18.0.0",
        )
        .unwrap();
        assert_eq!(edited.content, CHART.replace("17.0.0", "18.0.0"));
    }

    #[test]
    fn maintainers_are_not_dependencies() {
        let err = set_dependency_version(CHART, "ops", |d| d.name == "ops", "1.0.0").unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { .. }));
    }

    #[test]
    fn nested_sequences_do_not_split_an_entry() {
        let content = "dependencies:\n  - name: db\n    tags:\n      - data\n    version: 1.0.0\n";
        let edited = set_dependency_version(content, "db", |d| d.name == "db", "2.0.0").unwrap();
        assert_eq!(edited.content, content.replace("1.0.0", "2.0.0"));
    }

    #[test]
    fn flush_left_sequence() {
        let content = "dependencies:\n- name: db\n  version: 1.0.0\n";
        let edited = set_dependency_version(content, "db", |d| d.name == "db", "1.1.0").unwrap();
        assert_eq!(edited.content, "dependencies:\n- name: db\n  version: 1.1.0\n");
    }

    #[test]
    fn missing_version_is_not_editable() {
        let content = "dependencies:\n  - name: db\n";
        let err = set_dependency_version(content, "db", |d| d.name == "db", "1.1.0").unwrap_err();
        assert!(matches!(err, Error::NotEditable { .. }));
    }
}
