//! Image references inside a chart's `values.yaml`
//!
//! Two shapes are recognised anywhere in the document:
//!
//! ```yaml
//! image:
//!   registry: registry.example.com   # optional
//!   repository: team/api
//!   tag: 1.4.0
//! sidecar:
//!   image: nginx:1.25
//! ```

use serde_yaml::Value;

use crate::image::{ImageRef, split_tag};
use crate::span::{self, Line, Splice};
use crate::{Edited, Error, Result};

/// Every image referenced by a values document.
pub fn find_images(content: &str) -> Result<Vec<ImageRef>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let root: Value =
        serde_yaml::from_str(content).map_err(|e| Error::parse("values", e.to_string()))?;
    let mut images = Vec::new();
    collect_images(&root, &mut images);
    Ok(images)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn collect_images(value: &Value, images: &mut Vec<ImageRef>) {
    match value {
        Value::Mapping(map) => {
            let repository = map.get("repository").and_then(scalar);
            let tag = map.get("tag").and_then(scalar);
            if let (Some(repository), Some(tag)) = (repository, tag) {
                let repository = match map.get("registry").and_then(scalar) {
                    Some(registry) if !registry.is_empty() => {
                        format!("{}/{}", registry.trim_end_matches('/'), repository)
                    }
                    _ => repository,
                };
                images.push(ImageRef::new(repository, Some(tag)));
            }

            if let Some(Value::String(reference)) = map.get("image")
                && split_tag(reference).1.is_some()
            {
                images.push(ImageRef::parse(reference));
            }

            for child in map.values() {
                collect_images(child, images);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_images(item, images);
            }
        }
        _ => {}
    }
}

/// Rewrite the tag of every image accepted by `matches`.
pub fn set_image_tag(
    content: &str,
    target: &str,
    matches: impl Fn(&ImageRef) -> bool,
    new_tag: &str,
) -> Result<Edited> {
    let lines = span::lines(content);
    let mut splices = Vec::new();
    let mut previous = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if line.is_filler() {
            continue;
        }
        let column = line.key_column();
        let Some(field) = line.field(column) else {
            continue;
        };
        let Some(value_span) = field.value else {
            continue;
        };

        match field.key {
            "repository" => {
                let siblings = mapping_block(&lines, index, column);
                let mut tag_span = None;
                let mut registry = None;
                for sibling in siblings {
                    if let Some(f) = lines[sibling].field(column)
                        && let Some(span) = f.value
                    {
                        match f.key {
                            "tag" => tag_span = Some(span),
                            "registry" => registry = Some(content[span].to_string()),
                            _ => {}
                        }
                    }
                }
                let Some(tag_span) = tag_span else {
                    continue;
                };

                let repository = &content[value_span];
                let repository = match registry {
                    Some(registry) if !registry.is_empty() => {
                        format!("{}/{}", registry.trim_end_matches('/'), repository)
                    }
                    _ => repository.to_string(),
                };
                let image = ImageRef::new(repository, Some(content[tag_span.clone()].to_string()));
                if matches(&image) {
                    previous.push(content[tag_span.clone()].to_string());
                    splices.push(Splice {
                        range: tag_span,
                        text: new_tag.to_string(),
                    });
                }
            }
            "image" => {
                let reference = &content[value_span.clone()];
                let (repository, tag) = split_tag(reference);
                let Some(tag) = tag else {
                    continue;
                };
                let image = ImageRef::new(repository, Some(tag.to_string()));
                if matches(&image) {
                    let tag_start = value_span.start + repository.len() + 1;
                    previous.push(tag.to_string());
                    splices.push(Splice {
                        range: tag_start..value_span.end,
                        text: new_tag.to_string(),
                    });
                }
            }
            _ => {}
        }
    }

    if splices.is_empty() {
        return Err(Error::not_found("image", target));
    }

    Ok(Edited {
        content: span::apply(content, &splices),
        previous,
    })
}

/// Indexes of the other key lines of the mapping that contains the key at
/// `lines[index]` (key column `column`).
fn mapping_block(lines: &[Line<'_>], index: usize, column: usize) -> Vec<usize> {
    let mut block = Vec::new();

    if !lines[index].is_item() {
        for i in (0..index).rev() {
            let line = &lines[i];
            if line.is_filler() || (line.indent() > column && !line.is_item()) {
                continue;
            }
            if line.key_column() == column && line.indent() <= column {
                block.push(i);
                // The first key of a sequence item opens the mapping
                if line.is_item() {
                    break;
                }
                continue;
            }
            if line.indent() > column {
                continue;
            }
            break;
        }
    }

    for (i, line) in lines.iter().enumerate().skip(index + 1) {
        if line.is_filler() || line.indent() > column {
            continue;
        }
        if line.indent() == column && !line.is_item() {
            block.push(i);
            continue;
        }
        break;
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALUES: &str = "\
replicaCount: 2
image:
  repository: registry.example.com/team/api
  pullPolicy: IfNotPresent
  # overridden per environment
  tag: \"1.4.0\"
worker:
  image:
    registry: registry.example.com
    tag: 1.4.0
    repository: team/worker
sidecars:
  - name: proxy
    image: nginx:1.25
  - repository: team/api
    tag: 0.9.0
";

    #[test]
    fn find_images_covers_all_shapes() {
        let images = find_images(VALUES).unwrap();
        let rendered: Vec<String> = images.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "registry.example.com/team/api:1.4.0",
                "registry.example.com/team/worker:1.4.0",
                "nginx:1.25",
                "team/api:0.9.0",
            ]
        );
    }

    #[test]
    fn set_tag_for_plain_mapping() {
        let edited = set_image_tag(
            VALUES,
            "api",
            |i| i.repository == "registry.example.com/team/api",
            "1.5.0",
        )
        .unwrap();
        assert_eq!(edited.previous, vec!["1.4.0".to_string()]);
        assert_eq!(edited.content, VALUES.replace("\"1.4.0\"", "\"1.5.0\""));
    }

    #[test]
    fn set_tag_sees_registry_and_tag_before_repository() {
        let edited = set_image_tag(
            VALUES,
            "worker",
            |i| i.name() == "worker",
            "2.0.0",
        )
        .unwrap();
        assert_eq!(
            edited.content,
            VALUES.replace("    tag: 1.4.0\n", "    tag: 2.0.0\n")
        );
    }

    #[test]
    fn set_tag_in_inline_reference() {
        let edited = set_image_tag(VALUES, "nginx", |i| i.repository == "nginx", "1.26").unwrap();
        assert_eq!(edited.content, VALUES.replace("nginx:1.25", "nginx:1.26"));
    }

    #[test]
    fn sequence_items_do_not_leak_into_each_other() {
        let edited = set_image_tag(VALUES, "api", |i| i.repository == "team/api", "1.0.0").unwrap();
        assert_eq!(edited.previous, vec!["0.9.0".to_string()]);
        assert_eq!(edited.content, VALUES.replace("0.9.0", "1.0.0"));
    }

    #[test]
    fn no_matching_image() {
        let err = set_image_tag(VALUES, "db", |i| i.name() == "db", "1").unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { .. }));
    }
}
