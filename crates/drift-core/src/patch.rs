//! Structural patches over plain JSON snapshots
//!
//! Paths are JSON pointers (`/versions/0`). Array removals are emitted from
//! the highest index down so the patch can be replayed in order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Maximum recursion depth for diff operations
const MAX_DIFF_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Replace { path, .. } | PatchOp::Remove { path } => {
                path
            }
        }
    }
}

/// Compute the patch turning `old` into `new`. Equal inputs give an empty
/// patch.
pub fn diff(old: &Value, new: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_values_with_depth(old, new, String::new(), &mut ops, 0);
    ops
}

fn child(path: &str, segment: &str) -> String {
    format!("{}/{}", path, segment.replace('~', "~0").replace('/', "~1"))
}

fn diff_values_with_depth(
    old: &Value,
    new: &Value,
    path: String,
    ops: &mut Vec<PatchOp>,
    depth: usize,
) {
    // Deeply nested differences become a single replacement
    if depth > MAX_DIFF_DEPTH {
        if old != new {
            ops.push(PatchOp::Replace {
                path,
                value: new.clone(),
            });
        }
        return;
    }

    match (old, new) {
        (Value::Object(old_obj), Value::Object(new_obj)) => {
            for (key, old_value) in old_obj {
                let child_path = child(&path, key);
                match new_obj.get(key) {
                    Some(new_value) => {
                        diff_values_with_depth(old_value, new_value, child_path, ops, depth + 1)
                    }
                    None => ops.push(PatchOp::Remove { path: child_path }),
                }
            }
            for (key, new_value) in new_obj {
                if !old_obj.contains_key(key) {
                    ops.push(PatchOp::Add {
                        path: child(&path, key),
                        value: new_value.clone(),
                    });
                }
            }
        }

        (Value::Array(old_arr), Value::Array(new_arr)) => {
            let common = old_arr.len().min(new_arr.len());
            for i in 0..common {
                diff_values_with_depth(
                    &old_arr[i],
                    &new_arr[i],
                    child(&path, &i.to_string()),
                    ops,
                    depth + 1,
                );
            }
            for (i, value) in new_arr.iter().enumerate().skip(common) {
                ops.push(PatchOp::Add {
                    path: child(&path, &i.to_string()),
                    value: value.clone(),
                });
            }
            for i in (common..old_arr.len()).rev() {
                ops.push(PatchOp::Remove {
                    path: child(&path, &i.to_string()),
                });
            }
        }

        _ => {
            if old != new {
                ops.push(PatchOp::Replace {
                    path,
                    value: new.clone(),
                });
            }
        }
    }
}

/// Replay `ops` on `doc` in order.
pub fn apply(doc: &mut Value, ops: &[PatchOp]) -> Result<()> {
    for op in ops {
        apply_one(doc, op)?;
    }
    Ok(())
}

fn patch_error(path: &str, reason: impl Into<String>) -> Error {
    Error::Patch {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn split_pointer(path: &str) -> Result<(Vec<String>, String)> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(patch_error(path, "pointer must start with '/'"));
    };
    let mut segments: Vec<String> = rest
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect();
    let last = segments.pop().unwrap_or_default();
    Ok((segments, last))
}

fn parent_mut<'a>(doc: &'a mut Value, segments: &[String], path: &str) -> Result<&'a mut Value> {
    let mut current = doc;
    for segment in segments {
        current = match current {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| patch_error(path, format!("missing key '{}'", segment)))?,
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| patch_error(path, format!("bad index '{}'", segment)))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| patch_error(path, format!("index {} out of range", index)))?
            }
            _ => return Err(patch_error(path, "traverses a scalar")),
        };
    }
    Ok(current)
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<()> {
    let path = op.path();
    if path.is_empty() {
        return match op {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                *doc = value.clone();
                Ok(())
            }
            PatchOp::Remove { .. } => Err(patch_error(path, "cannot remove the root")),
        };
    }

    let (segments, last) = split_pointer(path)?;
    let parent = parent_mut(doc, &segments, path)?;

    match (parent, op) {
        (Value::Object(map), PatchOp::Add { value, .. }) => {
            map.insert(last, value.clone());
        }
        (Value::Object(map), PatchOp::Replace { value, .. }) => {
            let slot = map
                .get_mut(&last)
                .ok_or_else(|| patch_error(path, "replace of a missing key"))?;
            *slot = value.clone();
        }
        (Value::Object(map), PatchOp::Remove { .. }) => {
            map.remove(&last)
                .ok_or_else(|| patch_error(path, "remove of a missing key"))?;
        }
        (Value::Array(items), op) => {
            let index = if last == "-" {
                items.len()
            } else {
                last.parse::<usize>()
                    .map_err(|_| patch_error(path, format!("bad index '{}'", last)))?
            };
            match op {
                PatchOp::Add { value, .. } if index <= items.len() => {
                    items.insert(index, value.clone())
                }
                PatchOp::Replace { value, .. } if index < items.len() => {
                    items[index] = value.clone()
                }
                PatchOp::Remove { .. } if index < items.len() => {
                    items.remove(index);
                }
                _ => return Err(patch_error(path, format!("index {} out of range", index))),
            }
        }
        _ => return Err(patch_error(path, "parent is a scalar")),
    }
    Ok(())
}
