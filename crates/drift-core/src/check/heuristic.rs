//! Current-version selection for container tags
//!
//! Registries rarely say which tag is "the" current version. Tags pushed
//! together share a content hash, and release tags follow a few naming
//! conventions; the heuristic combines both.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;

use crate::clients::TagInfo;

static MASTER_BUILD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^master-\d{8}-\d{6}$").unwrap());
static RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?$").unwrap());

/// Accepted tag formats, in priority order.
static ACCEPTED_FORMATS: [&LazyLock<Regex>; 2] = [&MASTER_BUILD, &RELEASE];

const LATEST: &str = "latest";

/// Sort tags most recent first and keep those updated within `window` of
/// the most recently updated one.
pub fn recent_tags(tags: &[TagInfo], window: Duration) -> Vec<TagInfo> {
    let mut sorted = tags.to_vec();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let Some(newest) = sorted.first().map(|t| t.updated_at) else {
        return sorted;
    };
    sorted.retain(|t| newest - t.updated_at <= window);
    sorted
}

/// Pick the current version among `tags`, which must already be in recency
/// order (see [`recent_tags`]).
///
/// 1. With a `latest` tag, candidates are the tags sharing its hash,
///    otherwise every tag.
/// 2. No candidates falls back to the most recent tag.
/// 3. Candidates matching any accepted format are kept.
/// 4. When nothing matches, every candidate counts.
/// 5. The longest tag wins; ties go to the most recent.
pub fn select_current_tag(tags: &[TagInfo]) -> Option<String> {
    let candidates: Vec<&TagInfo> = match tags.iter().find(|t| t.name == LATEST) {
        Some(latest) => tags.iter().filter(|t| t.digest == latest.digest).collect(),
        None => tags.iter().collect(),
    };

    if candidates.is_empty() {
        return tags.first().map(|t| t.name.clone());
    }

    let mut matches: Vec<&TagInfo> = Vec::new();
    for format in ACCEPTED_FORMATS.iter() {
        for candidate in &candidates {
            if format.is_match(&candidate.name) && !matches.iter().any(|m| m.name == candidate.name)
            {
                matches.push(candidate);
            }
        }
    }
    if matches.is_empty() {
        matches = candidates;
    }

    // Restore recency order so ties resolve to the most recent tag
    matches.sort_by_key(|m| tags.iter().position(|t| t.name == m.name));

    let mut best: Option<&TagInfo> = None;
    for candidate in matches {
        if best.is_none_or(|b| candidate.name.len() > b.name.len()) {
            best = Some(candidate);
        }
    }
    best.map(|t| t.name.clone())
}
