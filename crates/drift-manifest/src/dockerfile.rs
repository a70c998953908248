//! `FROM` lines of a Dockerfile

use crate::image::{ImageRef, split_tag};
use crate::span::{self, Splice};
use crate::{Edited, Error, Result};

/// A base image reference and the byte range of its token.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FromImage {
    image: ImageRef,
    /// Range of `repository[:tag][@digest]`
    token: std::ops::Range<usize>,
}

/// Base images referenced by `FROM` instructions, excluding `scratch` and
/// references to earlier build stages.
pub fn find_base_images(content: &str) -> Vec<ImageRef> {
    from_images(content).into_iter().map(|f| f.image).collect()
}

/// Rewrite the tag of every base image accepted by `matches`. A reference
/// without a tag gets one; a pinned digest is dropped along with the old tag.
pub fn set_base_image_tag(
    content: &str,
    target: &str,
    matches: impl Fn(&ImageRef) -> bool,
    new_tag: &str,
) -> Result<Edited> {
    let mut splices = Vec::new();
    let mut previous = Vec::new();

    for from in from_images(content) {
        if !matches(&from.image) {
            continue;
        }
        let repository_end = from.token.start + from.image.repository.len();
        previous.push(from.image.tag.clone().unwrap_or_default());
        splices.push(Splice {
            range: repository_end..from.token.end,
            text: format!(":{}", new_tag),
        });
    }

    if splices.is_empty() {
        return Err(Error::not_found("base image", target));
    }

    Ok(Edited {
        content: span::apply(content, &splices),
        previous,
    })
}

fn from_images(content: &str) -> Vec<FromImage> {
    let mut stages: Vec<String> = Vec::new();
    let mut images = Vec::new();

    for line in span::lines(content) {
        let text = line.text;
        let trimmed = text.trim_start();
        let lead = text.len() - trimmed.len();
        if !trimmed
            .get(..5)
            .is_some_and(|p| p.eq_ignore_ascii_case("FROM "))
        {
            continue;
        }

        // Tokens with their offsets inside the line
        let mut offset = lead + 4;
        let mut tokens = Vec::new();
        for token in trimmed[4..].split_whitespace() {
            let at = text[offset..].find(token).map_or(offset, |i| offset + i);
            tokens.push((at, token));
            offset = at + token.len();
        }

        let mut rest = tokens.iter().skip_while(|(_, t)| t.starts_with("--"));
        let Some(&(at, reference)) = rest.next() else {
            continue;
        };
        let alias = match (rest.next(), rest.next()) {
            (Some((_, kw)), Some((_, name))) if kw.eq_ignore_ascii_case("AS") => {
                Some(name.to_lowercase())
            }
            _ => None,
        };

        let is_stage = stages.iter().any(|s| s.eq_ignore_ascii_case(reference));
        if !is_stage && !reference.eq_ignore_ascii_case("scratch") && !reference.contains('$') {
            let without_digest = reference.split('@').next().unwrap_or(reference);
            let (repository, tag) = split_tag(without_digest);
            let start = line.start + at;
            images.push(FromImage {
                image: ImageRef::new(repository, tag.map(str::to_string)),
                token: start..start + reference.len(),
            });
        }

        if let Some(alias) = alias {
            stages.push(alias);
        }
    }

    images
}
