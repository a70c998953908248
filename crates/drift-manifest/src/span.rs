//! Line model and span replacement shared by the editors
//!
//! Editors never reserialize a document. They locate the byte range of a
//! single scalar and splice a new value in, leaving every other byte alone.

use std::ops::Range;

/// A replacement of `range` in the original content by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub text: String,
}

/// Apply non-overlapping splices to `content`.
pub fn apply(content: &str, splices: &[Splice]) -> String {
    let mut ordered: Vec<&Splice> = splices.iter().collect();
    ordered.sort_by_key(|s| s.range.start);

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for splice in ordered {
        if splice.range.start < cursor {
            continue;
        }
        out.push_str(&content[cursor..splice.range.start]);
        out.push_str(&splice.text);
        cursor = splice.range.end;
    }
    out.push_str(&content[cursor..]);
    out
}

/// One physical line with its absolute byte offset.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub start: usize,
    pub text: &'a str,
}

impl<'a> Line<'a> {
    pub fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start_matches(' ').len()
    }

    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }

    /// Blank or comment-only.
    pub fn is_filler(&self) -> bool {
        let t = self.trimmed();
        t.is_empty() || t.starts_with('#')
    }

    /// Starts a sequence item (`- ...`).
    pub fn is_item(&self) -> bool {
        let t = self.text.trim_start_matches(' ');
        t == "-" || t.starts_with("- ")
    }

    /// Column of the first mapping key on this line, looking past a leading
    /// `- ` when the line starts a sequence item.
    pub fn key_column(&self) -> usize {
        let indent = self.indent();
        if self.is_item() {
            let after_dash = &self.text[indent + 1..];
            indent + 1 + (after_dash.len() - after_dash.trim_start_matches(' ').len())
        } else {
            indent
        }
    }

    /// Parse `key: value` starting at `column`.
    pub fn field(&self, column: usize) -> Option<Field<'a>> {
        let rest = self.text.get(column..)?;
        let colon = rest.find(':')?;
        let key = rest[..colon].trim();
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return None;
        }
        let after = &rest[colon + 1..];
        if !(after.is_empty() || after.starts_with(' ')) {
            return None;
        }
        let value = scalar_span(after).map(|r| {
            let base = self.start + column + colon + 1;
            (base + r.start)..(base + r.end)
        });
        Some(Field { key, value })
    }
}

/// A `key: value` pair; `value` is the absolute span of the scalar text
/// (inside quotes when quoted), or `None` when the value is not an inline
/// scalar.
#[derive(Debug, Clone)]
pub(crate) struct Field<'a> {
    pub key: &'a str,
    pub value: Option<Range<usize>>,
}

pub(crate) fn lines(content: &str) -> Vec<Line<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    for raw in content.split_inclusive('\n') {
        let text = raw.trim_end_matches('\n').trim_end_matches('\r');
        out.push(Line { start, text });
        start += raw.len();
    }
    out
}

/// Span of an inline scalar within `after` (the text following a colon).
fn scalar_span(after: &str) -> Option<Range<usize>> {
    let lead = after.len() - after.trim_start_matches(' ').len();
    let value = &after[lead..];
    let first = value.chars().next()?;

    match first {
        '#' | '{' | '[' | '|' | '>' | '&' | '*' | '!' => None,
        '"' | '\'' => {
            let close = value[1..].find(first)?;
            Some((lead + 1)..(lead + 1 + close))
        }
        _ => {
            let end = value.find(" #").unwrap_or(value.len());
            let trimmed = value[..end].trim_end();
            Some(lead..(lead + trimmed.len()))
        }
    }
}
