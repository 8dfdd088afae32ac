// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::{self, Display};

/// One step of a parsed field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Plain field name, `key`.
    Field(String),

    /// Positional array offset, `[3]`.
    Index(usize),

    /// Lookup of an array element by its stable identity, `[id=xyz]`.
    Id(String),
}

impl PathSegment {
    /// Returns the field name if this is a field segment.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathSegment::Field(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true if this segment addresses an array element, either by index, by id or with a
    /// purely numeric field name.
    pub fn is_position(&self) -> bool {
        match self {
            PathSegment::Field(name) => name.parse::<usize>().is_ok(),
            PathSegment::Index(_) | PathSegment::Id(_) => true,
        }
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(index) => write!(f, "[{}]", index),
            PathSegment::Id(id) => write!(f, "[id={}]", id),
        }
    }
}

/// Parses the content between two brackets. Anything which is neither a non-negative integer nor
/// an `id=<value>` pair is dropped.
fn parse_bracket(content: &str) -> Option<PathSegment> {
    let content = content.trim();

    if let Ok(index) = content.parse::<usize>() {
        return Some(PathSegment::Index(index));
    }

    let id = content.strip_prefix("id=")?.trim();
    let id = id.trim_matches(|c| c == '"' || c == '\'');
    if id.is_empty() {
        None
    } else {
        Some(PathSegment::Id(id.to_string()))
    }
}

/// Parses a dotted and bracketed path like `reviews[0].rating` or `content[id=xyz]` into its
/// segments.
///
/// Parsing never fails: malformed or unclosed brackets and empty tokens are ignored.
pub fn parse_patch_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut name = String::new();
    let mut chars = path.chars();

    fn flush(name: &mut String, segments: &mut Vec<PathSegment>) {
        let field = name.trim();
        if !field.is_empty() {
            segments.push(PathSegment::Field(field.to_string()));
        }
        name.clear();
    }

    while let Some(c) = chars.next() {
        match c {
            '.' => flush(&mut name, &mut segments),
            '[' => {
                flush(&mut name, &mut segments);

                let mut content = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    content.push(c);
                }

                if closed {
                    if let Some(segment) = parse_bracket(&content) {
                        segments.push(segment);
                    }
                }
            }
            _ => name.push(c),
        }
    }

    flush(&mut name, &mut segments);
    segments
}

/// Parses a flattened store path like `images.0.alt`, numeric tokens become index segments.
pub fn parse_store_path(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::Field(token.to_string()),
        })
        .collect()
}

/// Builds a patch path string from segments, the inverse of [`parse_patch_path`].
pub fn build_path(segments: &[PathSegment]) -> String {
    let mut path = String::new();

    for segment in segments {
        if let PathSegment::Field(_) = segment {
            if !path.is_empty() {
                path.push('.');
            }
        }
        path.push_str(&segment.to_string());
    }

    path
}

/// Appends a token to a flattened store path.
pub fn join_store_path(prefix: &str, token: &str) -> String {
    if prefix.is_empty() {
        token.to_string()
    } else {
        format!("{}.{}", prefix, token)
    }
}
