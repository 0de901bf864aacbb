use serde_json::Value;

/// One step of a dotted/indexed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Splits `path` into segments. `user.address[0].city` yields
/// `Key(user) Key(address) Index(0) Key(city)`. Returns `None` for malformed paths.
pub fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut key = String::new();
    let mut chars = path.chars().peekable();
    // a leading '.' is allowed so remainders like ".name" parse
    let mut expect_key = false;

    if chars.peek() == Some(&'.') {
        chars.next();
        expect_key = true;
    }

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if key.is_empty() && !matches!(segments.last(), Some(PathSegment::Index(_))) {
                    return None;
                }
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                }
                expect_key = true;
            }
            '[' => {
                if expect_key && key.is_empty() {
                    return None;
                }
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                }
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        _ => return None,
                    }
                }
                segments.push(PathSegment::Index(digits.parse().ok()?));
                expect_key = false;
            }
            ']' => return None,
            other => {
                key.push(other);
                expect_key = false;
            }
        }
    }

    if expect_key {
        return None;
    }
    if !key.is_empty() {
        segments.push(PathSegment::Key(key));
    }
    Some(segments)
}

/// Walks `root` along `path`. Missing keys, wrong shapes and out-of-bounds
/// indices resolve to `None`; nothing panics.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    walk(root, &segments)
}

pub fn walk<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |current, segment| match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

/// Splits a full path into its root identifier and the remainder.
///
/// `user.address[0]` becomes `("user", ".address[0]")`, `items[2].name`
/// becomes `("items", "[2].name")`.
pub fn split_root(path: &str) -> (&str, &str) {
    let end = path.find(['.', '[']).unwrap_or(path.len());
    path.split_at(end)
}
