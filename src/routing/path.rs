//! Path canonicalization.

/// Path delimiter used in both route definitions and request paths.
pub const DELIMITER: char = '/';

/// Strip the leading and trailing delimiter from a path.
///
/// `normalize("/a/b/") == "a/b"`. Repeated boundary delimiters are all
/// removed so that `normalize(normalize(p)) == normalize(p)` for every input.
pub fn normalize(path: &str) -> String {
    path.trim_matches(DELIMITER).to_string()
}

/// Split a path into its non-empty segments.
pub fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(DELIMITER).filter(|s| !s.is_empty())
}

/// Join a parent path and a child path, skipping empty sides.
pub fn join(parent: &str, child: &str) -> String {
    let parent = normalize(parent);
    let child = normalize(child);
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child,
        (_, true) => parent,
        _ => format!("{}{}{}", parent, DELIMITER, child),
    }
}
