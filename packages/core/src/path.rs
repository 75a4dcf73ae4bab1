//! Virtual absolute-path helpers.
//!
//! These operate on the virtual namespace rooted at `/` and never touch the
//! host filesystem. Relative paths are resolved against the root.

/// Resolves `p` to an absolute, normalized form: collapses `.` segments,
/// repeated separators, and `..` segments (clamping at the root), and drops
/// any trailing separator.
pub fn resolve(p: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in p.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// The directory portion of a normalized absolute path. The root is its own
/// dirname.
pub fn dirname(p: &str) -> String {
    match p.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(at) => p[..at].to_string(),
    }
}

/// The final segment of a normalized absolute path; empty for the root.
pub fn basename(p: &str) -> String {
    match p.rfind('/') {
        Some(at) => p[at + 1..].to_string(),
        None => p.to_string(),
    }
}

/// Joins and normalizes. An absolute `b` replaces `a`.
pub fn join(a: &str, b: &str) -> String {
    if b.starts_with('/') {
        resolve(b)
    } else {
        resolve(&format!("{}/{}", a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_normalizes() {
        assert_eq!(resolve("/a/b/c"), "/a/b/c");
        assert_eq!(resolve("a/b"), "/a/b");
        assert_eq!(resolve("/a//b/./c/"), "/a/b/c");
        assert_eq!(resolve("/a/b/../c"), "/a/c");
        assert_eq!(resolve("/../.."), "/");
        assert_eq!(resolve(""), "/");
        assert_eq!(resolve("/"), "/");
    }

    #[test]
    fn dirname_and_basename() {
        assert_eq!(dirname("/a/b/c"), "/a/b");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(basename("/a/b/c"), "c");
        assert_eq!(basename("/a"), "a");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn join_handles_absolute_and_relative() {
        assert_eq!(join("/a/b", "c"), "/a/b/c");
        assert_eq!(join("/a/b", "../c"), "/a/c");
        assert_eq!(join("/a/b", "/x/y"), "/x/y");
    }
}
