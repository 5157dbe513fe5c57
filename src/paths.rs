//! URL path helpers shared by the registry, the serving engine and the
//! deploy orchestrator.

/// Normalizes an asset path so it always starts with `/`.
///
/// Backslashes are turned into forward slashes so paths built from Windows
/// file names line up with request paths. An empty path becomes `/`.
///
/// # Examples
///
/// ```
/// use siteship::paths::normalize_asset_path;
///
/// assert_eq!(normalize_asset_path("index.html"), "/index.html");
/// assert_eq!(normalize_asset_path("/assets/app.js"), "/assets/app.js");
/// assert_eq!(normalize_asset_path("assets\\app.js"), "/assets/app.js");
/// assert_eq!(normalize_asset_path(""), "/");
/// ```
pub fn normalize_asset_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

/// Returns the last `/`-delimited segment of a path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// True iff the last path segment contains a `.` that is not its first
/// character.
///
/// Dotfiles such as `.well-known` do not count as having an extension.
///
/// # Examples
///
/// ```
/// use siteship::paths::has_file_extension;
///
/// assert!(has_file_extension("/assets/app.js"));
/// assert!(!has_file_extension("/about"));
/// assert!(!has_file_extension("/.well-known"));
/// assert!(has_file_extension("/.well-known/security.txt"));
/// ```
pub fn has_file_extension(path: &str) -> bool {
    last_segment(path)
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0)
}

/// Strips a configured mount prefix from a request path.
///
/// Prefix `/` (or empty) is a no-op. A prefix only matches on a segment
/// boundary, so `/app` strips `/app/x` but not `/apple`. A path that
/// strips to nothing becomes `/`. Paths outside the prefix are returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use siteship::paths::strip_path_prefix;
///
/// assert_eq!(strip_path_prefix("/app/main.js", "/app"), "/main.js");
/// assert_eq!(strip_path_prefix("/app", "/app/"), "/");
/// assert_eq!(strip_path_prefix("/apple", "/app"), "/apple");
/// assert_eq!(strip_path_prefix("/x", "/"), "/x");
/// ```
pub fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path;
    }
    match path.strip_prefix(prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_has_file_extension_cases() {
        assert!(has_file_extension("/index.html"));
        assert!(has_file_extension("/a/b/c.tar.gz"));
        assert!(has_file_extension("file.txt"));
        assert!(!has_file_extension("/"));
        assert!(!has_file_extension(""));
        assert!(!has_file_extension("/users/42"));
        assert!(!has_file_extension("/.env"));
        // Only the last segment matters
        assert!(!has_file_extension("/v1.2/docs"));
    }

    #[test]
    fn test_strip_prefix_cases() {
        assert_eq!(strip_path_prefix("/docs/guide", "/docs"), "/guide");
        assert_eq!(strip_path_prefix("/docs/", "/docs"), "/");
        assert_eq!(strip_path_prefix("/docs", "/docs"), "/");
        assert_eq!(strip_path_prefix("/other", "/docs"), "/other");
        assert_eq!(strip_path_prefix("/docsx", "/docs/"), "/docsx");
        assert_eq!(strip_path_prefix("/", ""), "/");
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/a/b/c.js"), "c.js");
        assert_eq!(last_segment("/a/b/"), "");
        assert_eq!(last_segment("plain"), "plain");
    }

    proptest! {
        #[test]
        fn normalized_paths_start_with_slash(path in "[a-zA-Z0-9/._\\\\-]{0,40}") {
            let normalized = normalize_asset_path(&path);
            prop_assert!(normalized.starts_with('/'));
            prop_assert!(!normalized.contains('\\'));
            prop_assert_eq!(normalize_asset_path(&normalized), normalized.clone());
        }

        #[test]
        fn dotfile_segments_have_no_extension(name in "[a-z0-9_-]{1,12}") {
            let path = format!("/dir/.{name}");
            prop_assert!(!has_file_extension(&path));
        }
    }
}
