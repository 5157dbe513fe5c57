//! Build output discovery.
//!
//! Walks the dist directory in sorted order so repeated deploys of the same
//! tree issue the same sequence of calls.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::mime::guess_content_type;
use crate::paths::normalize_asset_path;

/// One file to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// URL path it will be served at, e.g. `/assets/app.js`.
    pub path: String,
    /// Where it lives on disk.
    pub fs_path: PathBuf,
    pub content_type: &'static str,
}

/// Every file of one build, in deploy order.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    pub root: PathBuf,
    pub files: Vec<LocalFile>,
}

impl FileSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size on disk, best effort.
    pub fn total_bytes(&self) -> u64 {
        self.files
            .iter()
            .filter_map(|f| fs::metadata(&f.fs_path).ok())
            .map(|m| m.len())
            .sum()
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Collects every file under `root`, skipping paths that match `exclude`.
///
/// Patterns are matched against the path relative to `root` with `/`
/// separators. An excluded directory is not descended into. Symlinked
/// directories are followed, each real directory at most once.
///
/// # Errors
///
/// Returns an error if `root` is not a directory, a pattern is invalid, or
/// a directory cannot be read.
pub fn discover(root: &Path, exclude: &[String]) -> Result<FileSet> {
    if !root.is_dir() {
        anyhow::bail!(
            "Deploy directory not found: {}\n  Build your app first, or pass --dir",
            root.display()
        );
    }

    let patterns = exclude
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude pattern: {p}")))
        .collect::<Result<Vec<_>>>()?;

    let mut walker = Walker {
        root,
        exclude: &patterns,
        visited: HashSet::new(),
        files: Vec::new(),
    };
    walker.enter(root)?;
    walker.walk(root)?;
    let files = walker.files;

    Ok(FileSet {
        root: root.to_path_buf(),
        files,
    })
}

struct Walker<'a> {
    root: &'a Path,
    exclude: &'a [Pattern],
    /// Canonical directories already descended into
    visited: HashSet<PathBuf>,
    files: Vec<LocalFile>,
}

impl Walker<'_> {
    /// Marks `dir` visited; false if it was reached before through a link.
    fn enter(&mut self, dir: &Path) -> Result<bool> {
        let canonical = fs::canonicalize(dir)
            .with_context(|| format!("Failed to resolve directory: {}", dir.display()))?;
        Ok(self.visited.insert(canonical))
    }

    fn walk(&mut self, dir: &Path) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        entries.sort_by_key(fs::DirEntry::file_name);

        for entry in entries {
            let fs_path = entry.path();
            let Ok(relative) = fs_path.strip_prefix(self.root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if self
                .exclude
                .iter()
                .any(|p| p.matches_with(&relative, MATCH_OPTIONS))
            {
                continue;
            }

            // Follows symlinks; broken links are skipped
            let Ok(meta) = fs::metadata(&fs_path) else {
                continue;
            };
            if meta.is_dir() {
                if !self.enter(&fs_path)? {
                    warn!(path = %fs_path.display(), "Skipping directory already visited through a symlink");
                    continue;
                }
                self.walk(&fs_path)?;
            } else if meta.is_file() {
                self.files.push(LocalFile {
                    path: normalize_asset_path(&relative),
                    content_type: guess_content_type(&fs_path),
                    fs_path,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("assets/img")).unwrap();
        fs::write(root.join("index.html"), "<h1>hi</h1>").unwrap();
        fs::write(root.join("assets/index-aZ3kP9.js"), "1").unwrap();
        fs::write(root.join("assets/app.css"), "body{}").unwrap();
        fs::write(root.join("assets/img/logo.png"), [0u8; 4]).unwrap();
        fs::write(root.join(".DS_Store"), "x").unwrap();
        fs::write(root.join("assets/app.js.map"), "{}").unwrap();
        tmp
    }

    fn paths(set: &FileSet) -> Vec<&str> {
        set.files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_discover_sorted_with_content_types() {
        let tmp = build_tree();
        let set = discover(tmp.path(), &[]).unwrap();

        assert_eq!(
            paths(&set),
            vec![
                "/.DS_Store",
                "/assets/app.css",
                "/assets/app.js.map",
                "/assets/img/logo.png",
                "/assets/index-aZ3kP9.js",
                "/index.html",
            ]
        );
        let index = set.files.iter().find(|f| f.path == "/index.html").unwrap();
        assert_eq!(index.content_type, "text/html; charset=utf-8");
        assert_eq!(index.fs_path, tmp.path().join("index.html"));
    }

    #[test]
    fn test_discover_excludes() {
        let tmp = build_tree();
        let exclude = vec!["**/.DS_Store".to_string(), "**/*.map".to_string()];
        let set = discover(tmp.path(), &exclude).unwrap();

        assert_eq!(set.len(), 4);
        assert!(!paths(&set).contains(&"/.DS_Store"));
        assert!(!paths(&set).contains(&"/assets/app.js.map"));
    }

    #[test]
    fn test_excluded_directory_is_skipped() {
        let tmp = build_tree();
        let set = discover(tmp.path(), &["assets/img".to_string()]).unwrap();
        assert!(!paths(&set).contains(&"/assets/img/logo.png"));
        assert!(paths(&set).contains(&"/assets/app.css"));
    }

    #[test]
    fn test_empty_directory_is_empty_set() {
        let tmp = TempDir::new().unwrap();
        let set = discover(tmp.path(), &[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.total_bytes(), 0);
    }

    #[test]
    fn test_missing_directory_errors() {
        let tmp = TempDir::new().unwrap();
        let err = discover(&tmp.path().join("dist"), &[]).unwrap_err();
        assert!(err.to_string().contains("Deploy directory not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_walked_once() {
        use std::os::unix::fs::symlink;

        let tmp = build_tree();
        // assets/img/up -> assets, a cycle through a directory link
        symlink(tmp.path().join("assets"), tmp.path().join("assets/img/up")).unwrap();
        symlink(tmp.path().join("assets/img"), tmp.path().join("pictures")).unwrap();

        let set = discover(tmp.path(), &[]).unwrap();
        let logos: Vec<_> = paths(&set)
            .into_iter()
            .filter(|p| p.ends_with("logo.png"))
            .collect();
        assert_eq!(logos, vec!["/assets/img/logo.png"]);
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_total_bytes_sums_file_sizes() {
        let tmp = build_tree();
        let set = discover(tmp.path(), &[]).unwrap();
        // "<h1>hi</h1>" + "1" + "body{}" + 4 + "x" + "{}"
        assert_eq!(set.total_bytes(), 11 + 1 + 6 + 4 + 1 + 2);
    }

    #[test]
    fn test_invalid_pattern_errors() {
        let tmp = build_tree();
        let err = discover(tmp.path(), &["[oops".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Invalid exclude pattern"));
    }
}
