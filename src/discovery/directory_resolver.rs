//! Directory Resolver - expands directory patterns into package directories
//!
//! Pattern lines follow the multi-line input conventions of CI workflows:
//! blank lines and `#` comments are ignored, `!pattern` excludes matches.
//! Only explicitly matched paths are returned; descendants of a matched
//! directory are not.

use crate::core::error::RescopeError;
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Pattern used when no directories are configured
pub const DEFAULT_PATTERN: &str = "./";

/// `*` and `?` never cross a `/`, same as when expanding include patterns
const EXCLUDE_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolves patterns relative to a root directory
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Expand `patterns` into existing directories, deduplicated in
    /// first-match order.
    ///
    /// An empty pattern list is a configuration error; a pattern that matches
    /// nothing simply contributes no directories.
    pub fn resolve(&self, patterns: &[String]) -> Result<Vec<PathBuf>, RescopeError> {
        if patterns.is_empty() {
            return Err(RescopeError::config(
                "directories",
                "at least one directory pattern is required",
            ));
        }

        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        for line in patterns.iter().map(|p| p.trim()) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.strip_prefix('!') {
                Some(negated) => {
                    let pattern = self.anchor_pattern(negated.trim());
                    let compiled = Pattern::new(&pattern.to_string_lossy())
                        .map_err(|e| invalid_pattern(line, e))?;
                    excludes.push(compiled);
                }
                None => includes.push(line),
            }
        }

        let mut seen = HashSet::new();
        let mut directories = Vec::new();
        for pattern in includes {
            for path in self.expand(pattern)? {
                if excludes
                    .iter()
                    .any(|p| p.matches_path_with(&path, EXCLUDE_OPTIONS))
                {
                    debug!(path = %path.display(), "excluded by pattern");
                    continue;
                }
                if !path.is_dir() {
                    continue;
                }
                if seen.insert(path.clone()) {
                    directories.push(path);
                }
            }
        }

        Ok(directories)
    }

    /// Matches of a single include pattern
    fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>, RescopeError> {
        if !has_glob_meta(pattern) {
            return Ok(vec![anchor(&self.root, pattern)]);
        }

        let anchored = self.anchor_pattern(pattern);
        let paths = glob::glob(&anchored.to_string_lossy())
            .map_err(|e| invalid_pattern(pattern, e))?;

        let mut matches = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                RescopeError::io(path, e.into())
            })?;
            matches.push(normalize(&path));
        }

        Ok(matches)
    }

    /// Anchor a glob pattern, escaping metacharacters in the root itself
    fn anchor_pattern(&self, pattern: &str) -> PathBuf {
        let root = self.root.to_string_lossy();
        if has_glob_meta(&root) {
            anchor(Path::new(&Pattern::escape(&root)), pattern)
        } else {
            anchor(&self.root, pattern)
        }
    }
}

/// Make `pattern` absolute against `root`
fn anchor(root: &Path, pattern: &str) -> PathBuf {
    let trimmed = pattern.trim_end_matches('/');
    let trimmed = match trimmed {
        "" if pattern.starts_with('/') => "/",
        "" => ".",
        other => other,
    };

    let path = Path::new(trimmed);
    if path.is_absolute() {
        return normalize(path);
    }
    normalize(&root.join(path))
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn invalid_pattern(pattern: &str, error: glob::PatternError) -> RescopeError {
    RescopeError::InvalidPattern {
        pattern: pattern.to_string(),
        message: error.to_string(),
    }
}

/// Drop `.` components so equal paths compare equal
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["packages/a", "packages/b", "packages/c/nested", "tools/cli"] {
            std::fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        std::fs::write(temp_dir.path().join("packages/README.md"), "# packages").unwrap();
        temp_dir
    }

    fn patterns(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_pattern_is_root() {
        let temp_dir = fixture();
        let resolver = DirectoryResolver::new(temp_dir.path());

        let dirs = resolver.resolve(&patterns(&[DEFAULT_PATTERN])).unwrap();
        assert_eq!(dirs, vec![temp_dir.path().to_path_buf()]);
    }

    #[test]
    fn test_glob_matches_only_directories() {
        let temp_dir = fixture();
        let resolver = DirectoryResolver::new(temp_dir.path());

        let dirs = resolver.resolve(&patterns(&["packages/*"])).unwrap();
        let root = temp_dir.path();
        assert_eq!(
            dirs,
            vec![
                root.join("packages/a"),
                root.join("packages/b"),
                root.join("packages/c"),
            ]
        );
    }

    #[test]
    fn test_order_and_dedup_follow_patterns() {
        let temp_dir = fixture();
        let resolver = DirectoryResolver::new(temp_dir.path());

        let dirs = resolver
            .resolve(&patterns(&["tools/cli/", "./packages/b", "packages/*"]))
            .unwrap();
        let root = temp_dir.path();
        assert_eq!(
            dirs,
            vec![
                root.join("tools/cli"),
                root.join("packages/b"),
                root.join("packages/a"),
                root.join("packages/c"),
            ]
        );
    }

    #[test]
    fn test_exclusions_and_comments() {
        let temp_dir = fixture();
        let resolver = DirectoryResolver::new(temp_dir.path());

        let dirs = resolver
            .resolve(&patterns(&["# all packages", "packages/*", "", "!packages/b"]))
            .unwrap();
        let root = temp_dir.path();
        assert_eq!(dirs, vec![root.join("packages/a"), root.join("packages/c")]);
    }

    #[test]
    fn test_exclusion_does_not_cross_separator() {
        let temp_dir = fixture();
        let resolver = DirectoryResolver::new(temp_dir.path());

        let dirs = resolver
            .resolve(&patterns(&["packages/*/*", "!packages/*"]))
            .unwrap();
        assert_eq!(dirs, vec![temp_dir.path().join("packages/c/nested")]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let temp_dir = fixture();
        let resolver = DirectoryResolver::new(temp_dir.path());

        assert!(resolver.resolve(&patterns(&["apps/*"])).unwrap().is_empty());
        assert!(resolver.resolve(&patterns(&["missing"])).unwrap().is_empty());
    }

    #[test]
    fn test_empty_pattern_list_is_error() {
        let resolver = DirectoryResolver::new(".");
        assert!(matches!(
            resolver.resolve(&[]),
            Err(RescopeError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let temp_dir = fixture();
        let resolver = DirectoryResolver::new(temp_dir.path());

        assert!(matches!(
            resolver.resolve(&patterns(&["packages/[*"])),
            Err(RescopeError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("./a/./b")), PathBuf::from("a/b"));
    }
}
