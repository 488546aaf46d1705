//! File discovery: recursive walk, extension match, ignore filter

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, ShrinkError};
use crate::processing::formats::matches_extension;

/// A discovered image that passed the extension and ignore filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the root, used in log lines
    pub relative: PathBuf,
}

impl Candidate {
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        Self { path, relative }
    }

    /// Relative path for display
    pub fn display(&self) -> std::path::Display<'_> {
        self.relative.display()
    }
}

/// Result of walking the root
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Matching files not excluded by an ignore pattern, in walk order
    pub included: Vec<Candidate>,
    /// Matching files excluded by an ignore pattern
    pub excluded: Vec<PathBuf>,
    /// Entries the walker could not read
    pub walk_errors: usize,
}

/// Make `root` absolute and check that it is a directory
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(root)?;

    match std::fs::metadata(&absolute) {
        Ok(metadata) if metadata.is_dir() => Ok(absolute),
        Ok(_) => Err(ShrinkError::RootNotDirectory { path: absolute }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ShrinkError::RootNotFound { path: absolute })
        }
        Err(e) => Err(e.into()),
    }
}

/// First ignore pattern contained in `path`, if any
pub fn ignored_by<'a>(path: &Path, ignore: &'a [String]) -> Option<&'a str> {
    let path = path.to_string_lossy();
    ignore
        .iter()
        .find(|pattern| path.contains(pattern.as_str()))
        .map(String::as_str)
}

/// Walk `root` recursively and collect images matching `extensions`.
///
/// `root` must already be resolved. Entries are visited in file-name order
/// within each directory. Symlinks are followed; loops surface as walk
/// errors, which are logged and skipped.
pub fn discover(root: &Path, extensions: &[String], ignore: &[String]) -> Discovery {
    let mut discovery = Discovery::default();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let shown = e
                    .path()
                    .map_or_else(|| root.display().to_string(), |p| p.display().to_string());
                warn!("[error] {} ({})", shown, ShrinkError::from(e).user_message());
                discovery.walk_errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() || !matches_extension(entry.path(), extensions) {
            continue;
        }

        let path = entry.into_path();
        if ignored_by(&path, ignore).is_some() {
            debug!("[exclude] {}", path.display());
            discovery.excluded.push(path);
        } else {
            debug!("[include] {}", path.display());
            discovery.included.push(Candidate::new(root, path));
        }
    }

    discovery
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn exts() -> Vec<String> {
        vec!["jpg".to_string(), "png".to_string()]
    }

    #[test]
    fn test_recursive_discovery_and_filtering() {
        let dir = TempDir::new().unwrap();
        let root = resolve_root(dir.path()).unwrap();
        touch(&root, "b.png");
        touch(&root, "a.JPG");
        touch(&root, "notes.txt");
        touch(&root, "nested/deeper/c.jpg");
        touch(&root, "node_modules/pkg/d.png");
        touch(&root, "e.png.tmp");

        let ignore = vec!["node_modules".to_string()];
        let found = discover(&root, &exts(), &ignore);

        let relative: Vec<_> = found.included.iter().map(|c| c.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.JPG"),
                PathBuf::from("b.png"),
                PathBuf::from("nested/deeper/c.jpg"),
            ]
        );
        assert_eq!(found.excluded.len(), 1);
        assert!(found.excluded[0].ends_with("node_modules/pkg/d.png"));
        assert!(found.included.iter().all(|c| c.path.is_absolute()));
    }

    #[test]
    fn test_order_is_stable() {
        let dir = TempDir::new().unwrap();
        let root = resolve_root(dir.path()).unwrap();
        for name in ["z.png", "m.png", "a.png", "sub/b.png"] {
            touch(&root, name);
        }

        let first = discover(&root, &exts(), &[]);
        let second = discover(&root, &exts(), &[]);
        assert_eq!(first.included, second.included);
    }

    #[test]
    fn test_ignore_matches_substring_anywhere() {
        let ignore = vec!["cache".to_string(), "thumb".to_string()];
        assert_eq!(ignored_by(Path::new("/p/.cache/a.png"), &ignore), Some("cache"));
        assert_eq!(ignored_by(Path::new("/p/a_thumb.png"), &ignore), Some("thumb"));
        assert_eq!(ignored_by(Path::new("/p/a.png"), &ignore), None);
    }

    #[test]
    fn test_resolve_root_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            resolve_root(&missing),
            Err(ShrinkError::RootNotFound { .. })
        ));

        touch(dir.path(), "file.png");
        assert!(matches!(
            resolve_root(&dir.path().join("file.png")),
            Err(ShrinkError::RootNotDirectory { .. })
        ));
    }
}
