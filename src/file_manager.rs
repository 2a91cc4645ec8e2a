//! # File Management Module
//!
//! File discovery and small file utilities shared by all processors.
//!
//! ## Responsibilities:
//! - Recursive discovery of files matching an extension spec
//! - Pruning of excluded subtrees
//! - File size lookup
//! - Human-readable sizes and reduction percentages for log lines
//!
//! ## Extension specs
//! The build config names file sets the way a shell glob suffix would:
//! `{jpg,jpeg,png,gif}` expands to four `*.ext` patterns, `css` to one.
//! Matching is case-insensitive and applies to the file name only; the walk
//! itself takes care of recursion.
//!
//! ## Example:
//! ```ignore
//! let images = FileManager::find_matching_files(
//!     Path::new("./public/images"),
//!     "{jpg,jpeg,png,gif}",
//!     &[],
//! )?;
//! ```

use crate::error::{BuildError, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub async fn file_size(path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| BuildError::io(path, e))?;
        Ok(metadata.len())
    }

    /// Find every file under `root` whose name matches the extension spec,
    /// skipping anything under one of the `exclude` paths.
    pub fn find_matching_files(root: &Path, spec: &str, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(BuildError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source directory not found"),
            ));
        }

        let patterns = parse_extension_spec(spec)
            .iter()
            .map(|ext| Pattern::new(&format!("*.{}", ext)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let cwd = std::env::current_dir().map_err(|e| BuildError::io(".", e))?;
        let exclude: Vec<PathBuf> = exclude.iter().map(|p| normalize(p, &cwd)).collect();
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_excluded(e.path(), &exclude, &cwd))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy();
            if patterns.iter().any(|p| p.matches_with(&name, options)) {
                files.push(entry.path().to_path_buf());
            }
        }

        Ok(files)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Percentage saved going from `original_size` to `new_size`.
    /// Negative when the transform grew the file.
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

/// Expand an extension spec into bare, lower-cased extensions.
///
/// Accepts `{jpg,png}`, `*.{jpg,png}`, `.css` and `css`.
pub fn parse_extension_spec(spec: &str) -> Vec<String> {
    let spec = spec.trim();
    let spec = spec.strip_prefix("**/").unwrap_or(spec);
    let spec = spec.strip_prefix('*').unwrap_or(spec);
    let spec = spec.strip_prefix('.').unwrap_or(spec);
    let spec = spec
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(spec);

    spec.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// `exclude` entries must already be normalized against `cwd`
fn is_excluded(path: &Path, exclude: &[PathBuf], cwd: &Path) -> bool {
    if exclude.is_empty() {
        return false;
    }
    let path = normalize(path, cwd);
    exclude.iter().any(|ex| path.starts_with(ex))
}

/// Absolute form of `path` without `.` components, so `./public/x`,
/// `public/x` and `<cwd>/public/x` compare equal
fn normalize(path: &Path, cwd: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_parse_extension_spec() {
        assert_eq!(parse_extension_spec("{jpg,jpeg,png,gif}"), vec!["jpg", "jpeg", "png", "gif"]);
        assert_eq!(parse_extension_spec("css"), vec!["css"]);
        assert_eq!(parse_extension_spec("*.{JS, mjs}"), vec!["js", "mjs"]);
        assert_eq!(parse_extension_spec(".css"), vec!["css"]);
        assert!(parse_extension_spec("{}").is_empty());
    }

    #[test]
    fn test_find_images_recursively() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "a.png");
        touch(root, "holes/b.png");
        touch(root, "holes/deep/c.PNG");
        touch(root, "d.jpg");
        touch(root, "holes/e.jpg");
        touch(root, "notes.txt");
        touch(root, "holes/style.css");

        let files = FileManager::find_matching_files(root, "{jpg,jpeg,png,gif}", &[]).unwrap();
        assert_eq!(files.len(), 5);
        assert!(files.iter().all(|f| f.starts_with(root)));
    }

    #[test]
    fn test_exclude_prunes_subtree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "keep/a.css");
        touch(root, "vendor/b.css");
        touch(root, "vendor/nested/c.css");

        let files = FileManager::find_matching_files(root, "css", &[root.join("vendor")]).unwrap();
        assert_eq!(files, vec![root.join("keep/a.css")]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileManager::find_matching_files(&temp_dir.path().join("missing"), "css", &[]);
        assert!(matches!(result, Err(BuildError::Io { .. })));
    }

    #[test]
    fn test_normalize_resolves_against_cwd() {
        let cwd = Path::new("/srv/site");
        assert_eq!(normalize(Path::new("./public/images"), cwd), PathBuf::from("/srv/site/public/images"));
        assert_eq!(normalize(Path::new("public/images"), cwd), PathBuf::from("/srv/site/public/images"));
        assert_eq!(normalize(Path::new("/srv/site/./public"), cwd), PathBuf::from("/srv/site/public"));
    }

    #[test]
    fn test_relative_exclude_prunes_absolute_root() {
        let temp_dir = TempDir::new_in(".").unwrap();
        let relative_root = PathBuf::from(temp_dir.path().file_name().unwrap());
        touch(&relative_root, "keep/a.css");
        touch(&relative_root, "raw/b.css");

        let absolute_root = std::env::current_dir().unwrap().join(&relative_root);
        let files =
            FileManager::find_matching_files(&absolute_root, "css", &[relative_root.join("raw")]).unwrap();
        assert_eq!(files, vec![absolute_root.join("keep/a.css")]);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 10), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
        assert!(FileManager::calculate_reduction(100, 120) < 0.0);
    }
}
