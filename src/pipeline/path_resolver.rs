//! # Path Resolution Module
//!
//! Centralizes destination path computation so every processor mirrors the
//! source tree the same way, and no destination ever escapes its root.

use crate::{
    error::{BuildError, Result},
    task::{AssetCategory, FileTask},
};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Computes output paths for the processors
pub struct PathResolver;

impl PathResolver {
    /// Mirror `file` from `source_root` into `destination_root`.
    ///
    /// `file` must live under `source_root` (as returned by the enumerator);
    /// anything else, or a relative part containing `..`, is rejected.
    pub fn mirror(source_root: &Path, destination_root: &Path, file: &Path) -> Result<PathBuf> {
        let relative = file
            .strip_prefix(source_root)
            .map_err(|_| BuildError::OutsideDestination {
                path: file.to_path_buf(),
                root: source_root.to_path_buf(),
            })?;

        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(BuildError::OutsideDestination {
                path: file.to_path_buf(),
                root: destination_root.to_path_buf(),
            });
        }

        let result = destination_root.join(relative);
        debug!("Resolved output path: {} -> {}", file.display(), result.display());
        Ok(result)
    }

    /// Build the task list for a batch of enumerated files
    pub fn tasks_for(
        files: Vec<PathBuf>,
        source_root: &Path,
        destination_root: &Path,
        category: AssetCategory,
    ) -> Result<Vec<FileTask>> {
        files
            .into_iter()
            .map(|source| {
                let destination = Self::mirror(source_root, destination_root, &source)?;
                Ok(FileTask {
                    source,
                    destination,
                    category,
                })
            })
            .collect()
    }

    /// Output file name of a script bundle: the last member's stem plus `.min.js`
    pub fn bundle_output_name(files: &[String]) -> Option<String> {
        let last = Path::new(files.last()?);
        let stem = last.file_stem()?.to_string_lossy();
        Some(format!("{}.min.js", stem))
    }

    /// Join a plain file name onto a destination root, refusing anything that
    /// is not a single normal path component.
    pub fn join_file_name(destination_root: &Path, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(destination_root.join(name)),
            _ => Err(BuildError::OutsideDestination {
                path: PathBuf::from(name),
                root: destination_root.to_path_buf(),
            }),
        }
    }

    /// Create the parent directories of `path` if they are missing
    pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::io(parent, e))?;
        }
        Ok(())
    }
}
