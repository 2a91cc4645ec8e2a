//! # Error Types Module
//!
//! Typed errors raised by the build pipeline.
//!
//! ## Categories:
//! - `Io`: stat/read/write failures, always carrying the offending path
//! - `ConfigNotFound` / `ConfigParse`: config file problems (recovered by the caller)
//! - `Image` / `PngOptimization`: codec failures while recompressing images
//! - `ScriptParse`: a bundle that does not parse as a script
//! - `Stylesheet`: CSS minifier failures
//! - `OutsideDestination`: a computed destination would escape its root
//! - `Pattern`: an invalid glob spec
//! - `Validation`: out-of-range configuration values
//! - `Task`: a blocking worker panicked or was cancelled
//!
//! None of these is fatal to a build: processors log them and move on, the
//! orchestrator reports what was accumulated.

use std::path::PathBuf;

/// Custom error types for the asset build
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config file {path} is malformed: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG optimization error: {0}")]
    PngOptimization(String),

    #[error("Script parse error in {name}: {message}")]
    ScriptParse { name: String, message: String },

    #[error("Stylesheet minification failed for {name}: {message}")]
    Stylesheet { name: String, message: String },

    #[error("Path {path} does not resolve under {root}")]
    OutsideDestination { path: PathBuf, root: PathBuf },

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BuildError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
