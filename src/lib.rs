//! # Planet Build Library
//!
//! Asset build pipeline for the Putt Putt Planet site: recompresses images,
//! minifies stylesheets and assembles minified script bundles from the
//! `public/` tree into `distrib/`.
//!
//! ## Modules:
//! - `config`: layered settings (CLI over JSON file over defaults) and validation
//! - `cli`: command line flags
//! - `error`: typed build errors
//! - `file_manager`: source tree enumeration and size helpers
//! - `task`: per-file work items
//! - `image_processor`: JPEG/PNG recompression or plain copy
//! - `stylesheet_processor`: CSS minification
//! - `script_processor`: page bundles and library scripts
//! - `pipeline`: orchestrator, bounded runner, shared context, path resolution
//! - `progress`: progress bars and compression statistics
//! - `logging`: `tracing` subscriber setup
//!
//! ## Usage:
//! ```ignore
//! use planet_build::{BuildConfig, BuildOrchestrator};
//!
//! let orchestrator = BuildOrchestrator::new(BuildConfig::default())?;
//! let stats = orchestrator.run().await;
//! println!("{}", stats.format_summary());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod script_processor;
pub mod stylesheet_processor;
pub mod task;

pub use config::{BuildConfig, ConfigLayer};
pub use error::BuildError;
pub use pipeline::{BuildContext, BuildOrchestrator};
pub use progress::CompressionStats;
