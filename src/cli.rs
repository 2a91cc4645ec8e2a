//! # Command Line Interface
//!
//! Flag names follow the build config keys (`--jsSource=...`,
//! `--optimizeImages`), so the same vocabulary works on the command line and in
//! `build-config.json`. Boolean flags accept an optional value: a bare
//! `--optimizeImages` means `true`, `--optimizeImages=false` turns it off, and
//! leaving the flag out defers to the config file.

use crate::config::{ConfigLayer, DEFAULT_CONFIG_PATH};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "planet-build")]
#[command(about = "Optimize images, stylesheets and script bundles for the Putt Putt Planet site")]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// JSON config file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Script source directory
    #[arg(long = "jsSource", value_name = "PATH")]
    pub js_source: Option<PathBuf>,

    /// Script destination directory
    #[arg(long = "jsDestination", value_name = "PATH")]
    pub js_destination: Option<PathBuf>,

    /// Image source directory
    #[arg(long = "imageSource", value_name = "PATH")]
    pub image_source: Option<PathBuf>,

    /// Image destination directory
    #[arg(long = "imageDestination", value_name = "PATH")]
    pub image_destination: Option<PathBuf>,

    /// Stylesheet source directory
    #[arg(long = "cssSource", value_name = "PATH")]
    pub css_source: Option<PathBuf>,

    /// Stylesheet destination directory
    #[arg(long = "cssDestination", value_name = "PATH")]
    pub css_destination: Option<PathBuf>,

    /// Recompress images instead of copying them
    #[arg(
        long = "optimizeImages",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub optimize_images: Option<bool>,

    /// Per-file logging
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub verbose: Option<bool>,

    /// Compute everything but write nothing
    #[arg(
        long = "dryrun",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub dry_run: Option<bool>,

    /// Skip everything under this path (repeatable)
    #[arg(long, value_name = "PATH")]
    pub exclude: Vec<PathBuf>,

    /// Also write log output to this file
    #[arg(long, value_name = "PATH")]
    pub logfile: Option<PathBuf>,

    /// Maximum files transformed at once (default: logical CPU count)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Print help
    #[arg(short = '?', long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    /// The CLI layer of the config merge
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            js_source: self.js_source.clone(),
            js_destination: self.js_destination.clone(),
            image_source: self.image_source.clone(),
            image_destination: self.image_destination.clone(),
            css_source: self.css_source.clone(),
            css_destination: self.css_destination.clone(),
            optimize_images: self.optimize_images,
            verbose: self.verbose,
            dry_run: self.dry_run,
            exclude: (!self.exclude.is_empty()).then(|| self.exclude.clone()),
            logfile: self.logfile.clone(),
            workers: self.workers,
            ..ConfigLayer::default()
        }
    }
}
