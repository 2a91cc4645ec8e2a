//! # Configuration Management Module
//!
//! Resolves the settings for one build from three layers, in priority order:
//! CLI flags, then the JSON config file, then built-in defaults.
//!
//! ## Parameters:
//! - `js_source` / `js_destination`: script tree (default `./public/js` -> `./distrib/js`)
//! - `image_source` / `image_destination`: image tree (default `./public/images` -> `./distrib/images`)
//! - `css_source` / `css_destination`: stylesheet tree (default `./public/css` -> `./distrib/css`)
//! - `optimize_images`: recompress images instead of copying them (default: true)
//! - `verbose`: per-file logging (default: true)
//! - `dry_run`: compute everything, write nothing (default: false)
//! - `image_glob` / `css_glob`: extension specs such as `{jpg,jpeg,png,gif}`
//! - `compress_javascript` / `mangle_javascript`: minifier toggles (default: true)
//! - `page_bundles`: bundle name -> ordered list of member scripts
//! - `libraries`: library files copied verbatim plus one combined bundle
//!
//! ## Config file keys
//! The JSON object mirrors the CLI flag names (`jsSource`, `optimizeImages`,
//! `dryrun`, `isCompressJavaScript`, `pageBundles`, ...). Every key is optional.
//!
//! ## Example:
//! ```ignore
//! let (config, file_error) = BuildConfig::load(&config_path, cli.to_layer()).await;
//! if let Some(e) = file_error {
//!     error!("{}; continuing with defaults", e);
//! }
//! ```

use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default location of the JSON config file
pub const DEFAULT_CONFIG_PATH: &str = "./bin/build-config.json";

/// Pre-built library scripts shipped alongside the page bundles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryManifest {
    /// Files copied verbatim from the script source to the destination
    pub copy: Vec<String>,
    /// Files concatenated and minified into `combined_name`
    pub combine: Vec<String>,
    /// Output file name of the combined library bundle
    pub combined_name: String,
}

impl Default for LibraryManifest {
    fn default() -> Self {
        Self {
            copy: Vec::new(),
            combine: Vec::new(),
            combined_name: "libs.min.js".to_string(),
        }
    }
}

/// Fully resolved build settings, immutable for the duration of a build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildConfig {
    pub js_source: PathBuf,
    pub js_destination: PathBuf,
    pub image_source: PathBuf,
    pub image_destination: PathBuf,
    pub css_source: PathBuf,
    pub css_destination: PathBuf,
    pub optimize_images: bool,
    pub verbose: bool,
    pub dry_run: bool,
    pub exclude: Vec<PathBuf>,
    pub logfile: Option<PathBuf>,
    pub image_glob: String,
    pub css_glob: String,
    pub compress_javascript: bool,
    pub mangle_javascript: bool,
    pub compress_css: bool,
    /// Bundle name -> ordered member files, relative to `js_source`
    pub page_bundles: BTreeMap<String, Vec<String>>,
    /// File names never included in a page bundle
    pub js_ignore: Vec<String>,
    pub libraries: LibraryManifest,
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
    /// oxipng preset (0-6)
    pub png_preset: u8,
    /// Overrides the CPU-count worker limit
    pub workers: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            js_source: PathBuf::from("./public/js"),
            js_destination: PathBuf::from("./distrib/js"),
            image_source: PathBuf::from("./public/images"),
            image_destination: PathBuf::from("./distrib/images"),
            css_source: PathBuf::from("./public/css"),
            css_destination: PathBuf::from("./distrib/css"),
            optimize_images: true,
            verbose: true,
            dry_run: false,
            exclude: Vec::new(),
            logfile: None,
            image_glob: "{jpg,jpeg,png,gif}".to_string(),
            css_glob: "css".to_string(),
            compress_javascript: true,
            mangle_javascript: true,
            compress_css: true,
            page_bundles: BTreeMap::new(),
            js_ignore: Vec::new(),
            libraries: LibraryManifest::default(),
            jpeg_quality: 80,
            png_preset: 2,
            workers: None,
        }
    }
}

/// One layer of partial settings: the config file or the CLI.
/// `None` means "not set here, fall through to the layer below".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    pub js_source: Option<PathBuf>,
    pub js_destination: Option<PathBuf>,
    pub image_source: Option<PathBuf>,
    pub image_destination: Option<PathBuf>,
    pub css_source: Option<PathBuf>,
    pub css_destination: Option<PathBuf>,
    pub optimize_images: Option<bool>,
    pub verbose: Option<bool>,
    #[serde(rename = "dryrun")]
    pub dry_run: Option<bool>,
    pub exclude: Option<Vec<PathBuf>>,
    pub logfile: Option<PathBuf>,
    pub image_glob: Option<String>,
    pub css_glob: Option<String>,
    #[serde(rename = "isCompressJavaScript")]
    pub compress_javascript: Option<bool>,
    #[serde(rename = "isMangleJavaScript")]
    pub mangle_javascript: Option<bool>,
    pub compress_css: Option<bool>,
    pub page_bundles: Option<BTreeMap<String, Vec<String>>>,
    pub js_ignore: Option<Vec<String>>,
    pub libraries: Option<LibraryManifest>,
    pub jpeg_quality: Option<u8>,
    pub png_preset: Option<u8>,
    pub workers: Option<usize>,
}

impl ConfigLayer {
    /// Read a config layer from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BuildError::ConfigNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(BuildError::io(path, e)),
        };

        serde_json::from_str(&content).map_err(|source| BuildError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl BuildConfig {
    /// Merge the layers: CLI > config file > defaults
    pub fn resolve(file: Option<ConfigLayer>, cli: ConfigLayer) -> Self {
        let mut config = Self::default();
        if let Some(file) = file {
            config.apply(file);
        }
        config.apply(cli);
        config
    }

    /// Load the config file at `path` and resolve it with the CLI layer.
    ///
    /// Fails soft: a missing or malformed file is handed back next to a config
    /// built from defaults and CLI flags, so the caller can log it and carry on.
    pub async fn load(path: &Path, cli: ConfigLayer) -> (Self, Option<BuildError>) {
        match ConfigLayer::from_file(path).await {
            Ok(file) => (Self::resolve(Some(file), cli), None),
            Err(e) => (Self::resolve(None, cli), Some(e)),
        }
    }

    fn apply(&mut self, layer: ConfigLayer) {
        let ConfigLayer {
            js_source,
            js_destination,
            image_source,
            image_destination,
            css_source,
            css_destination,
            optimize_images,
            verbose,
            dry_run,
            exclude,
            logfile,
            image_glob,
            css_glob,
            compress_javascript,
            mangle_javascript,
            compress_css,
            page_bundles,
            js_ignore,
            libraries,
            jpeg_quality,
            png_preset,
            workers,
        } = layer;

        override_with(&mut self.js_source, js_source);
        override_with(&mut self.js_destination, js_destination);
        override_with(&mut self.image_source, image_source);
        override_with(&mut self.image_destination, image_destination);
        override_with(&mut self.css_source, css_source);
        override_with(&mut self.css_destination, css_destination);
        override_with(&mut self.optimize_images, optimize_images);
        override_with(&mut self.verbose, verbose);
        override_with(&mut self.dry_run, dry_run);
        override_with(&mut self.exclude, exclude);
        override_with(&mut self.image_glob, image_glob);
        override_with(&mut self.css_glob, css_glob);
        override_with(&mut self.compress_javascript, compress_javascript);
        override_with(&mut self.mangle_javascript, mangle_javascript);
        override_with(&mut self.compress_css, compress_css);
        override_with(&mut self.page_bundles, page_bundles);
        override_with(&mut self.js_ignore, js_ignore);
        override_with(&mut self.libraries, libraries);
        override_with(&mut self.jpeg_quality, jpeg_quality);
        override_with(&mut self.png_preset, png_preset);
        if logfile.is_some() {
            self.logfile = logfile;
        }
        if workers.is_some() {
            self.workers = workers;
        }
    }

    /// Validate value ranges. Paths are not checked here: a missing source
    /// tree shows up later as an enumeration error for that category.
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(BuildError::Validation(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        if self.png_preset > 6 {
            return Err(BuildError::Validation(
                "PNG preset must be between 0 and 6".to_string(),
            ));
        }

        if self.workers == Some(0) {
            return Err(BuildError::Validation(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Maximum number of files transformed at once
    pub fn worker_limit(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_only() {
        let config = BuildConfig::resolve(None, ConfigLayer::default());
        assert!(config.optimize_images);
        assert_eq!(config.js_destination, PathBuf::from("./distrib/js"));
        assert!(config.verbose);
        assert!(!config.dry_run);
        assert_eq!(config.image_glob, "{jpg,jpeg,png,gif}");
        assert_eq!(config.libraries.combined_name, "libs.min.js");
    }

    #[test]
    fn test_file_overrides_default_when_cli_absent() {
        let file = ConfigLayer {
            optimize_images: Some(false),
            ..Default::default()
        };
        let config = BuildConfig::resolve(Some(file), ConfigLayer::default());
        assert!(!config.optimize_images);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigLayer {
            optimize_images: Some(true),
            js_source: Some(PathBuf::from("file/js")),
            ..Default::default()
        };
        let cli = ConfigLayer {
            optimize_images: Some(false),
            ..Default::default()
        };
        let config = BuildConfig::resolve(Some(file), cli);
        assert!(!config.optimize_images);
        assert_eq!(config.js_source, PathBuf::from("file/js"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = BuildConfig::default();
        assert!(config.validate().is_ok());

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.jpeg_quality = 80;
        config.png_preset = 7;
        assert!(config.validate().is_err());

        config.png_preset = 2;
        config.workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_limit() {
        let mut config = BuildConfig::default();
        assert!(config.worker_limit() >= 1);

        config.workers = Some(3);
        assert_eq!(config.worker_limit(), 3);
    }

    #[tokio::test]
    async fn test_load_parses_camel_case_keys() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("build-config.json");
        tokio::fs::write(
            &config_path,
            r#"{
                "jsDestination": "./out/js",
                "optimizeImages": false,
                "dryrun": true,
                "isMangleJavaScript": false,
                "pageBundles": { "home": ["a.js", "home.js"] },
                "libraries": { "copy": ["jquery.min.js"] }
            }"#,
        )
        .await
        .unwrap();

        let (config, error) = BuildConfig::load(&config_path, ConfigLayer::default()).await;
        assert!(error.is_none());
        assert_eq!(config.js_destination, PathBuf::from("./out/js"));
        assert!(!config.optimize_images);
        assert!(config.dry_run);
        assert!(!config.mangle_javascript);
        assert!(config.compress_javascript);
        assert_eq!(config.page_bundles["home"], vec!["a.js", "home.js"]);
        assert_eq!(config.libraries.copy, vec!["jquery.min.js"]);
        assert_eq!(config.libraries.combined_name, "libs.min.js");
    }

    #[tokio::test]
    async fn test_load_missing_file_fails_soft() {
        let temp_dir = TempDir::new().unwrap();
        let cli = ConfigLayer {
            dry_run: Some(true),
            ..Default::default()
        };

        let (config, error) = BuildConfig::load(&temp_dir.path().join("nope.json"), cli).await;
        assert!(matches!(error, Some(BuildError::ConfigNotFound(_))));
        assert!(config.dry_run);
        assert!(config.optimize_images);
    }

    #[tokio::test]
    async fn test_load_malformed_file_fails_soft() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("build-config.json");
        tokio::fs::write(&config_path, "{ not json").await.unwrap();

        let (config, error) = BuildConfig::load(&config_path, ConfigLayer::default()).await;
        assert!(matches!(error, Some(BuildError::ConfigParse { .. })));
        assert_eq!(config, BuildConfig::default());
    }
}
