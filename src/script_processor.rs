//! # Script Processing Module
//!
//! Builds the script bundles of the site.
//!
//! ## Page bundles
//! Each entry of `page_bundles` names an ordered list of member scripts
//! (relative to `js_source`). Members listed in `js_ignore` are skipped. Every
//! remaining member is parsed and minified as a script of its own, so its
//! directives stay at the head of its code, and the results are joined in
//! order with an explicit statement boundary between members. The bundle is
//! written as `<last member stem>.min.js` in `js_destination`.
//!
//! ## Libraries
//! `libraries.copy` files are copied verbatim; `libraries.combine` files are
//! concatenated and minified into `libraries.combined_name`.
//!
//! ## Minification
//! `ScriptMinifier` parses with `oxc_parser`, then runs `oxc_minifier` with
//! compression and mangling toggled by `compress_javascript` /
//! `mangle_javascript`, and prints with `oxc_codegen`. With both toggles off
//! the source is still parsed (a syntax error fails the bundle) but is written
//! unchanged. Minified output carries no comments.
//!
//! A failure in one bundle is logged and only that bundle is lost.

use crate::{
    config::BuildConfig,
    error::{BuildError, Result},
    file_manager::FileManager,
    pipeline::{BuildContext, PathResolver},
    progress::SharedStats,
};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Minify/mangle settings for one build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptMinifier {
    pub compress: bool,
    pub mangle: bool,
}

impl ScriptMinifier {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            compress: config.compress_javascript,
            mangle: config.mangle_javascript,
        }
    }

    /// Minify `source`; `name` only labels errors
    pub fn minify(&self, name: &str, source: &str) -> Result<String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, script_source_type()).parse();

        if ret.panicked || !ret.errors.is_empty() {
            let message = ret
                .errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "parser aborted".to_string());
            return Err(BuildError::ScriptParse {
                name: name.to_string(),
                message,
            });
        }

        if self.is_passthrough() {
            return Ok(source.to_string());
        }

        let mut program = ret.program;
        let mut options = MinifierOptions::default();
        options.compress = self.compress.then(CompressOptions::default);
        options.mangle = self.mangle.then(MangleOptions::default);
        let minified = Minifier::new(options).minify(&allocator, &mut program);

        let code = Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(minified.scoping)
            .build(&program)
            .code;

        Ok(code)
    }

    /// Raw sources pass through untouched
    pub fn is_passthrough(&self) -> bool {
        !self.compress && !self.mangle
    }

    /// Parse-only check: `Ok` when `source` is a valid script
    pub fn check_syntax(name: &str, source: &str) -> Result<()> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, script_source_type()).parse();
        match ret.errors.first() {
            Some(e) => Err(BuildError::ScriptParse {
                name: name.to_string(),
                message: e.to_string(),
            }),
            None if ret.panicked => Err(BuildError::ScriptParse {
                name: name.to_string(),
                message: "parser aborted".to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn script_source_type() -> SourceType {
    SourceType::default().with_script(true)
}

/// Result of writing one bundle
#[derive(Debug, Clone, PartialEq)]
pub struct BundleReport {
    pub output: PathBuf,
    /// Member files read into the bundle
    pub files: usize,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

/// Page bundles and library scripts
#[derive(Clone)]
pub struct ScriptProcessor {
    config: Arc<BuildConfig>,
    minifier: ScriptMinifier,
}

impl ScriptProcessor {
    pub fn new(config: Arc<BuildConfig>) -> Self {
        let minifier = ScriptMinifier::from_config(&config);
        Self { config, minifier }
    }

    /// Build one page bundle from its manifest entry
    pub async fn build_page_bundle(&self, name: &str, files: &[String]) -> Result<BundleReport> {
        let output_name = PathResolver::bundle_output_name(files)
            .ok_or_else(|| BuildError::Validation(format!("Bundle {} lists no files", name)))?;
        let output = PathResolver::join_file_name(&self.config.js_destination, &output_name)?;

        let members: Vec<&String> = files
            .iter()
            .filter(|f| {
                let ignored = self.is_ignored(f);
                if ignored {
                    debug!("Bundle {}: skipping ignored {}", name, f);
                }
                !ignored
            })
            .collect();

        self.build_bundle(name, &members, output).await
    }

    /// Copy the verbatim libraries and build the combined library bundle.
    /// Every library is attempted; the first failure is returned at the end.
    pub async fn build_libraries(&self, stats: &SharedStats) -> anyhow::Result<()> {
        let libraries = &self.config.libraries;
        let mut first_error: Option<BuildError> = None;

        for file in &libraries.copy {
            match self.copy_library(file).await {
                Ok(size) => stats.record(1, size, size).await,
                Err(e) => {
                    error!("Library {} failed: {}", file, e);
                    stats.add_error().await;
                    first_error.get_or_insert(e);
                }
            }
        }

        if !libraries.combine.is_empty() {
            let members: Vec<&String> = libraries.combine.iter().collect();
            let combined = PathResolver::join_file_name(&self.config.js_destination, &libraries.combined_name);
            let result = match combined {
                Ok(output) => self.build_bundle(&libraries.combined_name, &members, output).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => {
                    log_report(&libraries.combined_name, &report);
                    stats
                        .record(report.files, report.original_bytes, report.compressed_bytes)
                        .await;
                }
                Err(e) => {
                    error!("Library bundle {} failed: {}", libraries.combined_name, e);
                    stats.add_error().await;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Build every page bundle (bounded by the runner), then the libraries
    pub async fn run(ctx: &BuildContext) -> anyhow::Result<()> {
        let processor = Self::new(ctx.config.clone());
        let bundles: Vec<(String, Vec<String>)> = ctx
            .config
            .page_bundles
            .iter()
            .map(|(name, files)| (name.clone(), files.clone()))
            .collect();

        info!(
            "Building {} page bundles and {} libraries from {}",
            bundles.len(),
            ctx.config.libraries.copy.len() + usize::from(!ctx.config.libraries.combine.is_empty()),
            ctx.config.js_source.display()
        );

        let pages = ctx
            .runner
            .run(bundles, |(name, files)| {
                let processor = processor.clone();
                let stats = ctx.stats.clone();
                async move {
                    match processor.build_page_bundle(&name, &files).await {
                        Ok(report) => {
                            log_report(&name, &report);
                            stats
                                .record(report.files, report.original_bytes, report.compressed_bytes)
                                .await;
                            Ok(())
                        }
                        Err(e) => {
                            stats.add_error().await;
                            Err(anyhow::Error::new(e).context(format!("Bundle {} failed", name)))
                        }
                    }
                }
            })
            .await;

        let libraries = processor.build_libraries(&ctx.stats).await;

        pages?;
        libraries
    }

    fn is_ignored(&self, file: &str) -> bool {
        let file_name = std::path::Path::new(file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        self.config
            .js_ignore
            .iter()
            .any(|ignored| ignored == file || Some(ignored) == file_name.as_ref())
    }

    async fn build_bundle(&self, name: &str, files: &[&String], output: PathBuf) -> Result<BundleReport> {
        if files.is_empty() {
            return Err(BuildError::Validation(format!("Bundle {} has nothing to build", name)));
        }

        let mut entries = Vec::with_capacity(files.len());
        let mut original_bytes = 0u64;
        for file in files {
            let path = self.config.js_source.join(file.as_str());
            let source = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| BuildError::io(&path, e))?;
            original_bytes += source.len() as u64;
            entries.push(((*file).clone(), source));
        }

        let minifier = self.minifier;
        let label = name.to_string();
        let file_count = entries.len();
        let code = tokio::task::spawn_blocking(move || bundle_entries(minifier, &label, &entries)).await??;

        if self.config.dry_run {
            debug!("Dry run: would write {}", output.display());
        } else {
            PathResolver::ensure_parent_dirs(&output).await?;
            tokio::fs::write(&output, &code)
                .await
                .map_err(|e| BuildError::io(&output, e))?;
        }

        Ok(BundleReport {
            output,
            files: file_count,
            original_bytes,
            compressed_bytes: code.len() as u64,
        })
    }

    async fn copy_library(&self, file: &str) -> Result<u64> {
        let source = self.config.js_source.join(file);
        let destination = PathResolver::mirror(&self.config.js_source, &self.config.js_destination, &source)?;
        let size = FileManager::file_size(&source).await?;

        if self.config.dry_run {
            debug!("Dry run: would copy {}", destination.display());
        } else {
            PathResolver::ensure_parent_dirs(&destination).await?;
            tokio::fs::copy(&source, &destination)
                .await
                .map_err(|e| BuildError::io(&destination, e))?;
            debug!("Copied library {}", file);
        }

        Ok(size)
    }
}

/// Minify each `(file, source)` entry as its own script and join them in order.
///
/// An entry is always closed before the next one starts: a member ending
/// without `;` (or on a line comment, in passthrough mode) must not run into
/// the first statement of the following member.
fn bundle_entries(minifier: ScriptMinifier, bundle: &str, entries: &[(String, String)]) -> Result<String> {
    let mut bundled = String::new();
    for (file, source) in entries {
        let code = minifier.minify(&format!("{} ({})", bundle, file), source)?;
        let code = code.trim_end();
        if code.is_empty() {
            continue;
        }
        bundled.push_str(code);
        if minifier.is_passthrough() || !code.ends_with(';') {
            bundled.push_str("\n;");
        }
        bundled.push('\n');
    }
    Ok(bundled)
}

fn log_report(name: &str, report: &BundleReport) {
    info!(
        "Bundle {} -> {} ({} files): {} -> {} ({:.1}%)",
        name,
        report.output.display(),
        report.files,
        FileManager::format_size(report.original_bytes),
        FileManager::format_size(report.compressed_bytes),
        FileManager::calculate_reduction(report.original_bytes, report.compressed_bytes)
    );
}
