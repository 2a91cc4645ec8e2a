//! # Stylesheet Processing Module
//!
//! Minifies every stylesheet of the CSS source tree into the mirrored
//! destination tree with `lightningcss` (parse, minify, print without
//! whitespace). Disabled as a whole by `compress_css = false`.
//!
//! A file the minifier rejects is logged and skipped; the batch continues.

use crate::{
    error::{BuildError, Result},
    file_manager::FileManager,
    pipeline::{BuildContext, PathResolver},
    progress::ProgressManager,
    task::{AssetCategory, FileTask},
};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use tracing::{debug, info};

/// Minify one stylesheet; `filename` only labels errors
pub fn minify_stylesheet(source: &str, filename: &str) -> Result<String> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };

    let mut sheet = StyleSheet::parse(source, options).map_err(|e| BuildError::Stylesheet {
        name: filename.to_string(),
        message: e.to_string(),
    })?;

    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| BuildError::Stylesheet {
            name: filename.to_string(),
            message: e.to_string(),
        })?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| BuildError::Stylesheet {
            name: filename.to_string(),
            message: e.to_string(),
        })?;

    Ok(printed.code)
}

/// Per-file stylesheet minification
#[derive(Clone, Debug)]
pub struct StylesheetProcessor {
    dry_run: bool,
}

impl StylesheetProcessor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Minify one stylesheet, returning `(original_size, minified_size)`
    pub async fn process_file(&self, task: &FileTask) -> Result<(u64, u64)> {
        let source = tokio::fs::read_to_string(&task.source)
            .await
            .map_err(|e| BuildError::io(&task.source, e))?;
        let original_size = source.len() as u64;

        let filename = task.display_name();
        let minified = tokio::task::spawn_blocking(move || minify_stylesheet(&source, &filename)).await??;
        let minified_size = minified.len() as u64;

        if self.dry_run {
            debug!("Dry run: would write {}", task.destination.display());
        } else {
            PathResolver::ensure_parent_dirs(&task.destination).await?;
            tokio::fs::write(&task.destination, &minified)
                .await
                .map_err(|e| BuildError::io(&task.destination, e))?;
        }

        debug!(
            "{}: {} -> {} ({:.1}%)",
            task.display_name(),
            FileManager::format_size(original_size),
            FileManager::format_size(minified_size),
            FileManager::calculate_reduction(original_size, minified_size)
        );

        Ok((original_size, minified_size))
    }

    /// Minify every stylesheet under the configured source tree
    pub async fn run(ctx: &BuildContext) -> anyhow::Result<()> {
        let config = &ctx.config;
        if !config.compress_css {
            info!("Stylesheet compression disabled, skipping {}", config.css_source.display());
            return Ok(());
        }

        let files = FileManager::find_matching_files(&config.css_source, &config.css_glob, &config.exclude)?;
        let tasks = PathResolver::tasks_for(
            files,
            &config.css_source,
            &config.css_destination,
            AssetCategory::Stylesheet,
        )?;
        info!("Found {} stylesheets in {}", tasks.len(), config.css_source.display());

        let processor = Self::new(config.dry_run);
        let progress = ProgressManager::new(tasks.len() as u64, AssetCategory::Stylesheet.label(), ctx.show_progress());

        let result = ctx
            .runner
            .run(tasks, |task| {
                let processor = processor.clone();
                let stats = ctx.stats.clone();
                let progress = progress.clone();
                async move {
                    let outcome = processor.process_file(&task).await;
                    progress.update(&task.display_name());
                    match outcome {
                        Ok((original, minified)) => {
                            stats.record(1, original, minified).await;
                            Ok(())
                        }
                        Err(e) => {
                            stats.add_error().await;
                            Err(anyhow::Error::new(e)
                                .context(format!("Stylesheet {} failed", task.source.display())))
                        }
                    }
                }
            })
            .await;

        progress.finish("stylesheets done");
        result.map(|_| ())
    }
}
