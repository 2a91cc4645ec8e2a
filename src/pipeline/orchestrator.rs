//! # Build Orchestrator
//!
//! Runs the image, stylesheet and script processors of one build
//! concurrently over a shared `BuildContext`, then finalizes and reports the
//! aggregated `CompressionStats`.
//!
//! Category failures are logged, never propagated: a build always finishes
//! with a report of what was produced.

use crate::{
    config::BuildConfig,
    error::Result,
    file_manager::FileManager,
    image_processor::ImageProcessor,
    pipeline::BuildContext,
    progress::CompressionStats,
    script_processor::ScriptProcessor,
    stylesheet_processor::StylesheetProcessor,
    task::AssetCategory,
};
use tracing::{debug, error, info};

/// Drives a complete build
pub struct BuildOrchestrator {
    ctx: BuildContext,
}

impl BuildOrchestrator {
    /// Validate `config` and prepare the shared build context
    pub fn new(config: BuildConfig) -> Result<Self> {
        config.validate()?;
        let ctx = BuildContext::new(config);
        Self::log_mode(&ctx);
        Ok(Self { ctx })
    }

    fn log_mode(ctx: &BuildContext) {
        let config = &ctx.config;
        if config.optimize_images {
            info!(
                "Mode: Optimize images (JPEG quality: {}, PNG preset: {})",
                config.jpeg_quality, config.png_preset
            );
        } else {
            info!("Mode: Copy images unchanged");
        }
        info!(
            "Scripts: compress={} mangle={}, stylesheets: compress={}",
            config.compress_javascript, config.mangle_javascript, config.compress_css
        );
        if config.dry_run {
            info!("Dry run mode: No files will be written");
        }
        info!("Workers: {}", ctx.runner.limit());
        match serde_json::to_string(config.as_ref()) {
            Ok(json) => debug!("Effective config: {}", json),
            Err(e) => debug!("Effective config not serializable: {}", e),
        }
    }

    /// Run every processor to completion and return the final totals
    pub async fn run(&self) -> CompressionStats {
        let ctx = &self.ctx;
        info!("Starting asset build");

        let (images, stylesheets, scripts) = tokio::join!(
            ImageProcessor::run(ctx),
            StylesheetProcessor::run(ctx),
            ScriptProcessor::run(ctx),
        );

        for (category, outcome) in [
            (AssetCategory::Image, images),
            (AssetCategory::Stylesheet, stylesheets),
            (AssetCategory::Script, scripts),
        ] {
            if let Err(e) = outcome {
                error!("Processing {} failed: {:#}", category, e);
            }
        }

        ctx.stats.finish().await;
        let stats = ctx.stats.snapshot().await;
        Self::log_summary(&stats);
        stats
    }

    fn log_summary(stats: &CompressionStats) {
        info!("=== Build Complete ===");
        info!("Files processed: {}", stats.total_files);
        info!("Original size: {}", FileManager::format_size(stats.original_bytes));
        info!("Compressed size: {}", FileManager::format_size(stats.compressed_bytes));
        info!("Bytes saved: {}", stats.bytes_saved());
        info!("Average reduction: {:.2}%", stats.percent_saved());
        info!("Errors: {}", stats.errors);
        info!("Time: {:.2}s", stats.elapsed_secs());
    }
}
