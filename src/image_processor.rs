//! # Image Processing Module
//!
//! Recompresses (or copies) every image of the source tree into the mirrored
//! destination tree.
//!
//! ## Codec set
//!
//! Compression is delegated to a pluggable set of per-format codecs:
//!
//! | Format | Codec       | Mode                                   |
//! |--------|-------------|----------------------------------------|
//! | JPEG   | `JpegCodec` | lossy re-encode at `jpeg_quality`      |
//! | PNG    | `PngCodec`  | lossless, `oxipng` preset `png_preset` |
//! | other  | none        | byte-for-byte copy                     |
//!
//! ## Pipeline per file
//!
//! 1. Read the source bytes
//! 2. `optimize_images = true` and a codec handles the extension: compress on
//!    the blocking pool; otherwise copy verbatim
//! 3. Create the destination directories (idempotent) and write, unless dry run
//! 4. Report `(original, compressed)` sizes to the caller
//!
//! A transform may grow a file; both sizes are reported as they are.
//!
//! ## Error handling
//!
//! A stat, read, decode or write error fails that file only. `run` records it
//! as an error, leaves its bytes out of the totals and keeps going.

use crate::{
    config::BuildConfig,
    error::{BuildError, Result},
    file_manager::FileManager,
    pipeline::{BuildContext, PathResolver},
    progress::ProgressManager,
    task::{AssetCategory, FileTask},
};
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A format-specific compressor
pub trait ImageCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this codec handles files with the given lower-case extension
    fn handles(&self, extension: &str) -> bool;

    /// Compress an encoded image into a new encoded image of the same format
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Lossy JPEG re-encoding
pub struct JpegCodec {
    pub quality: u8,
}

impl ImageCodec for JpegCodec {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn handles(&self, extension: &str) -> bool {
        matches!(extension, "jpg" | "jpeg")
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
        let mut out = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
            encoder.encode_image(&img.to_rgb8())?;
        }
        Ok(out)
    }
}

/// Lossless PNG optimization
pub struct PngCodec {
    pub preset: u8,
}

impl ImageCodec for PngCodec {
    fn name(&self) -> &'static str {
        "png"
    }

    fn handles(&self, extension: &str) -> bool {
        extension == "png"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let options = oxipng::Options::from_preset(self.preset);
        oxipng::optimize_from_memory(data, &options)
            .map_err(|e| BuildError::PngOptimization(e.to_string()))
    }
}

/// The codecs available to a build
#[derive(Clone, Default)]
pub struct CodecSet {
    codecs: Vec<Arc<dyn ImageCodec>>,
}

impl CodecSet {
    /// JPEG + PNG codecs configured from the build settings
    pub fn standard(config: &BuildConfig) -> Self {
        Self::default()
            .with(JpegCodec {
                quality: config.jpeg_quality,
            })
            .with(PngCodec {
                preset: config.png_preset,
            })
    }

    pub fn with(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codecs.push(Arc::new(codec));
        self
    }

    /// Codec for `path`, matched on its extension (case-insensitive)
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn ImageCodec>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.codecs.iter().find(|c| c.handles(&ext)).cloned()
    }
}

/// Per-file image transformation
#[derive(Clone)]
pub struct ImageProcessor {
    codecs: CodecSet,
    optimize: bool,
    dry_run: bool,
}

impl ImageProcessor {
    pub fn new(config: &BuildConfig) -> Self {
        Self::with_codecs(config, CodecSet::standard(config))
    }

    pub fn with_codecs(config: &BuildConfig, codecs: CodecSet) -> Self {
        Self {
            codecs,
            optimize: config.optimize_images,
            dry_run: config.dry_run,
        }
    }

    /// Transform one image, returning `(original_size, resulting_size)`
    pub async fn process_file(&self, task: &FileTask) -> Result<(u64, u64)> {
        let codec = if self.optimize {
            self.codecs.for_path(&task.source)
        } else {
            None
        };

        let Some(codec) = codec else {
            return self.copy_file(task).await;
        };

        let data = tokio::fs::read(&task.source)
            .await
            .map_err(|e| BuildError::io(&task.source, e))?;
        let original_size = data.len() as u64;

        let codec_name = codec.name();
        let compressed = tokio::task::spawn_blocking(move || codec.compress(&data)).await??;
        let compressed_size = compressed.len() as u64;

        if self.dry_run {
            debug!("Dry run: would write {}", task.destination.display());
        } else {
            PathResolver::ensure_parent_dirs(&task.destination).await?;
            tokio::fs::write(&task.destination, &compressed)
                .await
                .map_err(|e| BuildError::io(&task.destination, e))?;
        }

        debug!(
            "{} [{}]: {} -> {} ({:.1}%)",
            task.display_name(),
            codec_name,
            FileManager::format_size(original_size),
            FileManager::format_size(compressed_size),
            FileManager::calculate_reduction(original_size, compressed_size)
        );

        Ok((original_size, compressed_size))
    }

    async fn copy_file(&self, task: &FileTask) -> Result<(u64, u64)> {
        let size = FileManager::file_size(&task.source).await?;

        if self.dry_run {
            debug!("Dry run: would copy {} -> {}", task.source.display(), task.destination.display());
        } else {
            PathResolver::ensure_parent_dirs(&task.destination).await?;
            tokio::fs::copy(&task.source, &task.destination)
                .await
                .map_err(|e| BuildError::io(&task.destination, e))?;
            debug!("Copied {}", task.display_name());
        }

        Ok((size, size))
    }

    /// Process every image under the configured source tree
    pub async fn run(ctx: &BuildContext) -> anyhow::Result<()> {
        let config = &ctx.config;
        let files = FileManager::find_matching_files(&config.image_source, &config.image_glob, &config.exclude)?;
        let tasks = PathResolver::tasks_for(
            files,
            &config.image_source,
            &config.image_destination,
            AssetCategory::Image,
        )?;

        info!(
            "Found {} images in {} ({})",
            tasks.len(),
            config.image_source.display(),
            if config.optimize_images { "optimize" } else { "copy" }
        );

        let processor = Self::new(config);
        let progress = ProgressManager::new(tasks.len() as u64, AssetCategory::Image.label(), ctx.show_progress());

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
                        Ok((original, compressed)) => {
                            stats.record(1, original, compressed).await;
                            Ok(())
                        }
                        Err(e) => {
                            stats.add_error().await;
                            Err(anyhow::Error::new(e)
                                .context(format!("Image {} failed", task.source.display())))
                        }
                    }
                }
            })
            .await;

        progress.finish("images done");
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BuildContext;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
    }

    fn task(src: PathBuf, dst: PathBuf) -> FileTask {
        FileTask {
            source: src,
            destination: dst,
            category: AssetCategory::Image,
        }
    }

    #[test]
    fn test_codec_lookup_by_extension() {
        let codecs = CodecSet::standard(&BuildConfig::default());
        assert_eq!(codecs.for_path(Path::new("a.JPG")).map(|c| c.name()), Some("jpeg"));
        assert_eq!(codecs.for_path(Path::new("a.jpeg")).map(|c| c.name()), Some("jpeg"));
        assert_eq!(codecs.for_path(Path::new("a.png")).map(|c| c.name()), Some("png"));
        assert!(codecs.for_path(Path::new("a.gif")).is_none());
        assert!(codecs.for_path(Path::new("noext")).is_none());
    }

    #[tokio::test]
    async fn test_copy_mode_is_byte_identical_and_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src/holes/windmill.png");
        let dst = temp_dir.path().join("dst/holes/windmill.png");
        std::fs::create_dir_all(src.parent().unwrap()).unwrap();
        std::fs::write(&src, b"\x89PNG not really a png").unwrap();

        let config = BuildConfig {
            optimize_images: false,
            ..Default::default()
        };
        let processor = ImageProcessor::new(&config);
        let task = task(src.clone(), dst.clone());

        let first = processor.process_file(&task).await.unwrap();
        let first_bytes = std::fs::read(&dst).unwrap();
        let second = processor.process_file(&task).await.unwrap();
        let second_bytes = std::fs::read(&dst).unwrap();

        assert_eq!(first, (21, 21));
        assert_eq!(first, second);
        assert_eq!(first_bytes, std::fs::read(&src).unwrap());
        assert_eq!(first_bytes, second_bytes);
    }

    #[tokio::test]
    async fn test_png_is_optimized_losslessly() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("ball.png");
        let dst = temp_dir.path().join("out/ball.png");
        gradient(48, 48).save(&src).unwrap();

        let processor = ImageProcessor::new(&BuildConfig::default());
        let (original, compressed) = processor.process_file(&task(src.clone(), dst.clone())).await.unwrap();

        assert_eq!(original, std::fs::metadata(&src).unwrap().len());
        assert_eq!(compressed, std::fs::metadata(&dst).unwrap().len());
        let before = image::open(&src).unwrap().to_rgb8();
        let after = image::open(&dst).unwrap().to_rgb8();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_jpeg_is_reencoded() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("club.jpg");
        let dst = temp_dir.path().join("out/club.jpg");
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, 100)
            .encode_image(&gradient(32, 32))
            .unwrap();
        std::fs::write(&src, &encoded).unwrap();

        let config = BuildConfig {
            jpeg_quality: 40,
            ..Default::default()
        };
        let processor = ImageProcessor::new(&config);
        let (original, compressed) = processor.process_file(&task(src, dst.clone())).await.unwrap();

        assert_eq!(original, encoded.len() as u64);
        assert_eq!(compressed, std::fs::metadata(&dst).unwrap().len());
        let decoded = image::open(&dst).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("flag.png");
        let dst = temp_dir.path().join("out/flag.png");
        gradient(8, 8).save(&src).unwrap();

        let config = BuildConfig {
            dry_run: true,
            ..Default::default()
        };
        let processor = ImageProcessor::new(&config);
        let (original, _) = processor.process_file(&task(src, dst.clone())).await.unwrap();

        assert!(original > 0);
        assert!(!dst.exists());
        assert!(!temp_dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_run_skips_corrupt_file_and_keeps_going() {
        let temp_dir = TempDir::new().unwrap();
        let src_root = temp_dir.path().join("images");
        let dst_root = temp_dir.path().join("distrib");
        std::fs::create_dir_all(src_root.join("sub")).unwrap();
        gradient(16, 16).save(src_root.join("good.png")).unwrap();
        gradient(16, 16).save(src_root.join("sub/also-good.png")).unwrap();
        std::fs::write(src_root.join("broken.png"), b"garbage").unwrap();
        std::fs::write(src_root.join("anim.gif"), b"GIF89a").unwrap();

        let config = BuildConfig {
            image_source: src_root.clone(),
            image_destination: dst_root.clone(),
            workers: Some(2),
            ..Default::default()
        };
        let ctx = BuildContext::new(config);

        let result = ImageProcessor::run(&ctx).await;
        assert!(result.is_err());

        let stats = ctx.stats.snapshot().await;
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.errors, 1);
        assert!(dst_root.join("good.png").exists());
        assert!(dst_root.join("sub/also-good.png").exists());
        assert_eq!(std::fs::read(dst_root.join("anim.gif")).unwrap(), b"GIF89a");
        assert!(!dst_root.join("broken.png").exists());

        let expected_original: u64 = ["good.png", "sub/also-good.png", "anim.gif"]
            .iter()
            .map(|f| std::fs::metadata(src_root.join(f)).unwrap().len())
            .sum();
        assert_eq!(stats.original_bytes, expected_original);
    }
}
