//! # Progress Tracking and Statistics Module
//!
//! Run-wide compression statistics and per-category progress bars.
//!
//! ## Components:
//! - `CompressionStats`: additive accumulator of files, original bytes,
//!   compressed bytes, errors and timing for one build
//! - `SharedStats`: cloneable handle guarding one `CompressionStats` behind a
//!   mutex, so processors running on different worker threads can record
//!   into it
//! - `ProgressManager`: `indicatif` bar for a batch of files
//!
//! ## Invariant
//! Contributions are only ever added. Once every processor has settled, the
//! totals equal the sum of the per-file (or per-bundle) contributions.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ images [00:00:04] [========================>---------------] 92/150 (61%) windmill.png
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Manages progress reporting for one batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress bar for `total` items; a hidden bar when `enabled` is false
    pub fn new(total: u64, label: &str, enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(total);
        let template = format!(
            "{{spinner:.green}} {} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{percent}}%) {{msg}}",
            label
        );
        if let Ok(style) = ProgressStyle::default_bar().template(&template) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Advance by one item and show `message`
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics accumulated over one build
#[derive(Debug, Clone)]
pub struct CompressionStats {
    pub total_files: usize,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub errors: usize,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
}

impl Default for CompressionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionStats {
    pub fn new() -> Self {
        Self {
            total_files: 0,
            original_bytes: 0,
            compressed_bytes: 0,
            errors: 0,
            started_at: Instant::now(),
            finished_at: None,
        }
    }

    /// Add the contribution of `files` source files that produced `compressed` bytes
    pub fn record(&mut self, files: usize, original: u64, compressed: u64) {
        self.total_files += files;
        self.original_bytes += original;
        self.compressed_bytes += compressed;
    }

    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Stamp the end time (first call wins)
    pub fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Instant::now());
        }
    }

    /// Bytes saved; negative when the build grew the assets
    pub fn bytes_saved(&self) -> i64 {
        self.original_bytes as i64 - self.compressed_bytes as i64
    }

    pub fn percent_saved(&self) -> f64 {
        FileManager::calculate_reduction(self.original_bytes, self.compressed_bytes)
    }

    /// Seconds between start and finish (or now, while running)
    pub fn elapsed_secs(&self) -> f64 {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
            .as_secs_f64()
    }

    pub fn format_summary(&self) -> String {
        let saved = self.bytes_saved();
        let saved_text = if saved < 0 {
            format!("-{}", FileManager::format_size(saved.unsigned_abs()))
        } else {
            FileManager::format_size(saved as u64)
        };

        format!(
            "Files: {} | Original: {} | Compressed: {} | Saved: {} ({:.2}%) | Errors: {} | Time: {:.2}s",
            self.total_files,
            FileManager::format_size(self.original_bytes),
            FileManager::format_size(self.compressed_bytes),
            saved_text,
            self.percent_saved(),
            self.errors,
            self.elapsed_secs()
        )
    }
}

/// Shared, mutex-guarded handle on the build's `CompressionStats`
#[derive(Clone, Debug, Default)]
pub struct SharedStats {
    inner: Arc<Mutex<CompressionStats>>,
}

impl SharedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, files: usize, original: u64, compressed: u64) {
        self.inner.lock().await.record(files, original, compressed);
    }

    pub async fn add_error(&self) {
        self.inner.lock().await.add_error();
    }

    pub async fn finish(&self) {
        self.inner.lock().await.finish();
    }

    /// Copy of the current totals
    pub async fn snapshot(&self) -> CompressionStats {
        self.inner.lock().await.clone()
    }
}
