//! State shared by every processor of one build.

use crate::{config::BuildConfig, pipeline::runner::BoundedRunner, progress::SharedStats};
use std::sync::Arc;

/// Settings, statistics and worker limit for one build, passed explicitly to
/// each processor
#[derive(Clone, Debug)]
pub struct BuildContext {
    pub config: Arc<BuildConfig>,
    pub stats: SharedStats,
    pub runner: BoundedRunner,
}

impl BuildContext {
    pub fn new(config: BuildConfig) -> Self {
        let runner = BoundedRunner::new(config.worker_limit());
        Self {
            config: Arc::new(config),
            stats: SharedStats::new(),
            runner,
        }
    }

    /// Progress bars are shown only when per-file logging is off
    pub fn show_progress(&self) -> bool {
        !self.config.verbose
    }
}
