//! # Pipeline Module
//!
//! Orchestration of a build, split into submodules:
//! - `orchestrator`: runs every category processor and reports the totals
//! - `runner`: bounded-concurrency driver for per-file work
//! - `context`: settings + stats + runner handed to each processor
//! - `path_resolver`: destination path computation

pub mod context;
pub mod orchestrator;
pub mod path_resolver;
pub mod runner;

pub use context::BuildContext;
pub use orchestrator::BuildOrchestrator;
pub use path_resolver::PathResolver;
pub use runner::BoundedRunner;
