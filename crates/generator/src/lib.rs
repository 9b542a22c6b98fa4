//! Rewrite pipeline and code emission for Hemmer provider migrations
//!
//! This crate turns the metadata extracted from an untyped resource into a
//! typed, model-backed resource: the rewrite pipeline normalizes accessor
//! idioms and promotes helpers, the scaffold assembles the typed resource
//! declaration, and the emitter formats and writes it beside the source.

mod driver;
mod emitter;
mod imports;
pub mod pipeline;
mod scaffold;

pub use driver::Migrator;
pub use emitter::{output_path, render, Emitter};
pub use imports::{ImportResolver, KnownImports};
pub use pipeline::{Pipeline, PipelineState};
pub use scaffold::build_typed_file;

use hemmer_provider_migrator_analyzer::AnalyzerError;
use hemmer_provider_migrator_common::MigratorError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while migrating one resource
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Config(#[from] MigratorError),

    #[error("Failed to build typed resource: {0}")]
    Scaffold(String),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Import resolution failed: {0}")]
    ImportResolution(String),

    #[error("{resource} has {count} unresolved lookups (strict mode)")]
    Unresolved { resource: String, count: usize },
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;
