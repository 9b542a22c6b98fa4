//! Resource analyzer for Hemmer Provider Migrator
//!
//! Scans a provider source tree for untyped resource definitions and
//! extracts everything the typed rewrite needs: models, schema arguments
//! and attributes, CRUD functions with their timeouts, and helpers.
//!
//! # Examples
//!
//! ```no_run
//! use hemmer_provider_migrator_analyzer::{extract, Registry};
//! use hemmer_provider_migrator_common::MigrationConfig;
//! use std::path::Path;
//!
//! let config = MigrationConfig::default();
//! let registry = Registry::scan(Path::new("./internal/services"), &config).expect("Scan failed");
//! let entry = registry.resolve("redis_cache", &config.name_prefix).expect("Unknown resource");
//! let meta = extract(entry, &config).expect("Extraction failed");
//!
//! println!("{} has {} models", meta.resource_name, meta.models.models().len());
//! ```

mod extractor;
mod model;
pub mod naming;
mod registry;
mod schema;

pub use extractor::{extract, Function, FunctionRole, MetaInfo};
pub use model::{Model, ModelField, ModelSet, PathStep};
pub use registry::{resource_literal, Registry, RegistryEntry};
pub use schema::{string_literal, SchemaElem, SchemaField, SchemaMap};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while analyzing untyped resources
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Failed to read source directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse Rust source {path:?}: {message}")]
    SynParse { path: PathBuf, message: String },

    #[error("No untyped definition found for resource {0}")]
    MissingDefinition(String),

    #[error("Resource {0} has no parseable schema map")]
    MissingSchema(String),

    #[error("Resource {resource} is missing its {function} function")]
    MissingFunction { resource: String, function: String },
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
