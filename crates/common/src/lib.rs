//! Common types and utilities for the Hemmer Provider Migrator
//!
//! This crate contains the migration configuration, shared value kinds,
//! error types, and the run summary used across the analyzer, generator,
//! and CLI components.

pub mod config;
mod summary;

pub use config::{MigrationConfig, SchemaHelper};
pub use summary::{MigratedResource, MigrationSummary, SkippedResource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while configuring or reporting a migration
#[derive(Error, Debug)]
pub enum MigratorError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for migrator operations
pub type Result<T> = std::result::Result<T, MigratorError>;

/// Value kind of a persisted schema attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Set,
    Map,
}

impl ValueKind {
    /// Rust type used for a scalar kind, `None` for collections
    pub fn scalar_rust_type(self) -> Option<&'static str> {
        match self {
            ValueKind::String => Some("String"),
            ValueKind::Integer => Some("i64"),
            ValueKind::Float => Some("f64"),
            ValueKind::Boolean => Some("bool"),
            ValueKind::List | ValueKind::Set | ValueKind::Map => None,
        }
    }

    /// Whether values of this kind are sequences
    pub fn is_sequence(self) -> bool {
        matches!(self, ValueKind::List | ValueKind::Set)
    }

    /// Parse the variant name used by `pluginsdk::ValueType`
    pub fn from_variant(name: &str) -> Option<Self> {
        match name {
            "String" => Some(ValueKind::String),
            "Int" | "Integer" => Some(ValueKind::Integer),
            "Float" => Some(ValueKind::Float),
            "Bool" | "Boolean" => Some(ValueKind::Boolean),
            "List" => Some(ValueKind::List),
            "Set" => Some(ValueKind::Set),
            "Map" => Some(ValueKind::Map),
            _ => None,
        }
    }
}
