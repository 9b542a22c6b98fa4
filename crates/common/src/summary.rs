//! Outcome of a migration run

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to every requested resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub migrated: Vec<MigratedResource>,
    pub skipped: Vec<SkippedResource>,
}

/// A resource whose typed rendition was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratedResource {
    /// Resource type name as registered (e.g., "azurerm_redis_cache")
    pub name: String,
    /// Path of the generated file
    pub output: PathBuf,
    /// Metadata lookups that could not be resolved; the output needs manual completion
    pub unresolved: Vec<String>,
}

/// A resource that produced no output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedResource {
    /// Name as requested by the caller
    pub name: String,
    pub reason: String,
}

impl MigrationSummary {
    pub fn record_migrated(&mut self, name: &str, output: PathBuf, unresolved: Vec<String>) {
        self.migrated.push(MigratedResource {
            name: name.to_string(),
            output,
            unresolved,
        });
    }

    pub fn record_skipped(&mut self, name: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedResource {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    /// Resources migrated with unresolved lookups left in the output
    pub fn incomplete(&self) -> impl Iterator<Item = &MigratedResource> {
        self.migrated.iter().filter(|m| !m.unresolved.is_empty())
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
