//! Per-resource migration driver

use crate::emitter::Emitter;
use crate::imports::{ImportResolver, KnownImports};
use crate::pipeline::Pipeline;
use crate::scaffold::build_typed_file;
use crate::{GeneratorError, Result};
use hemmer_provider_migrator_analyzer::{extract, Registry, RegistryEntry};
use hemmer_provider_migrator_common::{MigrationConfig, MigrationSummary};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Migrates resources from a pre-scanned registry
///
/// Every resource is independent: a failure is recorded in the summary and
/// the next name is processed.
pub struct Migrator {
    config: MigrationConfig,
    registry: Registry,
    pipeline: Pipeline,
    emitter: Emitter,
}

impl Migrator {
    pub fn new(config: MigrationConfig, registry: Registry) -> Self {
        let resolver = Box::new(KnownImports::new(&config.known_imports));
        Self {
            pipeline: Pipeline::standard(&config),
            emitter: Emitter::new(&config, resolver),
            config,
            registry,
        }
    }

    /// Replace the import resolver run after each write
    pub fn with_resolver(mut self, resolver: Box<dyn ImportResolver>) -> Self {
        self.emitter = Emitter::new(&self.config, resolver);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Migrate every named resource, in order
    pub fn migrate<S: AsRef<str>>(&self, names: &[S]) -> MigrationSummary {
        let mut summary = MigrationSummary::default();
        for name in names {
            let name = name.as_ref();
            let Some(entry) = self.registry.resolve(name, &self.config.name_prefix) else {
                info!(%name, "no untyped definition registered, skipping");
                summary.record_skipped(name, "not found in registry");
                continue;
            };

            match self.migrate_one(entry) {
                Ok((output, unresolved)) => {
                    if !unresolved.is_empty() {
                        warn!(
                            resource = %entry.name,
                            count = unresolved.len(),
                            "migrated with unresolved lookups, output needs manual completion"
                        );
                    }
                    summary.record_migrated(&entry.name, output, unresolved);
                }
                Err(e) => {
                    error!(resource = %entry.name, error = %e, "migration failed");
                    summary.record_skipped(name, e.to_string());
                }
            }
        }
        summary
    }

    /// Extract, rewrite, assemble and write one resource
    ///
    /// Returns the written path and the unresolved lookups left in it.
    pub fn migrate_one(&self, entry: &RegistryEntry) -> Result<(PathBuf, Vec<String>)> {
        info!(resource = %entry.name, source = %entry.path.display(), "migrating");
        self.config.validate()?;
        let mut meta = extract(entry, &self.config)?;
        let state = self.pipeline.run(&mut meta, &self.config);

        if self.config.strict && !state.unresolved().is_empty() {
            return Err(GeneratorError::Unresolved {
                resource: entry.name.clone(),
                count: state.unresolved().len(),
            });
        }

        let file = build_typed_file(&meta, &state, &self.config)?;
        let output = self.emitter.emit(&entry.path, &file)?;
        info!(resource = %entry.name, output = %output.display(), "wrote typed resource");
        Ok((output, state.into_unresolved()))
    }
}
