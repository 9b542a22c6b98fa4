//! Hemmer Provider Migrator CLI
//!
//! Command-line interface for migrating untyped provider resources to typed,
//! model-backed resources.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use hemmer_provider_migrator_analyzer::Registry;
use hemmer_provider_migrator_common::{MigrationConfig, MigrationSummary};
use hemmer_provider_migrator_generator::Migrator;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hemmer-provider-migrator")]
#[command(version, about = "Migrate untyped provider resources to typed resources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate resources and write `<file>_typed.rs` beside each definition
    #[command(after_help = "EXAMPLES:\n  \
        # Migrate one resource (the azurerm_ prefix is optional)\n  \
        hemmer-provider-migrator migrate --source ./internal/services redis_cache\n\n  \
        # Migrate several resources with a custom config and a JSON report\n  \
        hemmer-provider-migrator migrate \\\n    \
        --source ./internal/services \\\n    \
        --config migrate.yaml \\\n    \
        --report report.json \\\n    \
        azurerm_redis_cache azurerm_storage_account\n\n  \
        # Refuse to write resources with unresolved lookups\n  \
        hemmer-provider-migrator migrate --source ./internal/services --strict redis_cache")]
    Migrate {
        /// Provider source directory to scan
        #[arg(short, long)]
        source: PathBuf,

        /// Migration config (YAML); built-in conventions if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write a JSON summary of the run
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Fail resources that have unresolved lookups
        #[arg(long)]
        strict: bool,

        /// Resource type names to migrate
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List the untyped resource definitions found in a source directory
    List {
        /// Provider source directory to scan
        #[arg(short, long)]
        source: PathBuf,

        /// Migration config (YAML); built-in conventions if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Migrate {
            source,
            config,
            report,
            strict,
            names,
        } => {
            migrate_command(
                source.as_path(),
                config.as_deref(),
                report.as_deref(),
                strict,
                &names,
            )?;
        }
        Commands::List { source, config } => {
            list_command(source.as_path(), config.as_deref(), cli.verbose)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug output
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<MigrationConfig> {
    match path {
        Some(path) => {
            println!("{} Loading config: {}", "→".cyan(), path.display());
            MigrationConfig::load(path).context("Failed to load migration config")
        }
        None => Ok(MigrationConfig::default()),
    }
}

fn scan(source: &Path, config: &MigrationConfig) -> Result<Registry> {
    println!("{} Scanning {}", "→".cyan(), source.display());
    let registry = Registry::scan(source, config)
        .with_context(|| format!("Failed to scan {}", source.display()))?;
    println!(
        "{} Found {} resource definitions",
        "✓".green(),
        registry.len()
    );
    Ok(registry)
}

fn migrate_command(
    source: &Path,
    config_path: Option<&Path>,
    report: Option<&Path>,
    strict: bool,
    names: &[String],
) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.strict |= strict;
    let registry = scan(source, &config)?;

    println!("{} Migrating {} resources...", "→".cyan(), names.len());
    let migrator = Migrator::new(config, registry);
    let summary = migrator.migrate(names);

    print_summary(&summary);

    if let Some(report) = report {
        summary
            .write_json(report)
            .with_context(|| format!("Failed to write report {}", report.display()))?;
        println!("\n{} Report written to {}", "✓".green(), report.display());
    }

    if summary.migrated.is_empty() {
        bail!("No resources were migrated");
    }
    Ok(())
}

fn print_summary(summary: &MigrationSummary) {
    if !summary.migrated.is_empty() {
        println!("\n{}", "Migrated:".bold());
        for migrated in &summary.migrated {
            println!(
                "  {} {} → {}",
                "✓".green(),
                migrated.name.cyan(),
                migrated.output.display()
            );
        }
    }

    let incomplete: Vec<_> = summary.incomplete().collect();
    if !incomplete.is_empty() {
        println!("\n{}", "Needs manual completion:".bold());
        for migrated in incomplete {
            println!(
                "  {} {} ({} unresolved)",
                "⚠".yellow(),
                migrated.name.cyan(),
                migrated.unresolved.len()
            );
            for lookup in &migrated.unresolved {
                println!("      {}", lookup.dimmed());
            }
        }
    }

    if !summary.skipped.is_empty() {
        println!("\n{}", "Skipped:".bold());
        for skipped in &summary.skipped {
            println!("  {} {}: {}", "✗".red(), skipped.name.cyan(), skipped.reason);
        }
    }

    println!(
        "\n{} {} migrated, {} skipped",
        if summary.skipped.is_empty() {
            "✓".green().bold()
        } else {
            "⚠".yellow().bold()
        },
        summary.migrated.len(),
        summary.skipped.len()
    );
}

fn list_command(source: &Path, config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = scan(source, &config)?;

    println!("\n{}", "Resources:".bold());
    for entry in registry.entries() {
        if verbose {
            println!(
                "  • {} ({} in {})",
                entry.name.cyan(),
                entry.function,
                entry.path.display()
            );
        } else {
            println!("  • {}", entry.name.cyan());
        }
    }
    Ok(())
}
