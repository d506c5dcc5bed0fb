///
/// This module implements the CLI interface for doc-sync: command parsing,
/// argument validation, the async entrypoint, and user-visible output.
///
/// All business logic (parsing, planning, translation, transformation) lives in
/// the `doc-sync-core` crate. This module is strictly CLI glue.
///
/// ## How To Use
/// - From the shell: `doc-sync --help`.
/// - Programmatically or from integration tests: call [`run`] with a constructed [`Cli`].
use crate::load_config::load_config;
use crate::provider::OpenAiProvider;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_sync_core::config::SyncConfig;
use doc_sync_core::diff::{DiffRecordParser, DiffSet};
use doc_sync_core::persist::write_atomic;
use doc_sync_core::plan::FileOperationPlanner;
use doc_sync_core::synchronise::{synchronise, Applied, SynchroniseReport};
use doc_sync_core::transform::MarkdownTransformer;
use std::path::{Path, PathBuf};

/// CLI for doc-sync: mirror reference documentation changes into a translated tree.
#[derive(Parser)]
#[clap(
    name = "doc-sync",
    version,
    about = "Apply a reference-docs change-list to a translated documentation tree"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a change-list: delete, move, copy and translate files
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Change-list file (name-status lines or a JSON envelope)
        #[clap(long)]
        diff: PathBuf,
        /// Target language code; overrides `language` in the config
        #[clap(long)]
        language: Option<String>,
    },
    /// Parse and plan a change-list without touching any file
    Plan {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        diff: PathBuf,
    },
    /// Run the markdown post-processing passes over files in place
    Transform {
        #[clap(long)]
        config: PathBuf,
        /// Markdown files to rewrite
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            config,
            diff,
            language,
        } => {
            let config = load_config(config)?;
            let set = read_diff(&config, &diff)?;
            tracing::info!(command = "sync", entries = set.entries.len(), "Starting synchronisation");
            let provider = OpenAiProvider::new_from_env(&config.provider);
            let report = synchronise(&config, &set, language.as_deref(), provider)
                .await
                .context("Synchronisation aborted")?;
            print_report(&report);
            if report.is_success() {
                tracing::info!(command = "sync", run_id = %report.run_id, "Synchronisation complete");
                Ok(())
            } else {
                let failed = report.entries.iter().filter(|e| !e.is_success()).count();
                tracing::error!(command = "sync", run_id = %report.run_id, failed, "Synchronisation finished with failures");
                anyhow::bail!("{failed} of {} entries failed", report.entries.len())
            }
        }
        Commands::Plan { config, diff } => {
            let config = load_config(config)?;
            let set = read_diff(&config, &diff)?;
            let planned = FileOperationPlanner::new(config.move_similarity_threshold).plan(&set);
            let mut unsupported = 0;
            for entry in &planned {
                match &entry.operations {
                    Ok(operations) => {
                        for operation in operations {
                            println!("{}\t{operation}", entry.entry.status());
                        }
                    }
                    Err(e) => {
                        unsupported += 1;
                        println!("{}\tunsupported: {}", e.status, e.raw);
                    }
                }
            }
            if unsupported > 0 {
                anyhow::bail!("{unsupported} entries have no file operation");
            }
            Ok(())
        }
        Commands::Transform { config, files } => {
            let config = load_config(config)?;
            let transformer = MarkdownTransformer::new(&config.transform)?;
            for file in &files {
                transform_in_place(&transformer, file).await?;
                println!("transformed\t{}", file.display());
            }
            tracing::info!(command = "transform", files = files.len(), "Transform complete");
            Ok(())
        }
    }
}

fn read_diff(config: &SyncConfig, path: &Path) -> Result<DiffSet> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read change-list {}", path.display()))?;
    let set = DiffRecordParser::new(&config.root_prefix)
        .parse(&input)
        .with_context(|| format!("Invalid change-list {}", path.display()))?;
    Ok(set)
}

async fn transform_in_place(transformer: &MarkdownTransformer, path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let output = transformer.transform(&content);
    if output != content {
        write_atomic(path, output.into_bytes()).await?;
    }
    Ok(())
}

fn print_report(report: &SynchroniseReport) {
    for entry in &report.entries {
        for op in &entry.operations {
            let operation = op
                .operation
                .as_ref()
                .map_or_else(|| entry.entry.status(), ToString::to_string);
            match &op.outcome {
                Ok(Applied::Translated(done)) => {
                    println!("ok\t{operation}\t(translated in {} turn(s))", done.turns)
                }
                Ok(_) => println!("ok\t{operation}"),
                Err(e) => println!("failed\t{operation}\t{e}"),
            }
        }
    }
}
