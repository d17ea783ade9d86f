//! CLI entry point for the clustered retrieval index.
//!
//! Provides commands for certifying, inspecting and querying an index build.

use anyhow::Context;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use semdex::display::{self, THEME};
use semdex::index::validator::summarize_errors;
use semdex::io::{ExitCode, parse_vector};
use semdex::{
    ClusteredSearchEngine, IndexLoader, IndexValidator, LoadOutcome, SearchParams, Settings,
    logging, open_source,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

fn quick_start() -> String {
    let mut help = String::new();
    help.push_str(&format!("{}\n", THEME.heading("Quick Start:")));
    help.push_str("  $ semdex init                               # Create .semdex/settings.toml\n");
    help.push_str("  $ semdex validate idx/manifest.json         # Certify an index build\n");
    help.push_str("  $ semdex info idx/manifest.json             # Per-cluster load summary\n");
    help.push_str("  $ semdex search --vector \"0.6,0.8\" --json   # Query with an embedding\n");
    help
}

/// Clustered semantic retrieval index
#[derive(Parser)]
#[command(
    name = "semdex",
    version = env!("CARGO_PKG_VERSION"),
    about = "Clustered semantic retrieval index",
    long_about = "Load, certify and search IVF-partitioned embedding snapshots.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = quick_start()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .semdex directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .semdex/settings.toml")]
    Config,

    /// Certify an index build
    #[command(
        about = "Check every artifact of an index build and report all defects",
        after_help = "Exit status is 0 when the index passes and 7 when it does not."
    )]
    Validate {
        /// Manifest path or URL (defaults to index.manifest)
        manifest: Option<String>,

        /// Output the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load an index and summarize it
    #[command(about = "Load an index and show per-cluster status")]
    Info {
        /// Manifest path or URL (defaults to index.manifest)
        manifest: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search with a precomputed query embedding
    #[command(
        about = "Run a top-N similarity search",
        after_help = "Examples:\n  semdex search --vector \"0.6,0.8\"\n  semdex search idx/manifest.json --vector \"[0.6, 0.8]\" --top-m 4 --json"
    )]
    Search {
        /// Manifest path or URL (defaults to index.manifest)
        manifest: Option<String>,

        /// Unit-length query vector, comma separated or a JSON array
        #[arg(long, allow_hyphen_values = true)]
        vector: String,

        /// Clusters scanned (overrides search.top_m_clusters)
        #[arg(long)]
        top_m: Option<usize>,

        /// Members kept per cluster (overrides search.top_k_per_cluster)
        #[arg(long)]
        top_k: Option<usize>,

        /// Results returned (overrides search.final_top_n)
        #[arg(long)]
        top_n: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct ClusterInfo {
    cluster_id: u32,
    declared: usize,
    loaded: Option<usize>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct IndexInfo {
    model_id: String,
    dimensions: usize,
    k: usize,
    cluster_algorithm: String,
    documents_declared: usize,
    documents_loaded: usize,
    degraded: bool,
    clusters: Vec<ClusterInfo>,
}

impl IndexInfo {
    fn from_outcome(outcome: &LoadOutcome) -> Self {
        let clusters = outcome
            .manifest
            .clusters
            .iter()
            .map(|entry| ClusterInfo {
                cluster_id: entry.cluster_id.get(),
                declared: entry.count,
                loaded: outcome.index.cluster(entry.cluster_id).map(|c| c.count()),
                error: outcome
                    .cluster_errors
                    .iter()
                    .find(|f| f.cluster_id == entry.cluster_id)
                    .map(|f| f.error.to_string()),
            })
            .collect();

        Self {
            model_id: outcome.manifest.model_id.clone(),
            dimensions: outcome.manifest.dimensions,
            k: outcome.manifest.k,
            cluster_algorithm: outcome.manifest.cluster_algorithm_tag.clone(),
            documents_declared: outcome.manifest.document_count(),
            documents_loaded: outcome.index.document_count(),
            degraded: outcome.is_degraded(),
            clusters,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(ExitCode::ConfigError.into());
        })
    } else {
        Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        })
    };

    logging::init(&config.logging);

    let code = match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", THEME.error_with_icon(&format!("{e:#}")));
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.into());
}

async fn run(command: Commands, config: &Settings) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("Failed to create configuration file")?;
            println!("Created configuration file at: {}", path.display());
            println!("Edit this file to customize your settings.");
            Ok(ExitCode::Success)
        }

        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(config)?);
            Ok(ExitCode::Success)
        }

        Commands::Validate { manifest, json } => {
            let manifest = manifest.unwrap_or_else(|| config.index.manifest.clone());
            run_validate(&manifest, json, config).await
        }

        Commands::Info { manifest, json } => {
            let manifest = manifest.unwrap_or_else(|| config.index.manifest.clone());
            let outcome = match load(&manifest, config).await {
                Ok(outcome) => outcome,
                Err(code) => return Ok(code),
            };

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&IndexInfo::from_outcome(&outcome))?
                );
            } else {
                print_info(&outcome);
            }
            Ok(ExitCode::Success)
        }

        Commands::Search {
            manifest,
            vector,
            top_m,
            top_k,
            top_n,
            json,
        } => {
            let query = match parse_vector(&vector) {
                Ok(query) => query,
                Err(e) => {
                    eprintln!("{}", THEME.error_with_icon(&e.to_string()));
                    return Ok(ExitCode::InvalidInput);
                }
            };
            let params = match SearchParams::new(
                top_m.unwrap_or(config.search.top_m_clusters),
                top_k.unwrap_or(config.search.top_k_per_cluster),
                top_n.unwrap_or(config.search.final_top_n),
            ) {
                Ok(params) => params,
                Err(e) => {
                    eprintln!("{}", THEME.error_with_icon(&e.to_string()));
                    return Ok(ExitCode::from_search_error(&e));
                }
            };

            let manifest = manifest.unwrap_or_else(|| config.index.manifest.clone());
            let outcome = match load(&manifest, config).await {
                Ok(outcome) => outcome,
                Err(code) => return Ok(code),
            };
            if outcome.is_degraded() {
                eprintln!(
                    "{}",
                    THEME.warning_with_icon(&format!(
                        "{} clusters failed to load; results may be incomplete",
                        outcome.cluster_errors.len()
                    ))
                );
            }

            let engine = ClusteredSearchEngine::new(Arc::new(outcome.index));
            let results = match engine.search(&query, &params) {
                Ok(results) => results,
                Err(e) => {
                    eprintln!("{}", THEME.error_with_icon(&e.to_string()));
                    return Ok(ExitCode::from_search_error(&e));
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                println!("{}", display::create_results_table(&results));
            }
            Ok(ExitCode::from_result_count(results.len()))
        }
    }
}

/// Loads the index, cancelling on Ctrl-C. Errors are reported here.
async fn load(manifest: &str, config: &Settings) -> Result<LoadOutcome, ExitCode> {
    let ct = CancellationToken::new();
    let guard = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });

    let loader = IndexLoader::from_config(open_source(&config.fetch), &config.fetch);
    let start = Instant::now();
    let result = loader.load_with_cancellation(manifest, ct).await;

    match result {
        Ok(outcome) => {
            tracing::debug!("Index loaded in {:?}", start.elapsed());
            Ok(outcome)
        }
        Err(e) => {
            eprintln!("{}", THEME.error_with_icon(&e.to_string()));
            Err(ExitCode::from_load_error(&e))
        }
    }
}

async fn run_validate(manifest: &str, json: bool, config: &Settings) -> anyhow::Result<ExitCode> {
    let validator = IndexValidator::new(open_source(&config.fetch));
    let report = validator.validate(manifest).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let stats = &report.stats;
        println!(
            "Checked {} clusters, {} centroids, {} vectors, {} documents",
            stats.clusters_checked,
            stats.centroids_checked,
            stats.vectors_checked,
            stats.documents_checked
        );
        if report.passed {
            println!("{}", THEME.success_with_icon("Index passed validation"));
        } else {
            for error in &report.errors {
                println!("  {error}");
            }
            let mut summary: Vec<_> = summarize_errors(&report.errors).into_iter().collect();
            summary.sort();
            println!();
            for (group, count) in summary {
                println!("  {group}: {count}");
            }
            println!(
                "{}",
                THEME.error_with_icon(&format!(
                    "Index failed validation with {} errors",
                    report.errors.len()
                ))
            );
        }
    }

    Ok(if report.passed {
        ExitCode::Success
    } else {
        ExitCode::IndexCorrupted
    })
}

fn print_info(outcome: &LoadOutcome) {
    let manifest = &outcome.manifest;
    println!("{}", THEME.heading("Index"));
    println!("  Model:      {}", manifest.model_id);
    println!("  Dimensions: {}", manifest.dimensions);
    println!("  Clusters:   {} ({})", manifest.k, manifest.cluster_algorithm_tag);
    println!(
        "  Documents:  {} loaded of {} declared",
        outcome.index.document_count(),
        manifest.document_count()
    );
    println!();
    println!("{}", display::create_cluster_table(outcome));

    if outcome.is_degraded() {
        println!();
        println!(
            "{}",
            THEME.warning_with_icon(&format!(
                "{} clusters dropped",
                outcome.cluster_errors.len()
            ))
        );
        println!("{}", display::create_failure_table(&outcome.cluster_errors));
    } else {
        println!("{}", THEME.success_with_icon("All clusters loaded"));
    }
}
