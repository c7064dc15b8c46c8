//! episynth - living systematic review pipeline
//!
//! Retrieves PubMed records, classifies abstracts with configurable rule
//! tables, normalizes them into a master dataset, and renders summary
//! statistics, a reference list, and a Markdown manuscript.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing input, network, config, locked output, etc.)
//!   N - A configured render command failed with exit code N

mod analysis;
mod classifier;
mod cli;
mod config;
mod dataset;
mod error;
mod models;
mod pipeline;
mod report;
mod retriever;

use anyhow::{Context, Result};
use classifier::Classifier;
use cli::Args;
use config::{Config, CONFIG_FILE};
use error::PipelineError;
use pipeline::{Pipeline, Stage};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("episynth v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        let code = e
            .downcast_ref::<PipelineError>()
            .map(PipelineError::exit_code)
            .unwrap_or(1);
        error!("Pipeline failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(code);
    }

    Ok(())
}

/// Handle --init-config: generate a default .episynth.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the query, rule tables, fallbacks, and figures.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the selected stages.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let stages = args.stages();

    if args.dry_run {
        return handle_dry_run(&config, &stages);
    }

    if config.search.email.is_empty() && stages.contains(&Stage::Fetch) {
        warn!("No contact email configured; NCBI asks E-utilities clients to send one");
    }

    let pipeline = Pipeline::new(config, !args.quiet);
    let outcomes = pipeline.run(&stages).await?;

    if !args.quiet {
        println!("\n📊 Pipeline Summary:");
        for outcome in &outcomes {
            println!("   {} {}: {} records", outcome.stage.emoji(), outcome.stage, outcome.records);
        }
        println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
        println!("\n✅ Pipeline complete!");
    }

    Ok(())
}

/// Handle --dry-run: show what would run, compile the rules, exit.
fn handle_dry_run(config: &Config, stages: &[Stage]) -> Result<()> {
    println!("\n🔍 Dry run: nothing will be fetched or written.\n");

    let plan: Vec<&str> = stages.iter().map(Stage::as_str).collect();
    println!("   Stages: {}", plan.join(" → "));
    println!("   Query: {}", config.search.query);
    println!(
        "   Date range: {} to {} (max {} records)",
        config.search.date_from, config.search.date_to, config.search.max_results
    );
    println!("   Data dir: {}", config.general.data_dir.display());
    println!("   Output dir: {}", config.general.output_dir.display());

    let classifier = Classifier::new(&config.classifier).context("Invalid classifier rules")?;
    let priority: Vec<String> = classifier
        .exposure_priority()
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("   Exposure priority: {}", priority.join(" > "));

    if config.pipeline.render_commands.is_empty() {
        println!("   Render commands: none");
    } else {
        for command in &config.pipeline.render_commands {
            println!("   Render: {}", command.join(" "));
        }
    }

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
