// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! lensort: Local AI Photo Triage
//!
//! `scan` classifies and geotags a folder of photos into a summary table,
//! `sort` copies them into `output/<category>/<city>/`, resumably.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use lensort::config::AppConfig;
use lensort::extract::{scan, ExtractionContext};
use lensort::journal::{read_lines, CompletionLog, ErrorLog};
use lensort::ollama::OllamaClient;
use lensort::sorter::SortExecutor;
use lensort::summary::SummaryStore;
use lensort::{LensortError, Result};

/// lensort CLI - Local AI Photo Triage
#[derive(Parser, Debug)]
#[command(name = "lensort")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "3.0.0")]
#[command(about = "Classify, geotag and resumably sort a folder of photos", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "lensort.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze every photo in the source folder and rewrite the summary table
    Scan {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Copy photos listed in the summary into the output tree.
    ///
    /// Photos already in the completion log are skipped by filename, even if
    /// their category changed since. Use `log clear` to re-sort everything.
    Sort {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        sort: SortArgs,
    },

    /// Scan, then sort
    Run {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        sort: SortArgs,
    },

    /// Completion and error logs
    Log {
        #[command(subcommand)]
        action: LogCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show vision backend status
    Status,

    /// Initialize a new lensort project
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
struct PathArgs {
    /// Folder of photos (overrides config)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Summary table (overrides config)
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Default)]
struct ScanArgs {
    /// Use the first-generation thresholds (no scene check, no crowd cap);
    /// configured labels and keywords still apply
    #[arg(long)]
    legacy_rules: bool,

    /// Skip the vision backend health check on startup
    #[arg(long)]
    skip_health_check: bool,
}

#[derive(clap::Args, Debug, Default)]
struct SortArgs {
    /// Output tree root (overrides config)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Dry run mode (show destinations without copying)
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum LogCommands {
    /// List recently placed photos
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Show the most recent failures
    Errors {
        /// Number of lines to show per log
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Forget every placement so the next sort copies everything again
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "lensort.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Scan { paths, scan } => run_scan(paths.apply(config), scan).await,
        Commands::Sort { paths, sort } => run_sort(paths.apply(config), sort),
        Commands::Run { paths, scan, sort } => {
            let config = paths.apply(config);
            run_scan(config.clone(), scan).await?;
            run_sort(config, sort)
        }
        Commands::Log { action } => run_log_command(config, action),
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::Status => run_status(config).await,
        Commands::Init { dir, force } => run_init(dir, force),
    }
}

impl PathArgs {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(source) = self.source {
            config.paths.source_dir = source.to_string_lossy().into_owned();
        }
        if let Some(summary) = self.summary {
            config.paths.summary_file = summary.to_string_lossy().into_owned();
        }
        config
    }
}

/// Run the extraction stage
async fn run_scan(config: AppConfig, args: ScanArgs) -> Result<()> {
    config.validate()?;

    let source_dir = PathBuf::from(&config.paths.source_dir);
    if !source_dir.is_dir() {
        return Err(LensortError::MissingInput(source_dir));
    }

    if args.skip_health_check {
        warn!("Skipping vision backend health check");
    } else {
        check_vision_backend(&config).await?;
    }

    let rules = if args.legacy_rules {
        info!("Using the legacy thresholds");
        config.rules.clone().with_legacy_thresholds()
    } else {
        config.rules.clone()
    };
    let ctx = ExtractionContext::from_config(&config, rules)?;
    let store = SummaryStore::new(PathBuf::from(&config.paths.summary_file));
    let errors = ErrorLog::new(PathBuf::from(&config.paths.extraction_error_log));

    let report = scan(&ctx, &source_dir, &store, &errors).await?;
    if report.failed > 0 {
        warn!("{} images failed; see {:?}", report.failed, errors.path());
    }
    Ok(())
}

/// Run the sort executor
fn run_sort(mut config: AppConfig, args: SortArgs) -> Result<()> {
    if let Some(output) = args.output {
        config.paths.output_dir = output.to_string_lossy().into_owned();
    }

    let store = SummaryStore::new(PathBuf::from(&config.paths.summary_file));
    let executor = SortExecutor::new(
        PathBuf::from(&config.paths.source_dir),
        PathBuf::from(&config.paths.output_dir),
        CompletionLog::new(PathBuf::from(&config.paths.completion_log)),
        ErrorLog::new(PathBuf::from(&config.paths.placement_error_log)),
    )
    .with_error_category(config.rules.labels.error.clone())
    .with_dry_run(args.dry_run);

    let report = executor.run_from_summary(&store)?;
    println!(
        "Sorted {} entries: {} copied, {} already done, {} planned, {} left for review, {} failed",
        report.total(),
        report.copied,
        report.skipped,
        report.planned,
        report.parked,
        report.failed
    );
    Ok(())
}

/// Fail fast when the vision backend or model is unreachable, before the
/// summary gets truncated
async fn check_vision_backend(config: &AppConfig) -> Result<()> {
    let client = OllamaClient::new(&config.engine.url, Duration::from_secs(config.engine.timeout_secs))?;

    info!("Checking Ollama availability...");
    client.health_check().await?;

    let model = &config.engine.vision_model;
    if client.model_available(model).await? {
        info!("Vision model '{}' available", model);
    } else {
        warn!("Vision model '{}' not found. Try: ollama pull {}", model, model);
    }
    Ok(())
}

/// Run log commands
fn run_log_command(config: AppConfig, action: LogCommands) -> Result<()> {
    let completion = CompletionLog::new(PathBuf::from(&config.paths.completion_log));

    match action {
        LogCommands::List { count } => {
            let entries = completion.get_recent(count)?;
            println!("Recently placed ({} entries):", entries.len());
            for entry in entries {
                println!("  {} -> {}", entry.filename, entry.destination.display());
            }
        }
        LogCommands::Errors { count } => {
            for path in [&config.paths.extraction_error_log, &config.paths.placement_error_log] {
                let lines = read_lines(Path::new(path))?;
                println!("{} ({} failures):", path, lines.len());
                let skip = lines.len().saturating_sub(count);
                for line in &lines[skip..] {
                    println!("  {}", line);
                }
            }
        }
        LogCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing the completion log");
                return Ok(());
            }
            completion.clear()?;
            println!("Completion log cleared; the next sort copies every photo again");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Source: {}", config.paths.source_dir);
            println!("  Output: {}", config.paths.output_dir);
            println!(
                "  Sessions: {}..={} people",
                config.rules.min_session_people, config.rules.max_session_people
            );
            println!("  Vision model: {}", config.engine.vision_model);
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    let client = OllamaClient::new(&config.engine.url, Duration::from_secs(config.engine.timeout_secs))?;

    println!("lensort v3.0.0 Status");
    println!("=====================");

    match client.health_check().await {
        Ok(()) => println!("Ollama: Running"),
        Err(e) => println!("Ollama: Error - {}", e),
    }

    match client.list_models().await {
        Ok(models) => {
            println!("\nAvailable models:");
            for m in &models {
                let marker = if m.starts_with(config.engine.vision_model.as_str()) { "→" } else { " " };
                println!("  {} {}", marker, m);
            }
        }
        Err(e) => println!("  Error listing models: {}", e),
    }

    let completion = CompletionLog::new(PathBuf::from(&config.paths.completion_log));
    match completion.read_all() {
        Ok(entries) => println!("\nPlaced so far: {}", entries.len()),
        Err(e) => println!("\nCompletion log: Error - {}", e),
    }

    println!("\nConfiguration:");
    println!("  Source: {}", config.paths.source_dir);
    println!("  Output: {}", config.paths.output_dir);
    println!("  Vision model: {}", config.engine.vision_model);
    println!(
        "  Cities table: {}",
        config.geocoder.cities_path.as_deref().unwrap_or("(none)")
    );

    Ok(())
}

/// Initialize a new lensort project
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("lensort.json");

    if config_path.exists() && !force {
        return Err(LensortError::Config(
            "lensort.json already exists. Use --force to overwrite".to_string()
        ));
    }

    let source_dir = target.join("Unsorted_Images");
    std::fs::create_dir_all(&source_dir)?;

    let mut config = AppConfig::default();
    config.paths.source_dir = source_dir.to_string_lossy().into_owned();
    config.paths.output_dir = target.join("Sorted_Images").to_string_lossy().into_owned();
    config.save(&config_path)?;

    println!("lensort initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - lensort.json");
    println!("  - Unsorted_Images/");
    println!("\nNext steps:");
    println!("  1. Copy photos into Unsorted_Images/");
    println!("  2. Optionally set geocoder.cities_path to a cities CSV");
    println!("  3. lensort run");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["lensort"]).is_err());
    }

    #[test]
    fn test_cli_scan_command() {
        let cli = Cli::try_parse_from([
            "lensort", "scan", "--source", "/tmp/photos", "--legacy-rules"
        ]).unwrap();

        match cli.command {
            Commands::Scan { paths, scan } => {
                assert_eq!(paths.source, Some(PathBuf::from("/tmp/photos")));
                assert!(scan.legacy_rules);
                assert!(!scan.skip_health_check);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_sort_command() {
        let cli = Cli::try_parse_from([
            "lensort", "-v", "sort", "--dry-run", "--output", "/tmp/out"
        ]).unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Sort { sort, .. } => {
                assert!(sort.dry_run);
                assert_eq!(sort.output, Some(PathBuf::from("/tmp/out")));
            }
            _ => panic!("Expected Sort command"),
        }
    }

    #[test]
    fn test_cli_run_command_takes_both_arg_groups() {
        let cli = Cli::try_parse_from([
            "lensort", "run", "--summary", "s.csv", "--dry-run", "--skip-health-check"
        ]).unwrap();

        match cli.command {
            Commands::Run { paths, scan, sort } => {
                assert_eq!(paths.summary, Some(PathBuf::from("s.csv")));
                assert!(scan.skip_health_check);
                assert!(sort.dry_run);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_log_clear() {
        let cli = Cli::try_parse_from(["lensort", "log", "clear", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Log { action: LogCommands::Clear { force: true } }
        ));
    }

    #[test]
    fn test_init_creates_config_and_source() {
        let dir = tempfile::tempdir().unwrap();
        run_init(Some(dir.path().to_path_buf()), false).unwrap();
        assert!(dir.path().join("lensort.json").exists());
        assert!(dir.path().join("Unsorted_Images").is_dir());

        assert!(run_init(Some(dir.path().to_path_buf()), false).is_err());
        assert!(run_init(Some(dir.path().to_path_buf()), true).is_ok());
    }
}
