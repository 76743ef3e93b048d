//! Fanout - concurrent service aggregation from the command line.
//!
//! Calls a set of mock services in parallel and prints how their answers
//! combine under the selected failure policy.
//!
//! Exit codes:
//!   0 - Aggregate succeeded
//!   1 - Runtime error (bad arguments, config, output)
//!   2 - Aggregate failed or timed out

use anyhow::{Context, Result};
use chrono::Utc;
use fanout_aggregator::aggregator::{self, Batch};
use fanout_aggregator::cli::{Args, OutputFormat};
use fanout_aggregator::config::{Config, CONFIG_FILE};
use fanout_aggregator::models::{PolicyKind, RunMetadata, RunOutcome, RunReport};
use fanout_aggregator::{report, service, SharedService};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read first so its `verbose` setting can pick the log level
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("Fanout v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", config_source);
    if let Some(ref failing) = args.fail {
        for id in config.unknown_services(failing) {
            warn!("--fail names '{}', which is not a configured service", id);
        }
    }
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fanout.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change the policy, fallback, and services.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` directives override `level`.
fn init_logging(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(level == Level::DEBUG)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one aggregation. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let services: Vec<SharedService> = config.services.iter().map(service::from_config).collect();
    let batch = if args.message.len() == 1 {
        Batch::broadcast(&services, &args.message[0])
    } else {
        Batch::paired(&services, &args.message).context("Cannot build task batch")?
    };

    let policy = config.general.policy;
    let deadline = Duration::from_secs(config.general.timeout_seconds);
    let service_ids = batch.service_ids();
    info!(
        "Running {} over {} services (deadline {:?})",
        policy,
        batch.len(),
        deadline
    );

    let spinner = create_spinner(args.quiet);
    spinner.set_message(format!("Waiting on {} services...", batch.len()));

    let started_at = Utc::now();
    let start = Instant::now();
    let strategy = policy.into_strategy(&config.general.fallback);
    let settled = aggregator::run(strategy, batch)?
        .wait_timeout(deadline)
        .await;
    let duration_ms = start.elapsed().as_millis() as u64;
    spinner.finish_and_clear();

    let outcome = match settled {
        Ok(result) => {
            info!("Aggregate settled with {} values", result.tokens().len());
            RunOutcome::Succeeded { result }
        }
        Err(e) => {
            warn!("Aggregate failed: {}", e);
            RunOutcome::Failed {
                error: e.to_string(),
            }
        }
    };
    let exit_code = if outcome.is_success() { 0 } else { 2 };

    let report = RunReport {
        metadata: RunMetadata {
            policy,
            started_at,
            duration_ms,
            services: service_ids,
            messages: args.message.clone(),
            fallback: (policy == PolicyKind::FailSoft).then(|| config.general.fallback.clone()),
        },
        outcome,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => println!("{}", output),
    }

    Ok(exit_code)
}

/// Spinner shown while the aggregate is in flight.
fn create_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so it returns a description of where the
/// config came from for the caller to log.
fn load_config(args: &Args) -> Result<(Config, String)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("Loaded config from: {}", config_path.display())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, format!("Loaded default config from {}", CONFIG_FILE))),
        Ok(None) => Ok((
            Config::default(),
            "No config file found, using defaults".to_string(),
        )),
        Err(e) => Ok((
            Config::default(),
            format!("Failed to load config, using defaults: {:#}", e),
        )),
    }
}
