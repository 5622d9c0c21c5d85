//! Football odds arbitrage scanner entry point.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use football_arb::api::{create_router, AppState};
use football_arb::config::Config;
use football_arb::metrics;
use football_arb::pipeline::{scan_with, ScanReport};
use football_arb::provider::{load_batch, OddsApiClient};
use football_arb::scheduler::{Scheduler, SchedulerSettings};
use football_arb::utils::{format_duration, shutdown_signal};

/// Football odds arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "football-arb")]
#[command(about = "Detects football odds arbitrage across bookmakers and sizes the stakes")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port for health/metrics.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the odds provider on an interval and serve results (default).
    Run {
        /// HTTP server port for health/metrics.
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Run a single scan and print the opportunities.
    Scan {
        /// Read provider events from a JSON file instead of the live API.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Base stake per opportunity (overrides BASE_STAKE).
        #[arg(short, long)]
        stake: Option<Decimal>,

        /// Stake multiplier, 1 to 3 (overrides STAKE_MULTIPLIER).
        #[arg(short, long)]
        multiplier: Option<u8>,

        /// Print the full scan report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    init_logging(args.verbose);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Scan {
            file,
            stake,
            multiplier,
            json,
        }) => cmd_scan(file, stake, multiplier, json).await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

fn init_logging(verbose: bool) {
    // Logging comes up before config errors can be reported.
    let (default_level, json) = Config::load()
        .map(|c| (c.rust_log, c.log_json))
        .unwrap_or_else(|_| ("info".to_string(), false));

    let filter = if verbose {
        EnvFilter::new("football_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn load_config() -> anyhow::Result<Config> {
    Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration load failed: {}", e)
    })
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("FOOTBALL ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Checking provider settings... ");
    match config.validate_provider() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            println!("  (offline scans with --file still work)");
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Provider URL: {}", config.odds_api_url);
    println!("  Sport: {}", config.sport);
    println!("  Regions: {}", config.regions);
    println!("  Bookmakers: {}", config.bookmakers.split(',').count());
    println!("  Odds Format: {}", config.odds_format);
    println!(
        "  Total Stake: {} ({} x {})",
        config.total_stake(),
        config.base_stake,
        config.stake_multiplier
    );
    println!("  Stake Precision: {} dp", config.stake_decimals);
    println!("  Poll Interval: {}", format_duration(config.poll_interval_secs));
    println!(
        "  Fetch Retries: {} (backoff {}ms)",
        config.fetch_retries, config.retry_backoff_ms
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run one scan and print it.
async fn cmd_scan(
    file: Option<PathBuf>,
    stake: Option<Decimal>,
    multiplier: Option<u8>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(stake) = stake {
        config.base_stake = stake;
    }
    if let Some(multiplier) = multiplier {
        config.stake_multiplier = multiplier;
    }

    if file.is_some() {
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
    } else {
        config.validate_provider().map_err(|e| anyhow::anyhow!(e))?;
    }
    let batch = load_batch(&config, file.as_deref()).await?;

    let report = scan_with(&batch, config.total_stake(), &config.allocator())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ScanReport) {
    let stats = &report.stats;
    println!("======================================================================");
    println!("FOOTBALL ARB - SCAN RESULTS");
    println!("======================================================================");
    println!(
        "Entries: {} | Accepted: {} | Rejected: {} | Markets: {} | Incomplete: {}",
        stats.entries_received,
        stats.quotes_accepted,
        stats.rejected,
        stats.markets_grouped,
        stats.markets_incomplete
    );
    for (reason, count) in &stats.rejected_by_reason {
        println!("  rejected {}: {}", reason, count);
    }
    println!("----------------------------------------------------------------------");

    if report.opportunities.is_empty() {
        println!("No arbitrage opportunities found.");
    } else {
        println!("Found {} arbitrage opportunities:", report.opportunities.len());
        for opportunity in &report.opportunities {
            println!();
            println!("{}", opportunity);
        }
    }
    println!("======================================================================");
}

/// Run the scheduler with the HTTP server alongside.
async fn cmd_run(port: u16) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config()?;

    if let Err(e) = config.validate_provider() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Sport: {}", config.sport);
    info!("Total stake: {}", config.total_stake());
    info!("Poll interval: {}", format_duration(config.poll_interval_secs));

    // Metrics recorder
    let prometheus = metrics::install_prometheus()?;
    let app_state = AppState::new().with_metrics(prometheus);

    // Shutdown fan-out to the server and the scheduler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let server_shutdown = wait_for_shutdown(shutdown_rx.clone());
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(server_shutdown)
            .await
    });

    // Scheduler
    let client = OddsApiClient::new(&config)?;
    let scheduler = Scheduler::new(client, SchedulerSettings::from_config(&config), app_state);

    info!("Starting odds scanner...");
    scheduler.run(wait_for_shutdown(shutdown_rx)).await;

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
    }

    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // Sender dropped also means shutdown.
    let _ = rx.wait_for(|stop| *stop).await;
}
