//! Contributors Updater CLI
//!
//! Periodically refreshes the contributors snapshot.

mod env_loader;

use anyhow::Context;
use clap::{Parser, Subcommand};
use contributors_updater::{
    config::{Config, Credential},
    fetch::HttpTransport,
    scheduler::Scheduler,
    snapshot::SnapshotWriter,
    stats::{create_shared_log_with_persistence, CycleLog},
    SystemClock, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contributors-updater")]
#[command(version = VERSION)]
#[command(about = "Periodically publishes a contributor leaderboard snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the snapshot every interval until interrupted (default)
    Run,

    /// Run a single cycle and exit
    Once,

    /// Show cycle statistics and the current snapshot
    Status,

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() {
    env_loader::load_dotenv();
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(false).await,
        Commands::Once => cmd_run(true).await,
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn cmd_run(once: bool) -> anyhow::Result<()> {
    // No cycle may start without the credential.
    let credential = match Credential::from_env() {
        Ok(credential) => credential,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let config = Config::load().context("loading configuration")?;
    let transport =
        HttpTransport::new(config.request_timeout).context("building HTTP client")?;
    let log = create_shared_log_with_persistence(config.stats_path());
    let scheduler = Scheduler::new(&config, &credential, transport, SystemClock)
        .context("invalid configuration")?
        .with_log(log.clone());

    tracing::info!(
        "Contributors Updater v{VERSION}: {} pages x {}, interval {}s, snapshot {}",
        config.pages,
        config.per_page,
        config.cycle_interval.as_secs(),
        config.snapshot_path.display()
    );

    if once {
        let outcome = scheduler.run_cycle().await;
        match &outcome {
            Ok(report) => log.record_completed(report),
            Err(_) => log.record_failed(),
        }
        if let Err(e) = log.save() {
            tracing::warn!("Could not save cycle stats: {}", e);
        }
        let report = outcome.context("cycle failed")?;
        println!(
            "Wrote {} accounts ({} degraded) to {}",
            report.accounts,
            report.accounts_degraded,
            report.snapshot_path.display()
        );
        return Ok(());
    }

    tokio::select! {
        _ = scheduler.run_forever() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl+C")?;
            tracing::info!("Interrupted, stopping");
        }
    }

    println!();
    println!("{}", log.summary());
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Contributors Updater Status");
    println!("===========================");
    println!();

    let log = CycleLog::with_persistence(config.stats_path());
    println!("{}", log.summary());
    println!();

    let writer = SnapshotWriter::new(&config.snapshot_path, &config.backup_path);
    match writer.read_current()? {
        Some(entries) => {
            let zero = entries
                .iter()
                .filter(|e| e.total_contributions == 0)
                .count();
            println!(
                "Snapshot {}: {} accounts ({} with zero lifetime contributions)",
                writer.primary().display(),
                entries.len(),
                zero
            );
        }
        None => println!("No snapshot at {}", writer.primary().display()),
    }
    if writer.backup().exists() {
        println!("Backup: {}", writer.backup().display());
    }

    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
