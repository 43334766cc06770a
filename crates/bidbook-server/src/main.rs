// Bidbook entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Load config (copying defaults on first run)
// 3. Initialize tracing (log to file)
// 4. Open the ledger
// 5. Run the chosen command: serve, export, migrate or reset

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bidbook_core::Ledger;
use bidbook_server::api::{self, ApiState};
use bidbook_server::assets::AssetStore;
use bidbook_server::config::{self, Config};
use bidbook_server::export;
use clap::{Parser, Subcommand};
use tracing::info;

/// Auction ledger server for franchise player auctions.
#[derive(Parser)]
#[command(name = "bidbook")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding `config/` (and `defaults/` on first run)
    #[arg(long, global = true, env = "BIDBOOK_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed an empty ledger and serve the HTTP API
    Serve,

    /// Write every table into one workbook, one worksheet per table
    Export {
        /// Output workbook
        #[arg(short, long, default_value = "auction_export.xlsx")]
        out: PathBuf,
    },

    /// Rescale all budgets and prices onto the canonical currency scale
    Migrate {
        /// Canonical team budget (defaults to the configured value)
        #[arg(long)]
        budget: Option<i64>,

        /// Canonical player base price (defaults to the configured value)
        #[arg(long)]
        base_price: Option<i64>,
    },

    /// Return every player to the block and refill every purse
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config_dir).with_context(|| {
        format!("failed to load configuration from {}", cli.config_dir.display())
    })?;

    let log_dir = log_dir(&config);
    init_tracing(&log_dir)?;
    info!(log_dir = %log_dir.display(), "Bidbook starting up");

    let ledger = Ledger::open(&config.database.path)
        .with_context(|| format!("failed to open ledger at {}", config.database.path))?;
    info!("Ledger opened at {}", config.database.path);

    match cli.command {
        Commands::Serve => serve(config, ledger).await,
        Commands::Export { out } => {
            let sheets = export::export_ledger(&ledger, &out)
                .with_context(|| format!("failed to export to {}", out.display()))?;
            for sheet in &sheets {
                println!("{:<20} {:>6} rows", sheet.sheet, sheet.rows);
            }
            println!("Export complete: {}", out.display());
            Ok(())
        }
        Commands::Migrate { budget, base_price } => {
            let budget = budget.unwrap_or(config.migration.canonical_budget);
            let base_price = base_price.unwrap_or(config.migration.canonical_base_price);
            let report = ledger
                .migrate_to_canonical_scale(budget, base_price)
                .context("currency migration failed")?;
            for team in &report.teams {
                println!(
                    "{:<28} scale {:>10.6}  {:>12} -> {:>8} remaining",
                    team.name, team.scale, team.old_current, team.new_current
                );
            }
            println!(
                "Migrated {} teams; {} base prices and {} sale prices rewritten",
                report.teams.len(),
                report.players_repriced,
                report.players_rescaled
            );
            Ok(())
        }
        Commands::Reset => {
            let summary = ledger.reset_all().context("reset failed")?;
            println!(
                "Reset {} players and {} teams; cleared {} bids",
                summary.players_reset, summary.teams_reset, summary.bids_cleared
            );
            Ok(())
        }
    }
}

async fn serve(config: Config, ledger: Ledger) -> anyhow::Result<()> {
    let seeded = ledger
        .seed_if_empty(&config.seed.new_teams(), &config.seed.new_players())
        .context("failed to seed ledger")?;
    if seeded {
        info!("Empty ledger seeded from config");
    }

    let state = Arc::new(ApiState {
        ledger: Arc::new(ledger),
        assets: AssetStore::new(&config.assets.dir),
        migration: config.migration,
    });
    api::serve(state, &config.server.host, config.server.port).await
}

/// The configured log directory, else the platform data dir, else `./logs`.
fn log_dir(config: &Config) -> PathBuf {
    if let Some(dir) = &config.logging.dir {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("", "", "bidbook")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize tracing to log to a file so command output stays clean.
fn init_tracing(log_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("bidbook.log"))
        .context("failed to open log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("bidbook_server=info,bidbook_core=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
