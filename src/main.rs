use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ekiwi::logging::init_logging;
use ekiwi::{AccountService, ApiClient, Config, HourOfPowerService, HourOfPowerTable};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const VERSION: &str = env!("APP_VERSION");

#[derive(Parser)]
#[command(name = "ekiwi")]
#[command(version = VERSION)]
#[command(about = "Electric Kiwi Hour of Power client")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the first of the standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selectable Hour of Power start times
    Slots,

    /// Show the current Hour of Power
    Current,

    /// Move the Hour of Power to start at LABEL (HH:MM)
    Set { label: String },

    /// Average daily Hour of Power saving
    Average {
        /// Number of days before today to average over
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Hour of Power saving recorded on one day
    Usage {
        /// Day in YYYY-MM-DD form
        date: NaiveDate,
    },

    /// Account running balance
    Balance,

    /// Connection details
    Connection,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => Config::load().context("Failed to load configuration")?,
    };
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Logging init failed: {}", e))?;

    // Table listing needs no credentials
    if let Commands::Slots = cli.command {
        for slot in HourOfPowerTable::global().slots() {
            println!("{}  (interval {})", slot.label, slot.interval);
        }
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;
    info!("ekiwi {} starting", VERSION);

    let client = Arc::new(ApiClient::from_config(&config)?);
    let hop = HourOfPowerService::new(client.clone(), config.tz()?);
    let account = AccountService::new(client);

    let outcome = run(cli.command, &config, &hop, &account).await;
    if let Err(e) = &outcome {
        error!("Command failed: {}", e);
    }
    outcome
}

async fn run(
    command: Commands,
    config: &Config,
    hop: &HourOfPowerService,
    account: &AccountService,
) -> Result<()> {
    match command {
        Commands::Slots => {}
        Commands::Current => println!("{}", hop.get_current_window().await?),
        Commands::Set { label } => {
            hop.set_window(&label).await?;
            println!("Hour of Power set to {}", label.trim());
        }
        Commands::Average { days } => {
            let days = days.unwrap_or(config.hop.average_days);
            let average = hop.get_average_utilisation(days).await?;
            println!("{:.2}", average);
        }
        Commands::Usage { date } => println!("{:.2}", hop.get_utilisation_on(date).await?),
        Commands::Balance => {
            println!("{}", serde_json::to_string_pretty(&account.running_balance().await?)?)
        }
        Commands::Connection => println!(
            "{}",
            serde_json::to_string_pretty(&account.connection_details().await?)?
        ),
    }
    Ok(())
}
