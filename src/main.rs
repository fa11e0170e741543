use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use pulse_rounds::{
    client::coingecko::CoinGeckoClient,
    monitoring,
    runtime::{
        self,
        console::{parse_command, ConsoleCommand, HELP},
        GameHandle,
    },
    simulation,
    types::{AppConfig, FeedMode},
};

#[derive(Parser, Debug)]
#[command(name = "pulse-rounds")]
#[command(about = "Short-horizon UP/DOWN price prediction rounds with pari-mutuel payouts", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Override the price feed mode (live/synthetic)
    #[arg(long)]
    feed: Option<FeedMode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the live game with a stdin console
    Run {},
    /// Replay a deterministic, seeded simulation
    Simulate {
        /// Optional path to simulation configuration
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "pulse_rounds=debug,game=debug,info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(target: "game", "pulse-rounds starting");

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run {}) {
        Commands::Run {} => {
            tracing::debug!(target: "game", config = %cli.config, "loading config");
            let mut settings = AppConfig::from_file(&cli.config)?;
            if let Some(feed) = cli.feed {
                settings.feed.mode = feed;
            }
            tracing::info!(
                target: "game",
                config = %cli.config,
                assets = settings.assets.len(),
                feed_base_url = %settings.feed.base_url,
                "config loaded"
            );
            monitoring::logger::log_startup(&settings);
            run_live(settings).await?;
        }
        Commands::Simulate { config } => {
            let path = config.unwrap_or_else(|| "config/simulation.toml".to_string());
            let sim_cfg = simulation::SimulationConfig::from_file(&path)?;
            simulation::runner::run_simulation_report(&sim_cfg)?;
        }
    }

    Ok(())
}

async fn run_live(settings: AppConfig) -> anyhow::Result<()> {
    let (monitor_tx, monitor_rx) = oneshot::channel();
    let monitor = tokio::spawn(monitoring::dashboard::run_monitoring(
        settings.monitoring.clone(),
        monitor_rx,
    ));

    let source = Arc::new(CoinGeckoClient::new(&settings.feed)?);
    let (handle, game_task) = runtime::spawn_game(settings, source)?;

    tracing::info!(target: "game", "{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => dispatch(&handle, command).await,
            Err(err) => tracing::warn!(target: "game", input = %line, error = %err, "unrecognised command"),
        }
    }

    drop(handle);
    game_task.await??;
    let _ = monitor_tx.send(());
    monitor.await??;
    Ok(())
}

async fn dispatch(handle: &GameHandle, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Bet { side, amount } => match handle.place_bet(side, amount).await {
            Ok(bet) => tracing::info!(
                target: "game",
                round_id = bet.round_id,
                side = side.as_str(),
                stake = bet.amount,
                "stake accepted"
            ),
            Err(err) => tracing::warn!(target: "game", error = %err, "stake rejected"),
        },
        ConsoleCommand::Claim(round_id) => match handle.claim(round_id).await {
            Ok(receipt) => tracing::info!(
                target: "game",
                round_id,
                amount = receipt.amount,
                fee = receipt.fee,
                "claimed"
            ),
            Err(err) => tracing::warn!(target: "game", error = %err, "claim rejected"),
        },
        ConsoleCommand::Asset(symbol) => {
            if let Err(err) = handle.select_asset(&symbol).await {
                tracing::warn!(target: "game", error = %err, "asset not switched");
            }
        }
        ConsoleCommand::Duration(secs) => {
            if let Err(err) = handle.select_duration(secs).await {
                tracing::warn!(target: "game", error = %err, "duration not changed");
            }
        }
        ConsoleCommand::Analyze => {
            let analysis = handle.analyze().await;
            let payload = serde_json::to_string(&analysis).unwrap_or_default();
            tracing::info!(target: "game", analysis = payload.as_str());
        }
        ConsoleCommand::State => {
            let payload = serde_json::to_string(&handle.snapshot()).unwrap_or_default();
            tracing::info!(target: "game", state = payload.as_str());
        }
        ConsoleCommand::Help => tracing::info!(target: "game", "{HELP}"),
        ConsoleCommand::Quit => {}
    }
}
