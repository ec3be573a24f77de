//! Trading Agent Binary
//!
//! # Usage
//!
//! ```bash
//! trading-agent backtest --config agent_config.yaml
//! trading-agent replay --config agent_config.yaml --input stream.log [--seed state.json]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: `logging.level`, then `agent.log_level`)
//! - any `${VAR}` referenced from the config file; `.env` is loaded first

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use trading_agent::application::services::{DecisionEngine, ExecutionReconciler, TickLoop};
use trading_agent::application::state::StateStore;
use trading_agent::config::{Config, RunMode, load_config, validate_startup};
use trading_agent::domain::order_execution::Order;
use trading_agent::domain::position::Position;
use trading_agent::infrastructure::backtest::{BacktestTradeService, PriceHistoryReader};
use trading_agent::infrastructure::dispatch::{
    Dispatcher, EventKind, ExecutionHandler, Ingestion, PriceHandler, StatusHandler,
};
use trading_agent::infrastructure::events::{InMemoryEventPublisher, LoggingEventHandler};
use trading_agent::infrastructure::persistence::InMemoryRepository;
use trading_agent::infrastructure::signals::FileSignalSource;
use trading_agent::telemetry::init_tracing;

/// Buffered stream messages between the file reader and ingestion.
const REPLAY_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Parser)]
#[command(name = "trading-agent", version, about = "Execution core of the trading agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the decision loop over historical price files.
    Backtest {
        /// Configuration file.
        #[arg(long, default_value = "agent_config.yaml")]
        config: PathBuf,
    },
    /// Feed a recorded event stream (one wire message per line) through ingestion.
    Replay {
        /// Configuration file.
        #[arg(long, default_value = "agent_config.yaml")]
        config: PathBuf,
        /// Recorded stream.
        #[arg(long)]
        input: PathBuf,
        /// JSON file with `orders` and `positions` known before the stream starts.
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

/// Orders and positions preloaded into the in-memory stores for a replay.
#[derive(Debug, Default, Deserialize)]
struct ReplaySeed {
    #[serde(default)]
    orders: Vec<Order>,
    #[serde(default)]
    positions: Vec<Position>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Backtest { config } => {
            let config = load(&config)?;
            init_tracing(&config.logging, config.log_level())?;
            validate_startup(&config, RunMode::Backtest)?;
            run_backtest(&config).await
        }
        Command::Replay {
            config,
            input,
            seed,
        } => {
            let config = load(&config)?;
            init_tracing(&config.logging, config.log_level())?;
            validate_startup(&config, RunMode::Replay)?;
            run_replay(&config, &input, seed.as_deref()).await
        }
    }
}

fn load_dotenv() {
    // Missing .env is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();
}

fn load(path: &Path) -> anyhow::Result<Config> {
    let path_str = path.to_string_lossy();
    load_config(Some(&path_str)).with_context(|| format!("loading {}", path.display()))
}

fn spawn_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
            token.cancel();
        }
    });
}

async fn run_backtest(config: &Config) -> anyhow::Result<()> {
    let swing = &config.strategy_settings.swingtrade;
    let params = swing.to_strategy_params()?;
    let initial_cash = Decimal::try_from(config.backtest.initial_cash)
        .context("backtest.initial_cash is not representable")?;

    let mut simulator = BacktestTradeService::new(initial_cash);
    simulator
        .load_history(
            &PriceHistoryReader::new(&config.backtest.data_dir),
            &params.target_symbols,
        )
        .context("loading price history")?;
    let simulator = Arc::new(simulator);
    let dates = simulator.trading_dates();

    let state = Arc::new(StateStore::new());
    let publisher = Arc::new(InMemoryEventPublisher::new());
    LoggingEventHandler::subscribe_all(publisher.as_ref());
    let signals = Arc::new(FileSignalSource::new(&swing.signal_file_pattern)?);

    let tick_config = config.agent.tick_loop_config();
    let engine = DecisionEngine::new(
        Arc::clone(&simulator),
        signals,
        publisher,
        Arc::clone(&state),
        params,
    )
    .with_call_timeout(tick_config.sync_timeout);
    let tick_loop = TickLoop::new(Arc::clone(&simulator), state, engine, tick_config);

    let shutdown = CancellationToken::new();
    spawn_ctrl_c(shutdown.clone());

    tracing::info!(
        days = dates.len(),
        initial_cash = %initial_cash,
        "Starting backtest"
    );

    for date in dates {
        if shutdown.is_cancelled() {
            tracing::warn!(date = %date, "Backtest interrupted");
            break;
        }
        simulator.set_current_tick(date);
        let report = tick_loop.tick().await;
        if !report.exits.is_empty() || !report.entries.is_empty() {
            tracing::info!(
                date = %date,
                exits = report.exits.len(),
                entries = report.entries.len(),
                "Orders placed"
            );
        }
    }

    let balance = simulator.balance();
    tracing::info!(
        cash = %balance.cash,
        buying_power = %balance.buying_power,
        orders = simulator.order_count(),
        "Backtest finished"
    );
    for position in simulator.positions() {
        tracing::info!(
            symbol = %position.symbol(),
            account_type = %position.account_type(),
            quantity = position.quantity(),
            average_price = %position.average_price(),
            "Final position"
        );
    }
    Ok(())
}

async fn run_replay(config: &Config, input: &Path, seed: Option<&Path>) -> anyhow::Result<()> {
    let seed = match seed {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading seed {}", path.display()))?;
            serde_json::from_str::<ReplaySeed>(&raw)
                .with_context(|| format!("parsing seed {}", path.display()))?
        }
        None => ReplaySeed::default(),
    };

    let repository = Arc::new(InMemoryRepository::new());
    let state = Arc::new(StateStore::new());
    for order in &seed.orders {
        repository.add_order(order.clone());
    }
    for position in &seed.positions {
        repository.add_position(position.clone());
    }
    state.update_orders(seed.orders);
    state.update_positions(seed.positions);

    let publisher = Arc::new(InMemoryEventPublisher::new());
    LoggingEventHandler::subscribe_all(publisher.as_ref());

    let reconciler = Arc::new(ExecutionReconciler::new(
        repository,
        publisher,
        Arc::clone(&state),
    ));
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register(EventKind::Execution, Arc::new(ExecutionHandler::new(reconciler)));
    dispatcher.register(
        EventKind::Feed,
        Arc::new(PriceHandler::new(
            Arc::clone(&state),
            &config.strategy_settings.swingtrade.symbols(),
        )),
    );
    dispatcher.register(EventKind::Status, Arc::new(StatusHandler));

    let shutdown = CancellationToken::new();
    spawn_ctrl_c(shutdown.clone());

    let (tx, rx) = mpsc::channel(REPLAY_CHANNEL_CAPACITY);
    let ingestion = Ingestion::new(dispatcher).spawn(rx, shutdown.clone());

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("opening {}", input.display()))?;
    let mut lines = tokio::io::BufReader::new(file).split(b'\n');
    while let Some(mut line) = lines.next_segment().await? {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if tx.send(line).await.is_err() {
            break;
        }
    }
    drop(tx);

    let stats = ingestion.await.context("ingestion task failed")?;
    tracing::info!(
        received = stats.received,
        dispatched = stats.dispatched,
        ignored = stats.ignored,
        parse_errors = stats.parse_errors,
        handler_errors = stats.handler_errors,
        "Replay finished"
    );
    for shared in state.get_positions() {
        let position = shared.read();
        tracing::info!(
            symbol = %position.symbol(),
            account_type = %position.account_type(),
            quantity = position.quantity(),
            average_price = %position.average_price(),
            "Final position"
        );
    }
    Ok(())
}
