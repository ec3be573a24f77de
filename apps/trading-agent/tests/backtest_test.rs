//! Backtest Integration Tests
//!
//! History files and a signal file on disk drive the tick loop through the simulated
//! trade service, the way `trading-agent backtest` does.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use rust_decimal_macros::dec;
use tempfile::TempDir;

use trading_agent::application::ports::NoOpEventPublisher;
use trading_agent::application::services::{DecisionEngine, StrategyParams, TickLoop, TickLoopConfig};
use trading_agent::application::state::StateStore;
use trading_agent::domain::market::SignalAction;
use trading_agent::domain::order_execution::TradeType;
use trading_agent::domain::shared::Symbol;
use trading_agent::infrastructure::backtest::{BacktestTradeService, PriceHistoryReader};
use trading_agent::infrastructure::signals::FileSignalSource;

type Loop = TickLoop<BacktestTradeService, FileSignalSource, NoOpEventPublisher>;

fn write_history(dir: &Path, symbol: &str, closes: &[(&str, u32)]) {
    let mut body = String::from("Date,Open,High,Low,Close,Volume\n");
    for (date, close) in closes {
        body.push_str(&format!(
            "{date},{close},{},{},{close},10000\n",
            close + 10,
            close - 10
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), body).unwrap();
}

fn write_signal(dir: &Path, symbol: u16, action: SignalAction) {
    let mut record = symbol.to_le_bytes().to_vec();
    record.push(action.as_byte());
    std::fs::write(dir.join("signals_20240101.bin"), record).unwrap();
}

fn build(dir: &TempDir) -> (Arc<BacktestTradeService>, Loop) {
    let params = StrategyParams {
        target_symbols: vec![Symbol::new("7203")],
        ..StrategyParams::default()
    };

    let mut simulator = BacktestTradeService::new(dec!(10_000_000));
    simulator
        .load_history(&PriceHistoryReader::new(dir.path()), &params.target_symbols)
        .unwrap();
    let simulator = Arc::new(simulator);

    let pattern = dir.path().join("signals_*.bin");
    let signals = Arc::new(FileSignalSource::new(&pattern.to_string_lossy()).unwrap());
    let state = Arc::new(StateStore::new());
    let engine = DecisionEngine::new(
        Arc::clone(&simulator),
        signals,
        Arc::new(NoOpEventPublisher),
        Arc::clone(&state),
        params,
    );
    let tick_loop = TickLoop::new(
        Arc::clone(&simulator),
        state,
        engine,
        TickLoopConfig::default(),
    );
    (simulator, tick_loop)
}

async fn run_all(simulator: &BacktestTradeService, tick_loop: &Loop) -> Vec<(usize, usize)> {
    let mut counts = Vec::new();
    for date in simulator.trading_dates() {
        simulator.set_current_tick(date);
        let report = tick_loop.tick().await;
        counts.push((report.exits.len(), report.entries.len()));
    }
    counts
}

#[tokio::test]
async fn buy_signal_then_profit_take() {
    let dir = TempDir::new().unwrap();
    write_history(
        dir.path(),
        "7203",
        &[("2024-01-04", 1000), ("2024-01-05", 1000), ("2024-01-09", 1100)],
    );
    write_signal(dir.path(), 7203, SignalAction::Buy);

    let (simulator, tick_loop) = build(&dir);
    let counts = run_all(&simulator, &tick_loop).await;

    // Day 1 buys with basic sizing (no ATR yet): 10,000,000 * 0.02 / 1000 = 200.
    // Day 2 holds. Day 3 reaches the 10% profit target and sells everything.
    assert_eq!(counts, vec![(0, 1), (0, 0), (1, 0)]);
    assert_eq!(simulator.order_count(), 2);
    assert!(simulator.positions().is_empty());
    assert_eq!(simulator.balance().cash, dec!(10_020_000));
    assert_eq!(simulator.balance().buying_power, dec!(10_020_000));
}

#[tokio::test]
async fn position_is_carried_between_ticks() {
    let dir = TempDir::new().unwrap();
    write_history(
        dir.path(),
        "7203",
        &[("2024-01-04", 1000), ("2024-01-05", 1020), ("2024-01-09", 1030)],
    );
    write_signal(dir.path(), 7203, SignalAction::Buy);

    let (simulator, tick_loop) = build(&dir);
    run_all(&simulator, &tick_loop).await;

    let positions = simulator.positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity(), 200);
    assert_eq!(positions[0].average_price(), dec!(1000));
    assert_eq!(simulator.balance().cash, dec!(9_800_000));

    let state = tick_loop.state();
    assert_eq!(state.get_price(&Symbol::new("7203")), Some(dec!(1030)));
    assert!(state.has_position(&Symbol::new("7203")));
    assert!(!state.has_unexecuted_order(&Symbol::new("7203"), Some(TradeType::Buy)));
}

#[tokio::test]
async fn trailing_stop_survives_resync_and_fires() {
    let dir = TempDir::new().unwrap();
    write_history(
        dir.path(),
        "7203",
        &[("2024-01-04", 1000), ("2024-01-05", 1080), ("2024-01-09", 1040)],
    );
    write_signal(dir.path(), 7203, SignalAction::Buy);

    let (simulator, tick_loop) = build(&dir);
    let dates = simulator.trading_dates();

    simulator.set_current_tick(dates[0]);
    assert_eq!(tick_loop.tick().await.entries.len(), 1);

    // 1080 clears the 5% trigger over 1000; stop = 1080 * 0.97.
    simulator.set_current_tick(dates[1]);
    assert!(tick_loop.tick().await.exits.is_empty());
    let held = &simulator.positions()[0];
    assert_eq!(held.highest_price(), dec!(1080));
    assert_eq!(held.trailing_stop_price(), dec!(1047.6));

    // The next resync installs the simulator's snapshot; 1040 is under the stop.
    simulator.set_current_tick(dates[2]);
    let report = tick_loop.tick().await;
    assert_eq!(report.exits.len(), 1);
    assert_eq!(report.exits[0].trade_type(), TradeType::Sell);
    assert_eq!(report.exits[0].quantity(), 200);

    assert!(simulator.positions().is_empty());
    assert_eq!(simulator.balance().cash, dec!(10_008_000));
}

#[tokio::test]
async fn sell_signal_without_position_places_nothing() {
    let dir = TempDir::new().unwrap();
    write_history(dir.path(), "7203", &[("2024-01-04", 1000), ("2024-01-05", 990)]);
    write_signal(dir.path(), 7203, SignalAction::Sell);

    let (simulator, tick_loop) = build(&dir);
    let counts = run_all(&simulator, &tick_loop).await;

    assert_eq!(counts, vec![(0, 0), (0, 0)]);
    assert_eq!(simulator.order_count(), 0);
    assert_eq!(simulator.balance().cash, dec!(10_000_000));
}

#[tokio::test]
async fn non_target_signal_is_ignored() {
    let dir = TempDir::new().unwrap();
    write_history(dir.path(), "7203", &[("2024-01-04", 1000)]);
    write_signal(dir.path(), 6758, SignalAction::Buy);

    let (simulator, tick_loop) = build(&dir);
    run_all(&simulator, &tick_loop).await;

    assert_eq!(simulator.order_count(), 0);
}
