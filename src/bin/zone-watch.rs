//! Runs the zone tracker against the configured analysis source and logs
//! what it does. Commands on stdin: `enable`, `disable`,
//! `switch <SYMBOL> <TIMEFRAME>`, `quit`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use structure_engine::binance::BinanceRestClient;
use structure_engine::cache::MemoryResultCache;
use structure_engine::config::Config;
use structure_engine::engine::MarketStructureEngine;
use structure_engine::logging::init_tracing;
use structure_engine::model::{normalize_symbol, Timeframe};
use structure_engine::service::AnalysisService;
use structure_engine::signals::SignalsClient;
use structure_engine::source::AnalysisSource;
use structure_engine::tracker::{
    run_tracker, PriceQuote, TrackerCommand, TrackerEvent, TrackerSettings,
};

const PRICE_POLL: Duration = Duration::from_secs(5);

fn parse_command(line: &str) -> Result<Option<TrackerCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let cmd = match verb.to_ascii_lowercase().as_str() {
        "enable" => TrackerCommand::Enable,
        "disable" => TrackerCommand::Disable,
        "quit" | "exit" => TrackerCommand::Shutdown,
        "switch" => {
            let symbol = parts
                .next()
                .and_then(normalize_symbol)
                .ok_or("usage: switch <SYMBOL> <TIMEFRAME>")?;
            let timeframe = parts
                .next()
                .and_then(Timeframe::parse)
                .ok_or("usage: switch <SYMBOL> <TIMEFRAME>")?;
            TrackerCommand::SwitchMarket { symbol, timeframe }
        }
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(Some(cmd))
}

/// Keep `price_tx` at the latest close of the watched symbol. Each quote
/// carries its symbol, so the tracker ignores one that lands after a switch.
async fn poll_prices(
    client: Arc<BinanceRestClient>,
    mut symbol_rx: watch::Receiver<String>,
    price_tx: watch::Sender<PriceQuote>,
) {
    let mut ticker = tokio::time::interval(PRICE_POLL);
    loop {
        tokio::select! {
            changed = symbol_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let symbol = symbol_rx.borrow_and_update().clone();
                let _ = price_tx.send(PriceQuote::new(symbol, 0.0));
                ticker.reset_immediately();
            }
            _ = ticker.tick() => {
                let symbol = symbol_rx.borrow().clone();
                match client.get_klines(&symbol, Timeframe::M1, 1).await {
                    Ok(candles) => {
                        if *symbol_rx.borrow() != symbol {
                            tracing::debug!(symbol = %symbol, "Dropping price of previous symbol");
                            continue;
                        }
                        if let Some(last) = candles.last() {
                            let _ = price_tx.send(PriceQuote::new(symbol, last.close));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(symbol = %symbol, error = %e, "Price poll failed");
                    }
                }
            }
        }
    }
}

fn log_event(event: &TrackerEvent) {
    match event {
        TrackerEvent::Updated {
            symbol,
            timeframe,
            view,
            removed,
            added,
            ..
        } => {
            tracing::info!(
                symbol = %symbol,
                timeframe = %timeframe,
                zones = view.zones.len(),
                removed,
                added,
                structure = ?view.structure,
                regime = ?view.regime,
                confidence = ?view.confidence,
                "Zones updated"
            );
            for zone in &view.zones {
                tracing::info!(
                    side = %zone.side,
                    entry = zone.entry_price,
                    target = zone.profit_target,
                    stop = zone.stop_loss,
                    confidence = zone.confidence,
                    "Locked zone"
                );
            }
        }
        TrackerEvent::StructureChanged {
            symbol, from, to, ..
        } => {
            tracing::info!(symbol = %symbol, from = %from, to = %to, "Structure changed");
        }
        TrackerEvent::FetchFailed { symbol, error, .. } => {
            tracing::warn!(symbol = %symbol, error = %error, "Analysis unavailable");
        }
        TrackerEvent::Cleared {
            symbol, timeframe, ..
        } => {
            tracing::info!(symbol = %symbol, timeframe = %timeframe, "Zones cleared");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);

    let (symbol, timeframe) = config.tracker.market()?;
    let binance = Arc::new(BinanceRestClient::new(
        &config.binance.rest_base_url,
        config.binance.request_timeout(),
    )?);

    let source: Arc<dyn AnalysisSource> = match config.tracker.signals_base_url() {
        Some(url) => Arc::new(
            SignalsClient::new(url, config.binance.request_timeout())
                .context("failed to build signals client")?,
        ),
        None => Arc::new(AnalysisService::new(
            binance.clone(),
            Arc::new(MemoryResultCache::new()),
            Arc::new(MarketStructureEngine::from_config(&config.engine)),
            config.binance.kline_limit,
            config.cache.ttl(),
        )),
    };
    tracing::info!(
        source = source.name(),
        symbol = %symbol,
        timeframe = %timeframe,
        "Starting zone-watch"
    );

    let (price_tx, price_rx) = watch::channel(PriceQuote::new(symbol.clone(), 0.0));
    let (symbol_tx, symbol_rx) = watch::channel(symbol.clone());
    let (cmd_tx, cmd_rx) = mpsc::channel::<TrackerCommand>(16);
    let (event_tx, mut event_rx) = mpsc::channel::<TrackerEvent>(64);

    tokio::spawn(poll_prices(binance, symbol_rx, price_tx));
    let tracker_task = tokio::spawn(run_tracker(
        TrackerSettings {
            symbol,
            timeframe,
            poll_interval: config.tracker.poll_interval(),
            enabled: true,
        },
        source,
        price_rx,
        cmd_rx,
        event_tx,
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Some(cmd)) => {
                        if let TrackerCommand::SwitchMarket { symbol, .. } = &cmd {
                            let _ = symbol_tx.send(symbol.clone());
                        }
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(msg) => tracing::warn!("{}", msg),
                },
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                let _ = cmd_tx.send(TrackerCommand::Shutdown).await;
                break;
            }
        }
    }

    tracker_task.await.context("tracker task panicked")?;
    Ok(())
}
