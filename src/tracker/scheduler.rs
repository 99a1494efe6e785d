use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::model::{AnalysisResult, Timeframe};
use crate::source::AnalysisSource;

use super::events::TrackerEvent;
use super::zones::ZoneLifecycleTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    Enable,
    Disable,
    SwitchMarket { symbol: String, timeframe: Timeframe },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub poll_interval: Duration,
    /// Start polling without waiting for `Enable`.
    pub enabled: bool,
}

/// Latest traded price of `symbol`. A quote for any other symbol than the
/// tracker's active one reads as unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
}

impl PriceQuote {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }

    /// Price for `symbol`, or 0 (unknown) when the quote belongs elsewhere.
    pub fn price_for(&self, symbol: &str) -> f64 {
        if self.symbol == symbol {
            self.price
        } else {
            0.0
        }
    }
}

struct InFlight {
    generation: u64,
    handle: JoinHandle<Result<AnalysisResult>>,
}

impl InFlight {
    fn abort(self) {
        self.handle.abort();
    }
}

async fn join_inflight(
    slot: &mut Option<InFlight>,
) -> (u64, Result<Result<AnalysisResult>, JoinError>) {
    match slot {
        Some(inflight) => (inflight.generation, (&mut inflight.handle).await),
        None => std::future::pending().await,
    }
}

/// Drives one `ZoneLifecycleTracker` until `Shutdown` or the command
/// channel closes. At most one analysis fetch is outstanding at a time.
pub async fn run_tracker(
    settings: TrackerSettings,
    source: Arc<dyn AnalysisSource>,
    price: watch::Receiver<PriceQuote>,
    mut commands: mpsc::Receiver<TrackerCommand>,
    events: mpsc::Sender<TrackerEvent>,
) {
    let TrackerSettings {
        mut symbol,
        mut timeframe,
        poll_interval,
        mut enabled,
    } = settings;
    let mut tracker = ZoneLifecycleTracker::new();
    let mut generation: u64 = 0;
    let mut inflight: Option<InFlight> = None;

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        source = source.name(),
        symbol = %symbol,
        timeframe = %timeframe,
        poll_secs = poll_interval.as_secs(),
        enabled,
        "Zone tracker started"
    );

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    None | Some(TrackerCommand::Shutdown) => {
                        if let Some(f) = inflight.take() {
                            f.abort();
                        }
                        tracing::info!("Zone tracker stopping");
                        break;
                    }
                    Some(TrackerCommand::Enable) => {
                        if !enabled {
                            enabled = true;
                            ticker.reset_immediately();
                            tracing::info!(symbol = %symbol, "Zone tracker enabled");
                        }
                    }
                    Some(TrackerCommand::Disable) => {
                        if let Some(f) = inflight.take() {
                            f.abort();
                        }
                        enabled = false;
                        tracker.reset();
                        tracing::info!(symbol = %symbol, "Zone tracker disabled");
                        let cleared = TrackerEvent::Cleared {
                            symbol: symbol.clone(),
                            timeframe,
                            at: chrono::Utc::now(),
                        };
                        if events.send(cleared).await.is_err() {
                            break;
                        }
                    }
                    Some(TrackerCommand::SwitchMarket { symbol: next, timeframe: next_tf }) => {
                        if let Some(f) = inflight.take() {
                            f.abort();
                        }
                        generation += 1;
                        tracker.reset();
                        tracing::info!(
                            from = %symbol,
                            to = %next,
                            timeframe = %next_tf,
                            generation,
                            "Zone tracker switching market"
                        );
                        symbol = next;
                        timeframe = next_tf;
                        let cleared = TrackerEvent::Cleared {
                            symbol: symbol.clone(),
                            timeframe,
                            at: chrono::Utc::now(),
                        };
                        if events.send(cleared).await.is_err() {
                            break;
                        }
                        if enabled {
                            ticker.reset_immediately();
                        }
                    }
                }
            }
            _ = ticker.tick(), if enabled => {
                if inflight.is_some() {
                    tracing::debug!(symbol = %symbol, "Previous fetch still running, skipping tick");
                    continue;
                }
                let source = Arc::clone(&source);
                let sym = symbol.clone();
                let handle = tokio::spawn(async move { source.fetch_analysis(&sym, timeframe).await });
                inflight = Some(InFlight { generation, handle });
            }
            (fetch_generation, joined) = join_inflight(&mut inflight) => {
                inflight = None;
                if fetch_generation != generation || !enabled {
                    tracing::debug!(fetch_generation, generation, "Dropping stale analysis");
                    continue;
                }
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_cancelled() => continue,
                    Err(e) => Err(anyhow::anyhow!("analysis task failed: {}", e)),
                };
                let delivered = match outcome {
                    Ok(result) => {
                        let current_price = price.borrow().price_for(&symbol);
                        let update = tracker.apply(&result, current_price);
                        tracing::debug!(
                            symbol = %symbol,
                            price = current_price,
                            zones = update.view.zones.len(),
                            removed = update.removed,
                            added = update.added,
                            "Zones reconciled"
                        );
                        let mut ok = true;
                        if let Some(change) = update.structure_change {
                            tracing::info!(
                                symbol = %symbol,
                                from = %change.from,
                                to = %change.to,
                                "Market structure changed"
                            );
                            ok = events
                                .send(TrackerEvent::StructureChanged {
                                    symbol: symbol.clone(),
                                    timeframe,
                                    from: change.from,
                                    to: change.to,
                                    at: chrono::Utc::now(),
                                })
                                .await
                                .is_ok();
                        }
                        ok && events
                            .send(TrackerEvent::Updated {
                                symbol: symbol.clone(),
                                timeframe,
                                view: update.view,
                                removed: update.removed,
                                added: update.added,
                                at: chrono::Utc::now(),
                            })
                            .await
                            .is_ok()
                    }
                    Err(e) => {
                        let detail = format!("{:#}", e);
                        tracing::warn!(
                            source = source.name(),
                            symbol = %symbol,
                            error = %detail,
                            "Analysis fetch failed"
                        );
                        events
                            .send(TrackerEvent::FetchFailed {
                                symbol: symbol.clone(),
                                timeframe,
                                error: detail,
                                at: chrono::Utc::now(),
                            })
                            .await
                            .is_ok()
                    }
                };
                if !delivered {
                    tracing::info!("Tracker event receiver dropped, stopping");
                    break;
                }
            }
        }
    }
}
