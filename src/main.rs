use std::sync::Arc;

use anyhow::Result;
use structure_engine::binance::BinanceRestClient;
use structure_engine::cache::{DisabledCache, MemoryResultCache, ResultCache};
use structure_engine::config::Config;
use structure_engine::engine::MarketStructureEngine;
use structure_engine::logging::init_tracing;
use structure_engine::server::{self, AppState};
use structure_engine::service::AnalysisService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set STRUCTURE_ENGINE_CONFIG or provide config/default.toml");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);

    tracing::info!(
        bind_addr = %config.server.bind_addr,
        rest_url = %config.binance.rest_base_url,
        kline_limit = config.binance.kline_limit,
        cache_enabled = config.cache.enabled,
        "Starting structure-engine"
    );

    let candles = Arc::new(BinanceRestClient::new(
        &config.binance.rest_base_url,
        config.binance.request_timeout(),
    )?);
    let cache: Arc<dyn ResultCache> = if config.cache.enabled {
        Arc::new(MemoryResultCache::new())
    } else {
        Arc::new(DisabledCache)
    };
    let engine = Arc::new(MarketStructureEngine::from_config(&config.engine));
    let service = Arc::new(AnalysisService::new(
        candles,
        cache,
        engine,
        config.binance.kline_limit,
        config.cache.ttl(),
    ));

    server::serve(&config.server.bind_addr, AppState { service }).await
}
