use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use structure_engine::cache::{DisabledCache, MemoryResultCache, ResultCache};
use structure_engine::engine::MarketStructureEngine;
use structure_engine::error::{AppError, CacheError, EngineError};
use structure_engine::model::{Candle, MarketStructure, Timeframe};
use structure_engine::service::{AnalysisService, AnalyzeRequest};
use structure_engine::source::{AnalysisSource, CandleSource};

struct ScriptedCandles {
    candles: Vec<Candle>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedCandles {
    fn ok(candles: Vec<Candle>) -> Arc<Self> {
        Arc::new(Self {
            candles,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            candles: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleSource for ScriptedCandles {
    async fn fetch_candles(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("binance API error (code -1003): too many requests"));
        }
        let start = self.candles.len().saturating_sub(limit);
        Ok(self.candles[start..].to_vec())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Cache whose reads and writes always fail.
struct BrokenCache;

impl ResultCache for BrokenCache {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection reset".to_string()))
    }

    fn put(&self, _key: &str, _payload: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection reset".to_string()))
    }
}

fn uptrend(n: usize) -> Vec<Candle> {
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let open = price;
            let close = if i % 10 < 6 { open + 1.5 } else { open - 1.0 };
            price = close;
            Candle {
                time: 1_700_000_000 + i as i64 * 60,
                open,
                high: open.max(close) + 0.25,
                low: open.min(close) - 0.25,
                close,
                volume: 1.0,
            }
        })
        .collect()
}

fn service(candles: Arc<ScriptedCandles>, cache: Arc<dyn ResultCache>) -> AnalysisService {
    AnalysisService::new(
        candles,
        cache,
        Arc::new(MarketStructureEngine::default()),
        500,
        Duration::from_secs(900),
    )
}

fn btc() -> AnalyzeRequest {
    AnalyzeRequest::new("BTCUSDT", "1m").unwrap()
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let candles = ScriptedCandles::ok(uptrend(80));
    let cache = Arc::new(MemoryResultCache::new());
    let svc = service(candles.clone(), cache.clone());

    let first = svc.analyze(&btc()).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.candles_count, Some(80));
    assert_eq!(first.result.structure, MarketStructure::Bullish);
    assert!(cache.get("BTCUSDT:1m").unwrap().is_some());

    let second = svc.analyze(&btc()).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.result.structure, first.result.structure);
    assert_eq!(second.result.regime, first.result.regime);
    assert_eq!(candles.calls(), 1);
}

#[tokio::test]
async fn corrupt_cache_entry_is_a_miss() {
    let candles = ScriptedCandles::ok(uptrend(80));
    let cache = Arc::new(MemoryResultCache::new());
    cache
        .put(
            "BTCUSDT:1m",
            r#"{"structure":"Bullish","confidence":250}"#.to_string(),
            Duration::from_secs(60),
        )
        .unwrap();
    let svc = service(candles.clone(), cache.clone());

    let outcome = svc.analyze(&btc()).await.unwrap();
    assert!(!outcome.cached);
    assert_eq!(candles.calls(), 1);
    // The bad entry was overwritten with a valid one.
    let stored = cache.get("BTCUSDT:1m").unwrap().unwrap();
    assert!(stored.contains("impulseScore"));
}

#[tokio::test]
async fn unavailable_cache_falls_back_to_fresh_computation() {
    let candles = ScriptedCandles::ok(uptrend(80));
    for cache in [
        Arc::new(DisabledCache) as Arc<dyn ResultCache>,
        Arc::new(BrokenCache) as Arc<dyn ResultCache>,
    ] {
        let svc = service(candles.clone(), cache);
        let a = svc.analyze(&btc()).await.unwrap();
        let b = svc.analyze(&btc()).await.unwrap();
        assert!(!a.cached && !b.cached);
        assert_eq!(a.result, b.result);
    }
    assert_eq!(candles.calls(), 4);
}

#[tokio::test]
async fn upstream_failure_is_reported_with_detail() {
    let svc = service(ScriptedCandles::failing(), Arc::new(MemoryResultCache::new()));
    match svc.analyze(&btc()).await {
        Err(AppError::Upstream(detail)) => assert!(detail.contains("-1003")),
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_upstream_candles_are_an_upstream_error() {
    let mut bars = uptrend(30);
    bars[7].high = bars[7].open.min(bars[7].close) - 1.0;
    let cache = Arc::new(MemoryResultCache::new());
    let svc = service(ScriptedCandles::ok(bars), cache.clone());
    match svc.analyze(&btc()).await {
        Err(AppError::Upstream(detail)) => {
            assert!(detail.contains("malformed"), "{}", detail);
            assert!(detail.contains("index 7"), "{}", detail);
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
    assert!(cache.is_empty());
}

#[tokio::test]
async fn short_history_surfaces_engine_error() {
    let svc = service(ScriptedCandles::ok(uptrend(12)), Arc::new(MemoryResultCache::new()));
    match svc.analyze(&btc()).await {
        Err(AppError::Engine(EngineError::InsufficientCandles { actual, required })) => {
            assert_eq!((actual, required), (12, 20));
        }
        other => panic!("expected insufficient candles, got {:?}", other),
    }
}

#[tokio::test]
async fn service_doubles_as_tracker_source() {
    let svc = service(ScriptedCandles::ok(uptrend(80)), Arc::new(MemoryResultCache::new()));
    let source: &dyn AnalysisSource = &svc;
    let result = source.fetch_analysis("ethusdt", Timeframe::M5).await.unwrap();
    assert_eq!(result.structure, MarketStructure::Bullish);
    assert_eq!(source.name(), "local-engine");

    assert!(source.fetch_analysis("??", Timeframe::M5).await.is_err());
}
