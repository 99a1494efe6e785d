use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{decode_cached_result, ResultCache};
use crate::engine::MarketStructureEngine;
use crate::error::{AppError, CacheError, EngineError};
use crate::model::{cache_key, normalize_symbol, AnalysisResult, Timeframe};
use crate::source::{AnalysisSource, CandleSource};

/// A validated `{symbol, timeframe}` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl AnalyzeRequest {
    pub fn new(symbol: &str, timeframe: &str) -> Result<Self, AppError> {
        let symbol = normalize_symbol(symbol).ok_or_else(|| {
            AppError::validation("symbol", "expected 2-20 ASCII letters or digits")
        })?;
        let timeframe = Timeframe::parse(timeframe).ok_or_else(|| {
            AppError::validation(
                "timeframe",
                format!(
                    "expected one of {}",
                    Timeframe::ALL.map(|tf| tf.as_str()).join(", ")
                ),
            )
        })?;
        Ok(Self { symbol, timeframe })
    }

    /// Validate a raw JSON body. Anything other than an object carrying
    /// string `symbol` and `timeframe` fields is rejected with the offending
    /// field named.
    pub fn from_json(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::validation("body", "request body is empty"));
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::validation("body", format!("malformed JSON: {}", e)))?;
        let Value::Object(fields) = value else {
            return Err(AppError::validation("body", "expected a JSON object"));
        };
        let symbol = fields
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("symbol", "missing or not a string"))?;
        let timeframe = fields
            .get("timeframe")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("timeframe", "missing or not a string"))?;
        Self::new(symbol, timeframe)
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.symbol, self.timeframe)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeOutcome {
    pub result: AnalysisResult,
    pub cached: bool,
    /// Candles fed to the engine; `None` when served from cache.
    pub candles_count: Option<usize>,
}

/// Cache check, candle fetch, engine run, cache write.
pub struct AnalysisService {
    candles: Arc<dyn CandleSource>,
    cache: Arc<dyn ResultCache>,
    engine: Arc<MarketStructureEngine>,
    kline_limit: usize,
    cache_ttl: Duration,
}

impl AnalysisService {
    pub fn new(
        candles: Arc<dyn CandleSource>,
        cache: Arc<dyn ResultCache>,
        engine: Arc<MarketStructureEngine>,
        kline_limit: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            candles,
            cache,
            engine,
            kline_limit,
            cache_ttl,
        }
    }

    pub async fn analyze(&self, req: &AnalyzeRequest) -> Result<AnalyzeOutcome, AppError> {
        let key = req.cache_key();
        if let Some(result) = self.read_cache(&key) {
            tracing::debug!(key = %key, "Serving analysis from cache");
            return Ok(AnalyzeOutcome {
                result,
                cached: true,
                candles_count: None,
            });
        }

        let candles = self
            .candles
            .fetch_candles(&req.symbol, req.timeframe, self.kline_limit)
            .await
            .map_err(|e| {
                tracing::warn!(
                    source = self.candles.name(),
                    symbol = %req.symbol,
                    timeframe = %req.timeframe,
                    error = %e,
                    "Candle fetch failed"
                );
                AppError::Upstream(format!("{:#}", e))
            })?;

        // A malformed bar came from the exchange, not the caller.
        let result = self.engine.analyze(&candles).map_err(|e| match e {
            EngineError::InvalidCandle { .. } => {
                tracing::warn!(
                    source = self.candles.name(),
                    symbol = %req.symbol,
                    timeframe = %req.timeframe,
                    error = %e,
                    "Upstream returned malformed candles"
                );
                AppError::Upstream(format!("malformed candle data: {}", e))
            }
            other => AppError::Engine(other),
        })?;
        tracing::info!(
            symbol = %req.symbol,
            timeframe = %req.timeframe,
            candles = candles.len(),
            structure = %result.structure,
            regime = %result.regime,
            confidence = result.confidence,
            zones = result.zones.len(),
            "Analysis computed"
        );
        self.write_cache(&key, &result);

        Ok(AnalyzeOutcome {
            result,
            cached: false,
            candles_count: Some(candles.len()),
        })
    }

    fn read_cache(&self, key: &str) -> Option<AnalysisResult> {
        match self.cache.get(key) {
            Ok(Some(payload)) => decode_cached_result(&payload),
            Ok(None) => None,
            Err(CacheError::Unavailable(reason)) => {
                tracing::debug!(key, reason = %reason, "Cache unavailable on read");
                None
            }
        }
    }

    fn write_cache(&self, key: &str, result: &AnalysisResult) {
        let payload = match serde_json::to_string(result) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize analysis for cache");
                return;
            }
        };
        if let Err(e) = self.cache.put(key, payload, self.cache_ttl) {
            tracing::debug!(key, error = %e, "Cache write skipped");
        }
    }
}

#[async_trait]
impl AnalysisSource for AnalysisService {
    async fn fetch_analysis(&self, symbol: &str, timeframe: Timeframe) -> Result<AnalysisResult> {
        let req = AnalyzeRequest::new(symbol, timeframe.as_str())?;
        Ok(self.analyze(&req).await?.result)
    }

    fn name(&self) -> &'static str {
        "local-engine"
    }
}
