use anyhow::Result;
use async_trait::async_trait;

use crate::model::{AnalysisResult, Candle, Timeframe};

/// Anything that can hand back a recent candle window, oldest first.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Where the zone tracker gets its analysis from. Every implementation
/// returns the canonical `AnalysisResult` shape.
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn fetch_analysis(&self, symbol: &str, timeframe: Timeframe) -> Result<AnalysisResult>;

    fn name(&self) -> &'static str;
}
