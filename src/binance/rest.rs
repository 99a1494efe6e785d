use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::types::{BinanceApiErrorResponse, BinanceKline};
use crate::model::{Candle, Timeframe};
use crate::source::CandleSource;

/// Public market-data client; no signing, klines only.
pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
    // Simple rate limiter: request count in current minute window
    request_count: AtomicU64,
    window_start: Mutex<Instant>,
}

impl BinanceRestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_count: AtomicU64::new(0),
            window_start: Mutex::new(Instant::now()),
        })
    }

    fn klines_url(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            timeframe.as_str(),
            limit.clamp(1, 1000)
        )
    }

    fn check_rate_limit(&self) {
        let count = match self.window_start.lock() {
            Ok(mut start) => {
                if start.elapsed().as_secs() >= 60 {
                    *start = Instant::now();
                    self.request_count.store(0, Ordering::Relaxed);
                }
                self.request_count.fetch_add(1, Ordering::Relaxed)
            }
            Err(_) => self.request_count.fetch_add(1, Ordering::Relaxed),
        };
        // Klines cost weight 2; warn at 80% of the 6000/min budget.
        if count * 2 > 4_800 {
            tracing::warn!(count, "Approaching Binance request weight limit");
        }
    }

    pub async fn get_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.check_rate_limit();
        let url = self.klines_url(symbol, timeframe, limit);
        tracing::debug!(symbol, interval = %timeframe, limit, "Fetching klines");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("klines request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<BinanceApiErrorResponse>(&body) {
                return Err(anyhow!(
                    "binance API error (code {}): {}",
                    err.code,
                    err.msg
                ));
            }
            return Err(anyhow!("klines request returned {}: {}", status, body));
        }

        let rows: Vec<BinanceKline> = resp.json().await.context("klines body is not JSON")?;
        let candles = rows
            .iter()
            .enumerate()
            .map(|(i, row)| row.to_candle().map_err(|e| anyhow!("row {}: {}", i, e)))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(symbol, count = candles.len(), "Fetched klines");
        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for BinanceRestClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.get_klines(symbol, timeframe, limit).await
    }

    fn name(&self) -> &'static str {
        "binance-rest"
    }
}
