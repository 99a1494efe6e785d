use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{normalize_symbol, Timeframe};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub binance: BinanceConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub tracker: TrackerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    /// Candles requested per analysis run.
    pub kline_limit: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub atr_period: usize,
    pub pivot_lookback: usize,
    pub min_swing_atr: f64,
    pub impulse_window: usize,
    pub expansion_atr_ratio: f64,
    pub expansion_impulse: f64,
    pub contraction_atr_ratio: f64,
    pub compression_range_atr: f64,
    pub stop_atr_mult: f64,
    pub target_atr_mult: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            pivot_lookback: 3,
            min_swing_atr: 0.5,
            impulse_window: 20,
            expansion_atr_ratio: 1.2,
            expansion_impulse: 60.0,
            contraction_atr_ratio: 0.9,
            compression_range_atr: 3.0,
            stop_atr_mult: 1.5,
            target_atr_mult: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    pub symbol: String,
    pub timeframe: String,
    pub poll_interval_secs: u64,
    /// Remote signals endpoint base; empty means analyse locally.
    #[serde(default)]
    pub signals_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn config_path() -> PathBuf {
    std::env::var("STRUCTURE_ENGINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/default.toml"))
}

impl BinanceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn market(&self) -> Result<(String, Timeframe)> {
        let symbol = normalize_symbol(&self.symbol)
            .with_context(|| format!("tracker.symbol '{}' is invalid", self.symbol))?;
        let timeframe = Timeframe::parse(&self.timeframe)
            .with_context(|| format!("tracker.timeframe '{}' is unsupported", self.timeframe))?;
        Ok((symbol, timeframe))
    }

    pub fn signals_base_url(&self) -> Option<&str> {
        let url = self.signals_base_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::load_from_path(&config_path())?;

        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("SIGNALS_BASE_URL") {
            config.tracker.signals_base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.binance.rest_base_url).context("binance.rest_base_url is invalid")?;
        if let Some(url) = self.tracker.signals_base_url() {
            url::Url::parse(url).context("tracker.signals_base_url is invalid")?;
        }
        if self.binance.kline_limit < crate::engine::MIN_CANDLES || self.binance.kline_limit > 1000 {
            bail!(
                "binance.kline_limit must be between {} and 1000, got {}",
                crate::engine::MIN_CANDLES,
                self.binance.kline_limit
            );
        }
        self.tracker.market().context("tracker market is invalid")?;
        Ok(())
    }
}
