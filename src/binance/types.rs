use serde::Deserialize;
use serde_json::Value;

use crate::model::Candle;

/// Error body returned by the Binance REST API.
#[derive(Debug, Deserialize)]
pub struct BinanceApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

/// One row of `/api/v3/klines`:
/// `[openTime, open, high, low, close, volume, closeTime, ...]`, prices as
/// decimal strings and times in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct BinanceKline(pub Vec<Value>);

impl BinanceKline {
    fn number(&self, idx: usize, name: &str) -> Result<f64, String> {
        let value = self
            .0
            .get(idx)
            .ok_or_else(|| format!("kline row is missing {}", name))?;
        let parsed = match value {
            Value::String(s) => s.parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        };
        parsed.ok_or_else(|| format!("kline {} is not numeric: {}", name, value))
    }

    /// Convert to a candle with `time` in epoch seconds.
    pub fn to_candle(&self) -> Result<Candle, String> {
        let open_time_ms = self
            .0
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| "kline open time is missing or not an integer".to_string())?;
        Ok(Candle {
            time: open_time_ms / 1000,
            open: self.number(1, "open")?,
            high: self.number(2, "high")?,
            low: self.number(3, "low")?,
            close: self.number(4, "close")?,
            volume: self.number(5, "volume")?,
        })
    }
}
