use serde::{Deserialize, Serialize};

/// One OHLCV bar. `time` is the bar's open time in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// True range against the previous bar's close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        (self.high - self.low)
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }

    /// Describe why this bar violates the OHLCV invariants, if it does.
    pub fn defect(&self) -> Option<&'static str> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Some("non-finite price");
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Some("volume must be a finite value >= 0");
        }
        if self.high < self.open.max(self.close) {
            return Some("high is below open/close");
        }
        if self.low > self.open.min(self.close) {
            return Some("low is above open/close");
        }
        None
    }
}
