use std::fmt::Debug;

use crate::model::Candle;

/// Per-candle volatility values. Entries before `warmup` are placeholders
/// (0.0) and are never a real estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilitySeries {
    values: Vec<f64>,
    warmup: usize,
}

impl VolatilitySeries {
    pub fn new(values: Vec<f64>, warmup: usize) -> Self {
        let warmup = warmup.min(values.len());
        Self { values, warmup }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    /// Value at `index`, or `None` while still warming up.
    pub fn at(&self, index: usize) -> Option<f64> {
        if index < self.warmup {
            return None;
        }
        self.values.get(index).copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.len().checked_sub(1).and_then(|i| self.at(i))
    }

    pub fn first_ready(&self) -> Option<f64> {
        self.at(self.warmup)
    }
}

pub trait VolatilityEstimator: Send + Sync + Debug {
    fn estimate(&self, candles: &[Candle]) -> VolatilitySeries;
}

/// Average true range with a simple-mean seed and Wilder smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WilderAtr {
    period: usize,
}

impl WilderAtr {
    pub const DEFAULT_PERIOD: usize = 14;

    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for WilderAtr {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD)
    }
}

impl VolatilityEstimator for WilderAtr {
    fn estimate(&self, candles: &[Candle]) -> VolatilitySeries {
        let values = atr_series(candles, self.period);
        let warmup = if candles.len() > self.period {
            self.period
        } else {
            candles.len()
        };
        VolatilitySeries::new(values, warmup)
    }
}

/// Raw ATR values aligned with `candles`. The first `period` entries are 0,
/// and the whole series is 0 when there are fewer than `period + 1` candles.
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = vec![0.0; candles.len()];
    if candles.len() < period + 1 {
        return out;
    }

    let tr = |i: usize| candles[i].true_range(candles[i - 1].close);
    let n = period as f64;
    out[period] = (1..=period).map(tr).sum::<f64>() / n;
    for i in (period + 1)..candles.len() {
        out[i] = (out[i - 1] * (n - 1.0) + tr(i)) / n;
    }
    out
}
