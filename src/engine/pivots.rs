use std::fmt::Debug;

use super::volatility::VolatilitySeries;
use crate::model::{Candle, Pivot, PivotKind};

pub trait PivotDetector: Send + Sync + Debug {
    /// Confirmed pivots in strictly increasing index order, alternating
    /// between highs and lows.
    fn detect(&self, candles: &[Candle], atr: &VolatilitySeries) -> Vec<Pivot>;
}

/// Fractal-style swing detector with an ATR noise floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPivotDetector {
    lookback: usize,
    min_swing_atr: f64,
}

impl SwingPivotDetector {
    pub fn new(lookback: usize, min_swing_atr: f64) -> Self {
        Self {
            lookback: lookback.max(1),
            min_swing_atr: if min_swing_atr.is_finite() {
                min_swing_atr.max(0.0)
            } else {
                0.0
            },
        }
    }
}

impl Default for SwingPivotDetector {
    fn default() -> Self {
        Self::new(3, 0.5)
    }
}

impl PivotDetector for SwingPivotDetector {
    fn detect(&self, candles: &[Candle], atr: &VolatilitySeries) -> Vec<Pivot> {
        let l = self.lookback;
        let n = candles.len();
        if n < 2 * l + 1 {
            return Vec::new();
        }
        // Warm-up bars borrow the first real estimate; no estimate at all
        // disables the noise floor.
        let fallback = atr.first_ready().unwrap_or(0.0);

        let mut pivots: Vec<Pivot> = Vec::new();
        for i in l..(n - l) {
            let bar = &candles[i];
            let before = &candles[i - l..i];
            let after = &candles[i + 1..=i + l];
            let window = &candles[i - l..=i + l];
            let min_swing = self.min_swing_atr * atr.at(i).unwrap_or(fallback);

            let window_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let window_high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);

            // Equal extremes: the later bar wins, so ties are allowed only
            // against earlier bars.
            let is_high = before.iter().all(|c| bar.high >= c.high)
                && after.iter().all(|c| bar.high > c.high)
                && bar.high - window_low >= min_swing;
            let is_low = before.iter().all(|c| bar.low <= c.low)
                && after.iter().all(|c| bar.low < c.low)
                && window_high - bar.low >= min_swing;

            let kind = match (is_high, is_low) {
                (false, false) => continue,
                (true, false) => PivotKind::High,
                (false, true) => PivotKind::Low,
                (true, true) => match pivots.last() {
                    Some(prev) if prev.kind == PivotKind::High => PivotKind::Low,
                    Some(_) => PivotKind::High,
                    None if bar.is_bullish() => PivotKind::High,
                    None => PivotKind::Low,
                },
            };
            let price = match kind {
                PivotKind::High => bar.high,
                PivotKind::Low => bar.low,
            };
            push_collapsing(
                &mut pivots,
                Pivot {
                    kind,
                    price,
                    index: i,
                    time: bar.time,
                },
            );
        }
        pivots
    }
}

/// Append `pivot`, merging it with the previous one when both are the same
/// kind. The more extreme price survives; ties keep the newer pivot.
fn push_collapsing(pivots: &mut Vec<Pivot>, pivot: Pivot) {
    match pivots.last_mut() {
        Some(last) if last.kind == pivot.kind => {
            let stronger = match pivot.kind {
                PivotKind::High => pivot.price >= last.price,
                PivotKind::Low => pivot.price <= last.price,
            };
            if stronger {
                *last = pivot;
            }
        }
        _ => pivots.push(pivot),
    }
}
