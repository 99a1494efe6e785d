use std::fmt::Debug;

use super::sign;
use super::volatility::VolatilitySeries;
use crate::model::{MarketRegime, Pivot, PivotKind};

#[derive(Debug, Clone, Copy)]
pub struct RegimeInputs<'a> {
    pub atr: &'a VolatilitySeries,
    pub impulse_score: f64,
    pub pivots: &'a [Pivot],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeReading {
    pub regime: MarketRegime,
    /// 0-100 distance of the decision from its classification boundary.
    pub clarity: f64,
}

pub trait RegimeClassifier: Send + Sync + Debug {
    fn classify(&self, inputs: &RegimeInputs<'_>) -> RegimeReading;
}

/// Ordered threshold rules: expansion, compression, trend, range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRegime {
    pub atr_trend_window: usize,
    pub expansion_atr_ratio: f64,
    pub expansion_impulse: f64,
    pub contraction_atr_ratio: f64,
    pub compression_pivots: usize,
    pub compression_range_atr: f64,
    pub trend_pairs: usize,
}

impl Default for ThresholdRegime {
    fn default() -> Self {
        Self {
            atr_trend_window: 5,
            expansion_atr_ratio: 1.2,
            expansion_impulse: 60.0,
            contraction_atr_ratio: 0.9,
            compression_pivots: 4,
            compression_range_atr: 3.0,
            trend_pairs: 3,
        }
    }
}

/// Signed distance past a threshold, scaled by `span` into [-1, 1].
fn margin(value: f64, threshold: f64, span: f64) -> f64 {
    ((value - threshold) / span).clamp(-1.0, 1.0)
}

impl ThresholdRegime {
    /// Latest ATR over the ATR `atr_trend_window` bars earlier; 1.0 when
    /// either end is still in warm-up.
    pub fn atr_ratio(&self, atr: &VolatilitySeries) -> f64 {
        let Some(now) = atr.len().checked_sub(1) else {
            return 1.0;
        };
        let Some(then) = now.checked_sub(self.atr_trend_window.max(1)) else {
            return 1.0;
        };
        match (atr.at(now), atr.at(then)) {
            (Some(a), Some(b)) if b > 0.0 => a / b,
            _ => 1.0,
        }
    }

    fn pivot_range(&self, pivots: &[Pivot]) -> Option<f64> {
        let take = self.compression_pivots.max(2);
        if pivots.len() < 2 {
            return None;
        }
        let recent = &pivots[pivots.len().saturating_sub(take)..];
        let hi = recent.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
        let lo = recent.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        Some(hi - lo)
    }

    /// Length of the trailing run of same-direction swing pairs.
    pub fn consistent_pairs(pivots: &[Pivot]) -> usize {
        let mut pairs: Vec<(usize, f64)> = Vec::new();
        for kind in [PivotKind::High, PivotKind::Low] {
            let same: Vec<&Pivot> = pivots.iter().filter(|p| p.kind == kind).collect();
            for w in same.windows(2) {
                pairs.push((w[1].index, sign(w[1].price - w[0].price)));
            }
        }
        pairs.sort_by_key(|(index, _)| *index);

        let Some(&(_, last_dir)) = pairs.last() else {
            return 0;
        };
        if last_dir == 0.0 {
            return 0;
        }
        pairs
            .iter()
            .rev()
            .take_while(|(_, dir)| *dir == last_dir)
            .count()
    }
}

impl RegimeClassifier for ThresholdRegime {
    fn classify(&self, inputs: &RegimeInputs<'_>) -> RegimeReading {
        let ratio = self.atr_ratio(inputs.atr);

        let expansion = margin(ratio, self.expansion_atr_ratio, 0.3)
            .min(margin(inputs.impulse_score, self.expansion_impulse, 40.0));

        let compression = match (self.pivot_range(inputs.pivots), inputs.atr.latest()) {
            (Some(range), Some(atr)) if atr > 0.0 => {
                let limit = self.compression_range_atr * atr;
                margin(self.contraction_atr_ratio, ratio, 0.3).min(margin(limit, range, limit))
            }
            _ => -1.0,
        };

        let k = self.trend_pairs.max(1) as f64;
        let run = Self::consistent_pairs(inputs.pivots) as f64;
        let trend = if run >= k {
            ((run - k + 1.0) / k).min(1.0)
        } else {
            ((run - k) / k).max(-1.0)
        };

        let (regime, clarity) = if expansion >= 0.0 {
            (MarketRegime::Expansion, expansion)
        } else if compression >= 0.0 {
            (MarketRegime::Compression, compression)
        } else if trend >= 0.0 {
            (MarketRegime::Trend, trend)
        } else {
            let nearest = expansion.max(compression).max(trend);
            (MarketRegime::Range, -nearest)
        };

        RegimeReading {
            regime,
            clarity: (clarity * 100.0).clamp(0.0, 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pivots(points: &[(PivotKind, f64)]) -> Vec<Pivot> {
        points
            .iter()
            .enumerate()
            .map(|(i, (kind, price))| Pivot {
                kind: *kind,
                price: *price,
                index: 10 + i * 3,
                time: i as i64,
            })
            .collect()
    }

    fn atr_ramp(from: f64, to: f64) -> VolatilitySeries {
        // 14 warm-up zeros followed by 16 linearly interpolated values.
        let mut values = vec![0.0; 14];
        for i in 0..16 {
            values.push(from + (to - from) * i as f64 / 15.0);
        }
        VolatilitySeries::new(values, 14)
    }

    use PivotKind::{High as H, Low as L};

    #[test]
    fn expansion_needs_rising_atr_and_impulse() {
        let atr = atr_ramp(1.0, 3.0);
        let piv = pivots(&[(L, 95.0), (H, 105.0), (L, 98.0), (H, 110.0), (L, 102.0)]);
        let reading = ThresholdRegime::default().classify(&RegimeInputs {
            atr: &atr,
            impulse_score: 90.0,
            pivots: &piv,
        });
        assert_eq!(reading.regime, MarketRegime::Expansion);
        assert!(reading.clarity > 0.0);

        // Same ATR but weak impulse falls through to trend.
        let reading = ThresholdRegime::default().classify(&RegimeInputs {
            atr: &atr,
            impulse_score: 20.0,
            pivots: &piv,
        });
        assert_eq!(reading.regime, MarketRegime::Trend);
    }

    #[test]
    fn compression_needs_falling_atr_and_tight_pivots() {
        let atr = atr_ramp(2.0, 1.0);
        let tight = pivots(&[(H, 101.0), (L, 99.5), (H, 100.8), (L, 99.6)]);
        let reading = ThresholdRegime::default().classify(&RegimeInputs {
            atr: &atr,
            impulse_score: 10.0,
            pivots: &tight,
        });
        assert_eq!(reading.regime, MarketRegime::Compression);

        let wide = pivots(&[(H, 110.0), (L, 90.0), (H, 111.0), (L, 89.0)]);
        let reading = ThresholdRegime::default().classify(&RegimeInputs {
            atr: &atr,
            impulse_score: 10.0,
            pivots: &wide,
        });
        assert_eq!(reading.regime, MarketRegime::Range);
    }

    #[test]
    fn trend_requires_three_consistent_pairs() {
        let flat = atr_ramp(1.0, 1.0);
        let two = pivots(&[(L, 95.0), (H, 105.0), (L, 98.0), (H, 110.0)]);
        assert_eq!(ThresholdRegime::consistent_pairs(&two), 2);
        let reading = ThresholdRegime::default().classify(&RegimeInputs {
            atr: &flat,
            impulse_score: 30.0,
            pivots: &two,
        });
        assert_eq!(reading.regime, MarketRegime::Range);

        let three = pivots(&[(L, 95.0), (H, 105.0), (L, 98.0), (H, 110.0), (L, 102.0)]);
        assert_eq!(ThresholdRegime::consistent_pairs(&three), 3);
        let reading = ThresholdRegime::default().classify(&RegimeInputs {
            atr: &flat,
            impulse_score: 30.0,
            pivots: &three,
        });
        assert_eq!(reading.regime, MarketRegime::Trend);
    }

    #[test]
    fn warmup_atr_is_neutral() {
        let atr = VolatilitySeries::new(vec![0.0; 20], 20);
        assert_eq!(ThresholdRegime::default().atr_ratio(&atr), 1.0);
        let reading = ThresholdRegime::default().classify(&RegimeInputs {
            atr: &atr,
            impulse_score: 100.0,
            pivots: &[],
        });
        assert_eq!(reading.regime, MarketRegime::Range);
        assert!((0.0..=100.0).contains(&reading.clarity));
    }
}
