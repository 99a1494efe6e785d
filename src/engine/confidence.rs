use std::fmt::Debug;

use super::impulse::ImpulseReading;
use super::regime::RegimeReading;
use crate::model::MarketStructure;

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInputs {
    pub structure: MarketStructure,
    pub regime: RegimeReading,
    pub impulse: ImpulseReading,
    pub pivot_count: usize,
    /// Bars between the last confirmed pivot and the latest candle.
    pub bars_since_last_pivot: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceReading {
    pub confidence: f64,
    pub reasoning: String,
}

pub trait ConfidenceAggregator: Send + Sync + Debug {
    fn aggregate(&self, inputs: &ConfidenceInputs) -> ConfidenceReading;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedConfidence {
    pub regime_weight: f64,
    pub impulse_weight: f64,
    pub pivot_weight: f64,
    /// Pivot count at which the density component saturates.
    pub pivot_saturation: usize,
    /// Bars over which pivot recency halves.
    pub recency_span: usize,
}

impl Default for WeightedConfidence {
    fn default() -> Self {
        Self {
            regime_weight: 0.40,
            impulse_weight: 0.35,
            pivot_weight: 0.25,
            pivot_saturation: 8,
            recency_span: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    Regime,
    Impulse,
    Pivots,
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl WeightedConfidence {
    pub fn pivot_score(&self, count: usize, bars_since_last: Option<usize>) -> f64 {
        let Some(bars) = bars_since_last else {
            return 0.0;
        };
        let density = (count as f64 / self.pivot_saturation.max(1) as f64).min(1.0);
        let recency = 1.0 / (1.0 + bars as f64 / self.recency_span.max(1) as f64);
        100.0 * (0.7 * density + 0.3 * recency)
    }

    /// Weights rescaled to sum to 1.
    fn weights(&self) -> [f64; 3] {
        let raw = [
            self.regime_weight.max(0.0),
            self.impulse_weight.max(0.0),
            self.pivot_weight.max(0.0),
        ];
        let total: f64 = raw.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return [0.40, 0.35, 0.25];
        }
        raw.map(|w| w / total)
    }
}

impl ConfidenceAggregator for WeightedConfidence {
    fn aggregate(&self, inputs: &ConfidenceInputs) -> ConfidenceReading {
        let [wr, wi, wp] = self.weights();
        let pivots = self.pivot_score(inputs.pivot_count, inputs.bars_since_last_pivot);
        let parts = [
            (Factor::Regime, wr * inputs.regime.clarity.clamp(0.0, 100.0)),
            (Factor::Impulse, wi * inputs.impulse.score.clamp(0.0, 100.0)),
            (Factor::Pivots, wp * pivots.clamp(0.0, 100.0)),
        ];
        let total: f64 = parts.iter().map(|(_, v)| v).sum();
        let confidence = round2(total.clamp(0.0, 100.0));

        // First factor wins ties.
        let mut dominant = parts[0];
        for part in &parts[1..] {
            if part.1 > dominant.1 {
                dominant = *part;
            }
        }
        let driver = match dominant.0 {
            Factor::Regime => format!(
                "regime clarity {:.0}/100 is the main driver",
                inputs.regime.clarity
            ),
            Factor::Impulse => {
                let way = if inputs.impulse.direction > 0.0 {
                    "upward"
                } else if inputs.impulse.direction < 0.0 {
                    "downward"
                } else {
                    "flat"
                };
                format!(
                    "{} impulse of {:.0}/100 is the main driver",
                    way, inputs.impulse.score
                )
            }
            Factor::Pivots => format!(
                "{} confirmed pivots are the main driver",
                inputs.pivot_count
            ),
        };

        ConfidenceReading {
            confidence,
            reasoning: format!(
                "{} structure in a {} regime; {}. Confidence {:.0}%.",
                inputs.structure, inputs.regime.regime, driver, confidence
            ),
        }
    }
}
