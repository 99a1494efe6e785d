use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{AnalysisResult, Candle, MarketRegime, MarketStructure, TradingZone, ZoneSide};

use super::confidence::{round2, ConfidenceAggregator, ConfidenceInputs, WeightedConfidence};
use super::impulse::{ImpulseAnalyzer, VelocityImpulse};
use super::pivots::{PivotDetector, SwingPivotDetector};
use super::regime::{RegimeClassifier, RegimeInputs, ThresholdRegime};
use super::structure::{StructureClassifier, SwingStructure};
use super::volatility::{VolatilityEstimator, WilderAtr};

/// Fewest candles the engine will analyse.
pub const MIN_CANDLES: usize = 20;

/// Stop and target distances in ATR multiples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonePolicy {
    pub stop_atr_mult: f64,
    pub target_atr_mult: f64,
}

impl Default for ZonePolicy {
    fn default() -> Self {
        Self {
            stop_atr_mult: 1.5,
            target_atr_mult: 3.0,
        }
    }
}

impl ZonePolicy {
    /// Falls back to the defaults unless `0 < stop < target`.
    pub fn new(stop_atr_mult: f64, target_atr_mult: f64) -> Self {
        let valid = stop_atr_mult.is_finite()
            && target_atr_mult.is_finite()
            && stop_atr_mult > 0.0
            && target_atr_mult > stop_atr_mult;
        if valid {
            Self {
                stop_atr_mult,
                target_atr_mult,
            }
        } else {
            tracing::warn!(
                stop_atr_mult,
                target_atr_mult,
                "Invalid zone multipliers, using defaults"
            );
            Self::default()
        }
    }
}

/// Runs the full pipeline over one candle window. Holds no state between
/// calls, so identical input always yields an identical result.
#[derive(Debug)]
pub struct MarketStructureEngine {
    volatility: Box<dyn VolatilityEstimator>,
    pivots: Box<dyn PivotDetector>,
    structure: Box<dyn StructureClassifier>,
    impulse: Box<dyn ImpulseAnalyzer>,
    regime: Box<dyn RegimeClassifier>,
    confidence: Box<dyn ConfidenceAggregator>,
    zones: ZonePolicy,
}

impl Default for MarketStructureEngine {
    fn default() -> Self {
        Self {
            volatility: Box::new(WilderAtr::default()),
            pivots: Box::new(SwingPivotDetector::default()),
            structure: Box::new(SwingStructure),
            impulse: Box::new(VelocityImpulse::default()),
            regime: Box::new(ThresholdRegime::default()),
            confidence: Box::new(WeightedConfidence::default()),
            zones: ZonePolicy::default(),
        }
    }
}

impl MarketStructureEngine {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        let lookback = cfg.pivot_lookback.max(1);
        Self {
            volatility: Box::new(WilderAtr::new(cfg.atr_period)),
            pivots: Box::new(SwingPivotDetector::new(lookback, cfg.min_swing_atr)),
            structure: Box::new(SwingStructure),
            impulse: Box::new(VelocityImpulse::new(cfg.impulse_window)),
            regime: Box::new(ThresholdRegime {
                expansion_atr_ratio: cfg.expansion_atr_ratio,
                expansion_impulse: cfg.expansion_impulse,
                contraction_atr_ratio: cfg.contraction_atr_ratio,
                compression_range_atr: cfg.compression_range_atr,
                ..ThresholdRegime::default()
            }),
            confidence: Box::new(WeightedConfidence {
                recency_span: 2 * lookback + 1,
                ..WeightedConfidence::default()
            }),
            zones: ZonePolicy::new(cfg.stop_atr_mult, cfg.target_atr_mult),
        }
    }

    pub fn with_volatility(mut self, stage: impl VolatilityEstimator + 'static) -> Self {
        self.volatility = Box::new(stage);
        self
    }

    pub fn with_pivots(mut self, stage: impl PivotDetector + 'static) -> Self {
        self.pivots = Box::new(stage);
        self
    }

    pub fn with_structure(mut self, stage: impl StructureClassifier + 'static) -> Self {
        self.structure = Box::new(stage);
        self
    }

    pub fn with_impulse(mut self, stage: impl ImpulseAnalyzer + 'static) -> Self {
        self.impulse = Box::new(stage);
        self
    }

    pub fn with_regime(mut self, stage: impl RegimeClassifier + 'static) -> Self {
        self.regime = Box::new(stage);
        self
    }

    pub fn with_confidence(mut self, stage: impl ConfidenceAggregator + 'static) -> Self {
        self.confidence = Box::new(stage);
        self
    }

    pub fn with_zone_policy(mut self, policy: ZonePolicy) -> Self {
        self.zones = policy;
        self
    }

    pub fn analyze(&self, candles: &[Candle]) -> Result<AnalysisResult, EngineError> {
        validate(candles)?;

        let atr = self.volatility.estimate(candles);
        let pivots = self.pivots.detect(candles, &atr);
        let structure = self.structure.classify(&pivots);
        let impulse = self.impulse.analyze(candles, atr.latest());
        let regime = self.regime.classify(&RegimeInputs {
            atr: &atr,
            impulse_score: impulse.score,
            pivots: &pivots,
        });
        let last_index = candles.len() - 1;
        let verdict = self.confidence.aggregate(&ConfidenceInputs {
            structure,
            regime,
            impulse,
            pivot_count: pivots.len(),
            bars_since_last_pivot: pivots.last().map(|p| last_index - p.index),
        });

        let zones = self.derive_zones(
            &candles[last_index],
            atr.latest(),
            structure,
            regime.regime,
            verdict.confidence,
            &verdict.reasoning,
        );

        Ok(AnalysisResult {
            structure,
            regime: regime.regime,
            impulse_score: round2(impulse.score),
            confidence: verdict.confidence,
            pivots,
            reasoning: verdict.reasoning,
            zones,
        })
    }

    fn derive_zones(
        &self,
        last: &Candle,
        atr: Option<f64>,
        structure: MarketStructure,
        regime: MarketRegime,
        confidence: f64,
        reasoning: &str,
    ) -> Vec<TradingZone> {
        if !matches!(regime, MarketRegime::Trend | MarketRegime::Expansion) {
            return Vec::new();
        }
        let side = match structure {
            MarketStructure::Bullish => ZoneSide::Buy,
            MarketStructure::Bearish => ZoneSide::Sell,
            MarketStructure::Range => return Vec::new(),
        };
        let Some(atr) = atr.filter(|a| *a > 0.0 && a.is_finite()) else {
            return Vec::new();
        };

        let entry = last.close;
        let stop_dist = self.zones.stop_atr_mult * atr;
        let target_dist = self.zones.target_atr_mult * atr;
        let (stop_loss, profit_target) = match side {
            ZoneSide::Buy => (entry - stop_dist, entry + target_dist),
            ZoneSide::Sell => (entry + stop_dist, entry - target_dist),
        };
        let zone = TradingZone {
            side,
            entry_price: entry,
            profit_target,
            stop_loss,
            confidence,
            reasoning: reasoning.to_string(),
            time: last.time,
        };
        if zone.has_valid_levels() {
            vec![zone]
        } else {
            Vec::new()
        }
    }
}

fn validate(candles: &[Candle]) -> Result<(), EngineError> {
    if candles.len() < MIN_CANDLES {
        return Err(EngineError::InsufficientCandles {
            actual: candles.len(),
            required: MIN_CANDLES,
        });
    }
    for (index, candle) in candles.iter().enumerate() {
        if let Some(reason) = candle.defect() {
            return Err(EngineError::InvalidCandle {
                index,
                reason: reason.to_string(),
            });
        }
        if index > 0 && candle.time <= candles[index - 1].time {
            return Err(EngineError::InvalidCandle {
                index,
                reason: "time must strictly increase".to_string(),
            });
        }
    }
    Ok(())
}
