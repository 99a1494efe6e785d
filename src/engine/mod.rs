//! Market-structure pipeline: ATR -> pivots -> structure -> impulse ->
//! regime -> confidence -> zones. Every stage is a trait with a default
//! implementation so it can be tested or replaced on its own.

pub mod confidence;
pub mod impulse;
pub mod orchestrator;
pub mod pivots;
pub mod regime;
pub mod structure;
pub mod volatility;

pub use confidence::{ConfidenceAggregator, ConfidenceInputs, ConfidenceReading, WeightedConfidence};
pub use impulse::{ImpulseAnalyzer, ImpulseReading, VelocityImpulse};
pub use orchestrator::{MarketStructureEngine, ZonePolicy, MIN_CANDLES};
pub use pivots::{PivotDetector, SwingPivotDetector};
pub use regime::{RegimeClassifier, RegimeInputs, RegimeReading, ThresholdRegime};
pub use structure::{StructureClassifier, SwingStructure};
pub use volatility::{atr_series, VolatilityEstimator, VolatilitySeries, WilderAtr};

/// 1.0, -1.0 or 0.0 by the sign of `v`.
pub(crate) fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
