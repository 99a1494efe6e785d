use std::fmt::Debug;

use super::sign;
use crate::model::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseReading {
    /// Saturating 0-100 strength of the latest move.
    pub score: f64,
    /// Sign of the net displacement: 1.0 up, -1.0 down, 0.0 flat.
    pub direction: f64,
}

pub trait ImpulseAnalyzer: Send + Sync + Debug {
    fn analyze(&self, candles: &[Candle], latest_atr: Option<f64>) -> ImpulseReading;
}

/// Net displacement over the trailing window in units of `ATR * sqrt(N)`,
/// squashed through `tanh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityImpulse {
    window: usize,
}

impl VelocityImpulse {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Default for VelocityImpulse {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ImpulseAnalyzer for VelocityImpulse {
    fn analyze(&self, candles: &[Candle], latest_atr: Option<f64>) -> ImpulseReading {
        let window = self.window.min(candles.len());
        if window == 0 {
            return ImpulseReading {
                score: 0.0,
                direction: 0.0,
            };
        }
        let recent = &candles[candles.len() - window..];
        let displacement = recent[window - 1].close - recent[0].open;
        let direction = sign(displacement);

        let score = match latest_atr {
            Some(atr) if atr > 0.0 && atr.is_finite() => {
                let velocity = displacement.abs() / (atr * (window as f64).sqrt());
                (100.0 * velocity.tanh()).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };
        ImpulseReading { score, direction }
    }
}
