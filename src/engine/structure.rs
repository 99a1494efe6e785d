use std::fmt::Debug;

use crate::model::{MarketStructure, Pivot, PivotKind};

pub trait StructureClassifier: Send + Sync + Debug {
    fn classify(&self, pivots: &[Pivot]) -> MarketStructure;
}

/// Higher-high/higher-low versus lower-high/lower-low on the two most
/// recent swings of each kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwingStructure;

impl StructureClassifier for SwingStructure {
    fn classify(&self, pivots: &[Pivot]) -> MarketStructure {
        let (Some((prev_high, last_high)), Some((prev_low, last_low))) = (
            last_two(pivots, PivotKind::High),
            last_two(pivots, PivotKind::Low),
        ) else {
            return MarketStructure::Range;
        };

        if last_high > prev_high && last_low > prev_low {
            MarketStructure::Bullish
        } else if last_high < prev_high && last_low < prev_low {
            MarketStructure::Bearish
        } else {
            MarketStructure::Range
        }
    }
}

/// `(older, newer)` prices of the last two pivots of `kind`.
fn last_two(pivots: &[Pivot], kind: PivotKind) -> Option<(f64, f64)> {
    let mut recent = pivots.iter().rev().filter(|p| p.kind == kind);
    let newer = recent.next()?.price;
    let older = recent.next()?.price;
    Some((older, newer))
}
