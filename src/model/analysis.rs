use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PivotKind {
    High,
    Low,
}

/// A confirmed swing extreme. `index` points into the analysed candle slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    #[serde(rename = "type")]
    pub kind: PivotKind,
    pub price: f64,
    pub index: usize,
    pub time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStructure {
    Bullish,
    Bearish,
    Range,
}

impl fmt::Display for MarketStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bullish => "Bullish",
            Self::Bearish => "Bearish",
            Self::Range => "Range",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketRegime {
    Expansion,
    Compression,
    Trend,
    Range,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Expansion => "EXPANSION",
            Self::Compression => "COMPRESSION",
            Self::Trend => "TREND",
            Self::Range => "RANGE",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneSide {
    Buy,
    Sell,
}

impl fmt::Display for ZoneSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        })
    }
}

/// Entry/target/stop proposal derived from one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingZone {
    #[serde(rename = "type")]
    pub side: ZoneSide,
    pub entry_price: f64,
    pub profit_target: f64,
    pub stop_loss: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub time: i64,
}

/// Identity of a zone across analysis runs: bar time, side and the entry
/// price rounded to hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneKey {
    pub time: i64,
    pub side: ZoneSide,
    pub entry_cents: i64,
}

impl TradingZone {
    pub fn key(&self) -> ZoneKey {
        ZoneKey {
            time: self.time,
            side: self.side,
            entry_cents: (self.entry_price * 100.0).round() as i64,
        }
    }

    /// Whether `price` has already reached the target or the stop.
    pub fn is_hit(&self, price: f64) -> bool {
        match self.side {
            ZoneSide::Buy => price >= self.profit_target || price <= self.stop_loss,
            ZoneSide::Sell => price <= self.profit_target || price >= self.stop_loss,
        }
    }

    /// BUY: stop < entry < target. SELL: target < entry < stop.
    pub fn has_valid_levels(&self) -> bool {
        let finite = [self.entry_price, self.profit_target, self.stop_loss]
            .iter()
            .all(|v| v.is_finite());
        finite
            && match self.side {
                ZoneSide::Buy => {
                    self.stop_loss < self.entry_price && self.entry_price < self.profit_target
                }
                ZoneSide::Sell => {
                    self.profit_target < self.entry_price && self.entry_price < self.stop_loss
                }
            }
    }
}

/// Canonical output of one engine run. Every analysis source, local or
/// remote, must produce this exact shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub structure: MarketStructure,
    pub regime: MarketRegime,
    pub impulse_score: f64,
    pub confidence: f64,
    pub pivots: Vec<Pivot>,
    pub reasoning: String,
    pub zones: Vec<TradingZone>,
}

fn in_score_range(v: f64) -> bool {
    v.is_finite() && (0.0..=100.0).contains(&v)
}

impl AnalysisResult {
    /// Structural checks for payloads that did not come from the local
    /// engine (cache entries, remote signals).
    pub fn is_well_formed(&self) -> bool {
        let pivots_ordered = self
            .pivots
            .windows(2)
            .all(|w| w[0].index < w[1].index && w[0].kind != w[1].kind);
        in_score_range(self.impulse_score)
            && in_score_range(self.confidence)
            && pivots_ordered
            && self.pivots.iter().all(|p| p.price.is_finite())
            && self
                .zones
                .iter()
                .all(|z| z.has_valid_levels() && in_score_range(z.confidence))
    }
}
