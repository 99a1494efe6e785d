pub mod analysis;
pub mod candle;
pub mod timeframe;

pub use analysis::{
    AnalysisResult, MarketRegime, MarketStructure, Pivot, PivotKind, TradingZone, ZoneKey,
    ZoneSide,
};
pub use candle::Candle;
pub use timeframe::{cache_key, normalize_symbol, Timeframe};
