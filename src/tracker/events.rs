use chrono::{DateTime, Utc};

use crate::model::{MarketStructure, Timeframe};

use super::zones::ZoneView;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// Zones were reconciled against a fresh analysis.
    Updated {
        symbol: String,
        timeframe: Timeframe,
        view: ZoneView,
        removed: usize,
        added: usize,
        at: DateTime<Utc>,
    },
    StructureChanged {
        symbol: String,
        timeframe: Timeframe,
        from: MarketStructure,
        to: MarketStructure,
        at: DateTime<Utc>,
    },
    /// The analysis fetch failed; tracker state is unchanged.
    FetchFailed {
        symbol: String,
        timeframe: Timeframe,
        error: String,
        at: DateTime<Utc>,
    },
    /// Tracker state was dropped (disabled or market switched).
    Cleared {
        symbol: String,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    },
}
