use std::fmt;

use serde::{Deserialize, Serialize};

/// Candle intervals the analysis endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// Parse a timeframe label. Surrounding whitespace and case are ignored,
    /// so the chart's "1D" maps to "1d".
    pub fn parse(raw: &str) -> Option<Self> {
        let label = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|tf| tf.as_str() == label)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim and upper-case a trading symbol; `None` when it is not 2-20 ASCII
/// alphanumerics.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid = (2..=20).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(symbol)
}

/// Key under which an analysis result is cached: `BTCUSDT:1h`.
pub fn cache_key(symbol: &str, timeframe: Timeframe) -> String {
    format!("{}:{}", symbol, timeframe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_supported_labels() {
        assert_eq!(Timeframe::parse("1m"), Some(Timeframe::M1));
        assert_eq!(Timeframe::parse(" 15m "), Some(Timeframe::M15));
        assert_eq!(Timeframe::parse("1D"), Some(Timeframe::D1));
        assert_eq!(Timeframe::parse("4H"), Some(Timeframe::H4));
    }

    #[test]
    fn parse_rejects_unsupported_labels() {
        assert_eq!(Timeframe::parse(""), None);
        assert_eq!(Timeframe::parse("2h"), None);
        assert_eq!(Timeframe::parse("1w"), None);
    }

    #[test]
    fn serde_uses_wire_labels() {
        assert_eq!(serde_json::to_string(&Timeframe::H1).unwrap(), "\"1h\"");
        let tf: Timeframe = serde_json::from_str("\"5m\"").unwrap();
        assert_eq!(tf, Timeframe::M5);
    }

    #[test]
    fn symbol_normalization() {
        assert_eq!(normalize_symbol(" btcusdt "), Some("BTCUSDT".to_string()));
        assert_eq!(normalize_symbol("B"), None);
        assert_eq!(normalize_symbol("BTC/USDT"), None);
        assert_eq!(normalize_symbol(""), None);
        assert_eq!(cache_key("ETHUSDT", Timeframe::M15), "ETHUSDT:15m");
    }
}
