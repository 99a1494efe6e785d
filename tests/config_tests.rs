use std::path::Path;
use std::time::Duration;

use structure_engine::config::Config;
use structure_engine::engine::MarketStructureEngine;
use structure_engine::model::Timeframe;

#[test]
fn shipped_default_config_loads() {
    let config = Config::load_from_path(Path::new("config/default.toml")).unwrap();
    assert_eq!(config.binance.rest_base_url, "https://api.binance.com");
    assert_eq!(config.binance.kline_limit, 500);
    assert_eq!(config.binance.request_timeout(), Duration::from_secs(10));
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl(), Duration::from_secs(900));
    assert_eq!(config.engine.atr_period, 14);
    assert_eq!(config.engine.pivot_lookback, 3);
    assert!((config.engine.stop_atr_mult - 1.5).abs() < f64::EPSILON);
    assert!((config.engine.target_atr_mult - 3.0).abs() < f64::EPSILON);
    assert_eq!(
        config.tracker.market().unwrap(),
        ("BTCUSDT".to_string(), Timeframe::M1)
    );
    assert_eq!(config.tracker.poll_interval(), Duration::from_secs(15));
    assert_eq!(config.tracker.signals_base_url(), None);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn optional_sections_fall_back_to_defaults() {
    let toml_str = r#"
[binance]
rest_base_url = "https://api.binance.com"
kline_limit = 200

[server]
bind_addr = "127.0.0.1:9000"

[tracker]
symbol = "ethusdt"
timeframe = "4H"
poll_interval_secs = 0
signals_base_url = "http://localhost:9000"

[logging]
level = "warn"
json = true
"#;
    let config = Config::from_toml(toml_str).unwrap();
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl_secs, 900);
    assert_eq!(config.engine.impulse_window, 20);
    assert_eq!(
        config.tracker.market().unwrap(),
        ("ETHUSDT".to_string(), Timeframe::H4)
    );
    // A zero interval would spin; it is clamped to one second.
    assert_eq!(config.tracker.poll_interval(), Duration::from_secs(1));
    assert_eq!(
        config.tracker.signals_base_url(),
        Some("http://localhost:9000")
    );
    assert!(config.logging.json);

    // The engine accepts whatever the config section holds.
    let _engine = MarketStructureEngine::from_config(&config.engine);
}

#[test]
fn invalid_values_are_rejected() {
    let base = r#"
[binance]
rest_base_url = "https://api.binance.com"
kline_limit = 500

[server]
bind_addr = "127.0.0.1:9000"

[tracker]
symbol = "BTCUSDT"
timeframe = "1m"
poll_interval_secs = 15

[logging]
level = "info"
"#;
    assert!(Config::from_toml(base).is_ok());
    assert!(Config::from_toml(&base.replace("BTCUSDT", "BTC/USDT")).is_err());
    assert!(Config::from_toml(&base.replace("kline_limit = 500", "kline_limit = 5000")).is_err());
    assert!(Config::from_toml(&base.replace(
        "poll_interval_secs = 15",
        "poll_interval_secs = 15\nsignals_base_url = \"::nope\""
    ))
    .is_err());
    assert!(Config::load_from_path(Path::new("config/missing.toml")).is_err());
}
