use structure_engine::model::{AnalysisResult, MarketRegime, MarketStructure, TradingZone, ZoneSide};
use structure_engine::tracker::{StructureChange, ZoneLifecycleTracker};

fn buy(entry: f64, target: f64, stop: f64, time: i64) -> TradingZone {
    TradingZone {
        side: ZoneSide::Buy,
        entry_price: entry,
        profit_target: target,
        stop_loss: stop,
        confidence: 70.0,
        reasoning: "Bullish structure in a TREND regime".to_string(),
        time,
    }
}

fn sell(entry: f64, target: f64, stop: f64, time: i64) -> TradingZone {
    TradingZone {
        side: ZoneSide::Sell,
        entry_price: entry,
        profit_target: target,
        stop_loss: stop,
        confidence: 55.0,
        reasoning: "Bearish structure in a TREND regime".to_string(),
        time,
    }
}

fn analysis(structure: MarketStructure, zones: Vec<TradingZone>) -> AnalysisResult {
    AnalysisResult {
        structure,
        regime: MarketRegime::Trend,
        impulse_score: 42.0,
        confidence: 61.5,
        pivots: Vec::new(),
        reasoning: format!("{} structure", structure),
        zones,
    }
}

#[test]
fn buy_zone_removed_once_target_is_hit() {
    let mut tracker = ZoneLifecycleTracker::new();
    let zone = buy(100.0, 110.0, 95.0, 1_700_000_000);
    assert_eq!(tracker.reconcile(&[zone.clone()], 0.0), vec![zone]);

    let zones = tracker.reconcile(&[], 111.0);
    assert!(zones.is_empty());
    assert!(tracker.current_zones().is_empty());
}

#[test]
fn buy_zone_removed_when_stop_is_hit() {
    let mut tracker = ZoneLifecycleTracker::new();
    tracker.reconcile(&[buy(100.0, 110.0, 95.0, 1)], 0.0);
    assert!(tracker.reconcile(&[], 95.0).is_empty());
}

#[test]
fn sell_zone_hit_rules_mirror_buy() {
    let mut tracker = ZoneLifecycleTracker::new();
    tracker.reconcile(&[sell(100.0, 90.0, 105.0, 1)], 0.0);
    assert_eq!(tracker.reconcile(&[], 98.0).len(), 1);
    assert!(tracker.reconcile(&[], 90.0).is_empty());

    tracker.reconcile(&[sell(100.0, 90.0, 105.0, 2)], 0.0);
    assert!(tracker.reconcile(&[], 106.0).is_empty());
}

#[test]
fn untouched_zone_is_retained_and_same_key_ignored() {
    let mut tracker = ZoneLifecycleTracker::new();
    let original = buy(100.0, 110.0, 95.0, 1_700_000_000);
    tracker.reconcile(&[original.clone()], 0.0);

    // Same time, side and entry (to the cent) but different levels.
    let same_key = TradingZone {
        entry_price: 100.001,
        profit_target: 112.0,
        stop_loss: 96.0,
        confidence: 99.0,
        ..original.clone()
    };
    let zones = tracker.reconcile(&[same_key], 105.0);
    assert_eq!(zones, vec![original.clone()]);

    let other = buy(101.0, 109.0, 96.0, 1_700_000_060);
    let zones = tracker.reconcile(&[other.clone()], 105.0);
    assert_eq!(zones.len(), 2);
    assert!(zones.contains(&original));
    assert!(zones.contains(&other));
}

#[test]
fn stale_fresh_zone_is_not_locked_when_price_known() {
    let mut tracker = ZoneLifecycleTracker::new();
    let zones = tracker.reconcile(&[buy(100.0, 110.0, 95.0, 1)], 120.0);
    assert!(zones.is_empty());
}

#[test]
fn unknown_price_retains_and_locks() {
    let mut tracker = ZoneLifecycleTracker::new();
    tracker.reconcile(&[buy(100.0, 110.0, 95.0, 1)], 0.0);
    let zones = tracker.reconcile(&[sell(100.0, 90.0, 105.0, 2)], 0.0);
    assert_eq!(zones.len(), 2);
}

#[test]
fn structure_change_reported_once() {
    let mut tracker = ZoneLifecycleTracker::new();
    let first = tracker.apply(&analysis(MarketStructure::Bullish, Vec::new()), 0.0);
    assert_eq!(first.structure_change, None);

    let repeat = tracker.apply(&analysis(MarketStructure::Bullish, Vec::new()), 0.0);
    assert_eq!(repeat.structure_change, None);

    let flip = tracker.apply(&analysis(MarketStructure::Bearish, Vec::new()), 0.0);
    assert_eq!(
        flip.structure_change,
        Some(StructureChange {
            from: MarketStructure::Bullish,
            to: MarketStructure::Bearish,
        })
    );

    let settled = tracker.apply(&analysis(MarketStructure::Bearish, Vec::new()), 0.0);
    assert_eq!(settled.structure_change, None);
}

#[test]
fn apply_publishes_view_and_counts() {
    let mut tracker = ZoneLifecycleTracker::new();
    let update = tracker.apply(
        &analysis(MarketStructure::Bullish, vec![buy(100.0, 110.0, 95.0, 1)]),
        102.0,
    );
    assert_eq!(update.added, 1);
    assert_eq!(update.removed, 0);
    assert_eq!(update.view.structure, Some(MarketStructure::Bullish));
    assert_eq!(update.view.regime, Some(MarketRegime::Trend));
    assert_eq!(update.view.confidence, Some(61.5));
    assert_eq!(update.view.zones.len(), 1);
    assert_eq!(tracker.view(), &update.view);

    let update = tracker.apply(&analysis(MarketStructure::Bullish, Vec::new()), 111.0);
    assert_eq!(update.removed, 1);
    assert!(update.view.zones.is_empty());
}

#[test]
fn reset_forgets_zones_on_market_switch() {
    let mut tracker = ZoneLifecycleTracker::new();
    tracker.apply(
        &analysis(MarketStructure::Bullish, vec![buy(100.0, 110.0, 95.0, 1)]),
        0.0,
    );
    tracker.reset();
    assert!(tracker.current_zones().is_empty());
    // No transition is reported against the previous market's structure.
    let update = tracker.apply(&analysis(MarketStructure::Bearish, Vec::new()), 0.0);
    assert_eq!(update.structure_change, None);
}
