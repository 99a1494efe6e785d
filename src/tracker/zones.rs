use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AnalysisResult, MarketRegime, MarketStructure, TradingZone, ZoneKey};

/// What the rendering layer reads after each reconciliation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneView {
    pub zones: Vec<TradingZone>,
    pub structure: Option<MarketStructure>,
    pub regime: Option<MarketRegime>,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureChange {
    pub from: MarketStructure,
    pub to: MarketStructure,
}

/// Result of feeding one analysis into the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerUpdate {
    pub view: ZoneView,
    pub structure_change: Option<StructureChange>,
    pub removed: usize,
    pub added: usize,
}

/// A price that is zero, negative or not finite is treated as unknown.
fn known_price(price: f64) -> Option<f64> {
    (price.is_finite() && price > 0.0).then_some(price)
}

/// Client-side zone state. Locked zones stay put until price hits their
/// target or stop, or the market is switched.
#[derive(Debug, Default)]
pub struct ZoneLifecycleTracker {
    locked: BTreeMap<ZoneKey, TradingZone>,
    last_structure: Option<MarketStructure>,
    view: ZoneView,
}

impl ZoneLifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; used on symbol or timeframe change.
    pub fn reset(&mut self) {
        self.locked.clear();
        self.last_structure = None;
        self.view = ZoneView::default();
    }

    /// Drop hit zones, lock unseen fresh ones, and return the locked set.
    pub fn reconcile(&mut self, fresh: &[TradingZone], current_price: f64) -> Vec<TradingZone> {
        self.reconcile_counted(fresh, current_price);
        self.current_zones()
    }

    fn reconcile_counted(&mut self, fresh: &[TradingZone], current_price: f64) -> (usize, usize) {
        let price = known_price(current_price);

        let before = self.locked.len();
        if let Some(p) = price {
            self.locked.retain(|_, zone| !zone.is_hit(p));
        }
        let removed = before - self.locked.len();

        let mut added = 0;
        for zone in fresh {
            let key = zone.key();
            if self.locked.contains_key(&key) {
                continue;
            }
            if price.is_some_and(|p| zone.is_hit(p)) {
                continue;
            }
            self.locked.insert(key, zone.clone());
            added += 1;
        }
        (removed, added)
    }

    pub fn current_zones(&self) -> Vec<TradingZone> {
        self.locked.values().cloned().collect()
    }

    /// Record `structure`; returns the transition when it differs from the
    /// previously observed one. The first observation never notifies.
    pub fn observe_structure(&mut self, structure: MarketStructure) -> Option<StructureChange> {
        let previous = self.last_structure.replace(structure)?;
        (previous != structure).then_some(StructureChange {
            from: previous,
            to: structure,
        })
    }

    pub fn apply(&mut self, result: &AnalysisResult, current_price: f64) -> TrackerUpdate {
        let (removed, added) = self.reconcile_counted(&result.zones, current_price);
        let structure_change = self.observe_structure(result.structure);
        self.view = ZoneView {
            zones: self.current_zones(),
            structure: Some(result.structure),
            regime: Some(result.regime),
            confidence: Some(result.confidence),
            reasoning: Some(result.reasoning.clone()),
        };
        TrackerUpdate {
            view: self.view.clone(),
            structure_change,
            removed,
            added,
        }
    }

    pub fn view(&self) -> &ZoneView {
        &self.view
    }

    pub fn locked_count(&self) -> usize {
        self.locked.len()
    }
}
