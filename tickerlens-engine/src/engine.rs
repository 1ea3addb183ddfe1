//! The owned aggregation engine.
//!
//! One instance owns the indicator store, the price map, the timeframe
//! registry and the position book. Events mutate it via `&mut self`, reads go
//! through `&self`; callers that share it across tasks wrap it in their own
//! lock. There is no global state.
//!
//! Every method is best-effort by contract: malformed payloads, unknown
//! timeframe tokens and sentinel values are tolerated silently, never raised.

use crate::event::{FeedEvent, IndicatorUpdate, PositionSnapshot};
use crate::indicator::{IndicatorKind, IndicatorValue};
use crate::level::{ClassifiedLevels, Direction, classify_levels, family_for};
use crate::position::PositionBook;
use crate::store::{IndicatorStore, MarketPrices, MarketTick};
use crate::timeframe::{Timeframe, TimeframeRegistry};
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use tracing::debug;

#[derive(Debug, Default)]
pub struct AggregationEngine {
    store: IndicatorStore,
    prices: MarketPrices,
    timeframes: TimeframeRegistry,
    positions: PositionBook,
    last_update: Option<DateTime<Utc>>,
}

impl AggregationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the engine to its empty startup state. Reset policy is owned by
    /// the transport collaborator; the engine never clears itself.
    pub fn reset(&mut self) {
        debug!("resetting aggregation engine");
        self.store.clear();
        self.prices.clear();
        self.timeframes.clear();
        self.positions.clear();
        self.last_update = None;
    }

    /// Apply one inbound event. Synchronous and atomic relative to reads.
    pub fn apply(&mut self, event: &FeedEvent) {
        match event {
            FeedEvent::PositionSnapshot(snapshot) => self.apply_position_snapshot(snapshot),
            FeedEvent::IndicatorUpdate(update) => self.apply_indicator_update(update),
        }
        self.last_update = Some(Utc::now());
    }

    fn apply_position_snapshot(&mut self, snapshot: &PositionSnapshot) {
        debug!(positions = snapshot.symbols.len(), "replacing position book");
        self.positions.apply_snapshot(snapshot);
    }

    fn apply_indicator_update(&mut self, update: &IndicatorUpdate) {
        self.timeframes.observe(&update.timeframe);
        self.prices
            .apply(&update.symbol, update.market_price, update.volume);
        self.store.apply(update);
    }

    /// Latest stored value for one indicator key of a (symbol, timeframe).
    pub fn indicator_value(
        &self,
        symbol: &str,
        timeframe: &str,
        kind: IndicatorKind,
    ) -> Option<&IndicatorValue> {
        self.store.indicator(symbol, timeframe, kind)
    }

    /// Timeframes observed so far, in canonical display order.
    pub fn ordered_timeframes(&self) -> Vec<Timeframe> {
        self.timeframes.ordered()
    }

    /// Classified price levels for a level-capable indicator, using the key's
    /// default family. Keys without a level family, or with no stored labels,
    /// yield the unavailable marker.
    pub fn classified_levels(
        &self,
        symbol: &str,
        timeframe: &str,
        kind: IndicatorKind,
        current_price: f64,
    ) -> ClassifiedLevels {
        let direction = family_for(kind)
            .map(|family| family.direction)
            .unwrap_or(Direction::Both);
        self.classified_levels_for(symbol, timeframe, kind, current_price, direction)
    }

    /// Same as [`classified_levels`](Self::classified_levels), produced for a
    /// single side of the book (split support/resistance views).
    pub fn classified_levels_for(
        &self,
        symbol: &str,
        timeframe: &str,
        kind: IndicatorKind,
        current_price: f64,
        direction: Direction,
    ) -> ClassifiedLevels {
        let Some(family) = family_for(kind) else {
            return ClassifiedLevels::Unavailable { direction };
        };
        let family = family.with_direction(direction);

        let labels = self
            .indicator_value(symbol, timeframe, kind)
            .and_then(|value| value.labels());

        match labels {
            Some(labels) => classify_levels(labels, current_price, &family),
            None => ClassifiedLevels::Unavailable { direction },
        }
    }

    /// Current open positions, split buy/sell.
    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    /// Latest market tick for a symbol, if one has arrived.
    pub fn market_tick(&self, symbol: &str) -> Option<MarketTick> {
        self.prices.tick(symbol)
    }

    /// Last known price for a symbol, 0.0 while the feed is warming up.
    pub fn last_price(&self, symbol: &str) -> f64 {
        self.prices.last_price(symbol)
    }

    /// Symbols with stored indicator data, in lexical order.
    pub fn symbols(&self) -> Vec<SmolStr> {
        self.store.symbols()
    }

    /// Wall-clock time of the most recently applied event.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::RowRole;
    use serde_json::json;

    fn event(value: serde_json::Value) -> FeedEvent {
        serde_json::from_value(value).expect("valid feed event")
    }

    fn engine_with_levels() -> AggregationEngine {
        let mut engine = AggregationEngine::new();
        engine.apply(&event(json!({
            "symbol": "BTCUSDT",
            "timeframe": "240",
            "marketPrice": 64500.0,
            "SupportResistance": {"labels": [
                {"id": "s1", "text": "S 63800.0", "y": 63800.0},
                {"id": "r1", "text": "R 64850.0", "y": 64850.0},
            ]},
        })));
        engine
    }

    #[test]
    fn test_apply_routes_both_event_shapes() {
        let mut engine = AggregationEngine::new();
        engine.apply(&event(json!({
            "symbols": [
                {"id": "1", "symbol": "BTCUSDT", "entryPrice": 64000.0, "side": "long"},
            ]
        })));
        engine.apply(&event(json!({
            "symbol": "BTCUSDT",
            "timeframe": "60",
            "marketPrice": 64500.0,
            "RSI": {"rsi": 55.0},
        })));

        assert_eq!(engine.positions().buy.len(), 1);
        assert_eq!(engine.ordered_timeframes(), vec![Timeframe::H1]);
        assert_eq!(engine.last_price("BTCUSDT"), 64500.0);
        assert!(
            engine
                .indicator_value("BTCUSDT", "60", IndicatorKind::Rsi)
                .is_some()
        );
        assert!(engine.last_update().is_some());
    }

    #[test]
    fn test_classified_levels_use_stored_labels() {
        let engine = engine_with_levels();
        let classified =
            engine.classified_levels("BTCUSDT", "240", IndicatorKind::SupportResistance, 64500.0);

        let roles: Vec<RowRole> = classified
            .rows()
            .expect("rows")
            .iter()
            .map(|row| row.role)
            .collect();
        assert_eq!(
            roles,
            vec![RowRole::Resistance, RowRole::CurrentPrice, RowRole::Support]
        );
    }

    #[test]
    fn test_levels_unavailable_for_scalar_keys_and_missing_cells() {
        let engine = engine_with_levels();

        let scalar = engine.classified_levels("BTCUSDT", "240", IndicatorKind::Rsi, 64500.0);
        assert!(scalar.rows().is_none());

        let missing =
            engine.classified_levels("ETHUSDT", "240", IndicatorKind::SupportResistance, 64500.0);
        assert!(missing.rows().is_none());
    }

    #[test]
    fn test_unknown_timeframe_is_stored_but_never_ordered() {
        let mut engine = AggregationEngine::new();
        engine.apply(&event(json!({
            "symbol": "BTCUSDT",
            "timeframe": "5",
            "RSI": {"rsi": 50.0},
        })));

        assert!(engine.ordered_timeframes().is_empty());
        // the merge itself still happened; only the ordering drops the token
        assert!(
            engine
                .indicator_value("BTCUSDT", "5", IndicatorKind::Rsi)
                .is_some()
        );
    }

    #[test]
    fn test_reset_restores_startup_state() {
        let mut engine = engine_with_levels();
        engine.reset();

        assert!(engine.symbols().is_empty());
        assert!(engine.ordered_timeframes().is_empty());
        assert!(engine.positions().is_empty());
        assert_eq!(engine.last_price("BTCUSDT"), 0.0);
        assert!(engine.last_update().is_none());
    }
}
