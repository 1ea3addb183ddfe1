//! Open-position book, rebuilt wholesale from each snapshot.

use crate::event::{Position, PositionSnapshot};

/// Current open positions split by side. There is no partial update path:
/// every snapshot is authoritative and wholly supersedes the previous one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionBook {
    pub buy: Vec<Position>,
    pub sell: Vec<Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both lists from a full snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &PositionSnapshot) {
        self.buy = snapshot
            .symbols
            .iter()
            .filter(|position| position.side.is_long())
            .cloned()
            .collect();
        self.sell = snapshot
            .symbols
            .iter()
            .filter(|position| !position.side.is_long())
            .cloned()
            .collect();
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty() && self.sell.is_empty()
    }

    pub fn clear(&mut self) {
        self.buy.clear();
        self.sell.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> PositionSnapshot {
        serde_json::from_value(value).expect("valid snapshot")
    }

    #[test]
    fn test_snapshot_splits_by_side() {
        let mut book = PositionBook::new();
        book.apply_snapshot(&snapshot(json!({
            "symbols": [
                {"id": "1", "symbol": "BTCUSDT", "entryPrice": 64210.5, "side": "long"},
                {"id": "2", "symbol": "ETHUSDT", "entryPrice": 3310.0, "side": "short"},
                {"id": "3", "symbol": "SOLUSDT", "entryPrice": 141.2, "side": "long"},
            ]
        })));

        assert_eq!(book.buy.len(), 2);
        assert_eq!(book.sell.len(), 1);
        assert_eq!(book.sell[0].symbol, "ETHUSDT");
    }

    #[test]
    fn test_snapshot_fully_replaces_previous() {
        let mut book = PositionBook::new();
        book.apply_snapshot(&snapshot(json!({
            "symbols": [
                {"id": "1", "symbol": "BTCUSDT", "entryPrice": 64210.5, "side": "short"},
            ]
        })));
        book.apply_snapshot(&snapshot(json!({
            "symbols": [
                {"id": "2", "symbol": "ETHUSDT", "entryPrice": 3310.0, "side": "long"},
            ]
        })));

        // full replace: nothing accumulates across snapshots
        assert_eq!(book.buy.len(), 1);
        assert_eq!(book.buy[0].id, "2");
        assert!(book.sell.is_empty());
    }

    #[test]
    fn test_empty_snapshot_clears_book() {
        let mut book = PositionBook::new();
        book.apply_snapshot(&snapshot(json!({
            "symbols": [
                {"id": "1", "symbol": "BTCUSDT", "entryPrice": 64210.5, "side": "long"},
            ]
        })));
        book.apply_snapshot(&snapshot(json!({"symbols": []})));

        assert!(book.is_empty());
    }
}
