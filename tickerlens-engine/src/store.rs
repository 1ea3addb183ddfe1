//! Nested symbol → timeframe → indicator store and the per-symbol price map.
//!
//! Merge semantics: key-wise last-write-wins. An incoming payload fully
//! replaces the stored value for each indicator key it carries and leaves
//! every other key of the cell untouched. Applying the same update twice is
//! observationally a no-op.

use crate::event::IndicatorUpdate;
use crate::indicator::{IndicatorKind, IndicatorValue};
use crate::sentinel::valid_value;
use indexmap::IndexMap;
use itertools::Itertools;
use smol_str::SmolStr;
use std::collections::HashMap;
use tracing::trace;

/// All indicator values received so far for one (symbol, timeframe) pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeframeCell {
    pub symbol: SmolStr,
    pub timeframe: SmolStr,
    /// Union of every indicator key ever received for this pair, each holding
    /// the most recently received value. Insertion order = discovery order.
    pub indicators: IndexMap<IndicatorKind, IndicatorValue>,
}

impl TimeframeCell {
    fn seed(symbol: SmolStr, timeframe: SmolStr) -> Self {
        Self {
            symbol,
            timeframe,
            indicators: IndexMap::new(),
        }
    }
}

/// The nested indicator store.
#[derive(Debug, Default)]
pub struct IndicatorStore {
    cells: HashMap<SmolStr, HashMap<SmolStr, TimeframeCell>>,
}

impl IndicatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one update into its (symbol, timeframe) cell, creating the cell
    /// on first sight.
    pub fn apply(&mut self, update: &IndicatorUpdate) {
        let payloads = update.indicator_payloads();
        if payloads.is_empty() {
            return;
        }

        let cell = self
            .cells
            .entry(update.symbol.clone())
            .or_default()
            .entry(update.timeframe.clone())
            .or_insert_with(|| TimeframeCell::seed(update.symbol.clone(), update.timeframe.clone()));

        for (kind, value) in payloads {
            trace!(symbol = %update.symbol, timeframe = %update.timeframe, %kind, "merging indicator");
            cell.indicators.insert(kind, value);
        }
    }

    /// The cell for a (symbol, timeframe) pair, if any update has seeded it.
    pub fn cell(&self, symbol: &str, timeframe: &str) -> Option<&TimeframeCell> {
        self.cells.get(symbol)?.get(timeframe)
    }

    /// Latest value for one indicator key of a (symbol, timeframe) pair.
    pub fn indicator(
        &self,
        symbol: &str,
        timeframe: &str,
        kind: IndicatorKind,
    ) -> Option<&IndicatorValue> {
        self.cell(symbol, timeframe)?.indicators.get(&kind)
    }

    /// Symbols with at least one stored cell, in lexical order.
    pub fn symbols(&self) -> Vec<SmolStr> {
        self.cells.keys().cloned().sorted().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// Latest market price and volume per symbol.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MarketTick {
    pub price: f64,
    pub volume: f64,
}

/// Per-symbol price map. Each field is independently last-write-wins: an
/// update that omits one field preserves the other's previous value.
#[derive(Debug, Default)]
pub struct MarketPrices {
    ticks: HashMap<SmolStr, MarketTick>,
}

impl MarketPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, symbol: &SmolStr, price: Option<f64>, volume: Option<f64>) {
        let price = valid_value(price);
        let volume = valid_value(volume);
        if price.is_none() && volume.is_none() {
            return;
        }

        let tick = self.ticks.entry(symbol.clone()).or_default();
        if let Some(price) = price {
            tick.price = price;
        }
        if let Some(volume) = volume {
            tick.volume = volume;
        }
    }

    pub fn tick(&self, symbol: &str) -> Option<MarketTick> {
        self.ticks.get(symbol).copied()
    }

    /// Last known price, or 0.0 while the feed is still warming up.
    pub fn last_price(&self, symbol: &str) -> f64 {
        self.ticks.get(symbol).map(|tick| tick.price).unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }
}
