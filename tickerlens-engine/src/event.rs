//! Inbound feed event contract.
//!
//! Two event shapes arrive on the same channel as JSON text frames:
//!
//! - a full open-position snapshot: `{"symbols": [...]}`
//! - a partial indicator update: `{"symbol": "...", "timeframe": "...", ...}`
//!
//! Updates carry indicator payloads either in a generic `indicators` bag or as
//! legacy top-level fields keyed by the indicator name. Both forms are loose
//! JSON here; conversion into typed [`IndicatorValue`]s happens lazily via
//! [`IndicatorUpdate::indicator_payloads`].

use crate::indicator::{IndicatorKind, IndicatorValue};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Discriminated inbound event. Snapshot first: it is the only shape carrying
/// a `symbols` list, so untagged resolution is unambiguous.
#[derive(Clone, Debug, Deserialize, Serialize, derive_more::From)]
#[serde(untagged)]
pub enum FeedEvent {
    PositionSnapshot(PositionSnapshot),
    IndicatorUpdate(IndicatorUpdate),
}

/// Full replacement of the open-position list.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PositionSnapshot {
    pub symbols: Vec<Position>,
}

/// One open position. Ephemeral: wholly superseded by the next snapshot.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: SmolStr,
    pub symbol: SmolStr,
    pub entry_price: f64,
    pub side: PositionSide,
}

/// Position direction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "Long",
            PositionSide::Short => "Short",
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, PositionSide::Long)
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partial indicator update for one (symbol, timeframe) pair.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IndicatorUpdate {
    pub symbol: SmolStr,
    pub timeframe: SmolStr,
    #[serde(default, rename = "marketPrice", skip_serializing_if = "Option::is_none")]
    pub market_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Generic indicator bag: key → loose payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicators: Option<serde_json::Map<String, serde_json::Value>>,
    /// Legacy top-level indicator fields, captured verbatim. Only keys in the
    /// closed [`IndicatorKind`] set are ever merged.
    #[serde(flatten)]
    pub legacy: serde_json::Map<String, serde_json::Value>,
}

impl IndicatorUpdate {
    /// Extract every mergeable (key, value) pair carried by this update.
    ///
    /// The generic bag is yielded before the legacy fields, so on a same-key
    /// collision within one event the legacy field wins at merge time.
    /// Unknown keys and non-object payloads are skipped.
    pub fn indicator_payloads(&self) -> Vec<(IndicatorKind, IndicatorValue)> {
        let bag = self
            .indicators
            .iter()
            .flat_map(|indicators| indicators.iter());
        let legacy = self.legacy.iter();

        bag.chain(legacy)
            .filter_map(|(key, payload)| {
                let kind = IndicatorKind::from_key(key)?;
                let value = IndicatorValue::from_json(payload)?;
                Some((kind, value))
            })
            .collect()
    }
}
