//! Canonical timeframe tokens and the discovered-timeframe registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;

/// Closed set of chart timeframes the view knows how to order.
///
/// The derived `Ord` follows declaration order, which is the canonical display
/// order: intraday first, then daily and weekly.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize,
)]
pub enum Timeframe {
    /// 15 minutes
    #[serde(rename = "15")]
    M15,
    /// 1 hour
    #[serde(rename = "60")]
    H1,
    /// 4 hours
    #[serde(rename = "240")]
    H4,
    /// 1 day
    #[serde(rename = "1D")]
    D1,
    /// 1 week
    #[serde(rename = "1W")]
    W1,
}

impl Timeframe {
    /// All timeframes in canonical display order.
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
    ];

    /// Wire token for this timeframe.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15",
            Timeframe::H1 => "60",
            Timeframe::H4 => "240",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
        }
    }

    /// Human label for headers ("15m", "1h", ...).
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
        }
    }

    /// Parse a wire token. Unknown tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "15" => Some(Timeframe::M15),
            "60" => Some(Timeframe::H1),
            "240" => Some(Timeframe::H4),
            "1D" => Some(Timeframe::D1),
            "1W" => Some(Timeframe::W1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of timeframes seen on the feed so far, produced in canonical order.
///
/// Tokens outside the canonical set are dropped on observation, not merely
/// left unsorted: they must never appear in the displayed sequence.
#[derive(Debug, Clone, Default)]
pub struct TimeframeRegistry {
    seen: BTreeSet<Timeframe>,
}

impl TimeframeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a timeframe token from an inbound update. Observing the same
    /// token twice is a no-op after the first insertion.
    pub fn observe(&mut self, token: &str) {
        match Timeframe::from_token(token) {
            Some(tf) => {
                self.seen.insert(tf);
            }
            None => trace!(%token, "dropping unknown timeframe token"),
        }
    }

    /// Observed timeframes in canonical order.
    pub fn ordered(&self) -> Vec<Timeframe> {
        self.seen.iter().copied().collect()
    }

    pub fn contains(&self, tf: Timeframe) -> bool {
        self.seen.contains(&tf)
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_order_is_irrelevant() {
        let mut registry = TimeframeRegistry::new();
        registry.observe("1D");
        registry.observe("15");
        registry.observe("240");

        let ordered: Vec<&str> = registry.ordered().iter().map(|tf| tf.as_str()).collect();
        assert_eq!(ordered, vec!["15", "240", "1D"]);
    }

    #[test]
    fn test_unknown_tokens_never_surface() {
        let mut registry = TimeframeRegistry::new();
        registry.observe("5");
        registry.observe("60");
        registry.observe("3M");

        let ordered: Vec<&str> = registry.ordered().iter().map(|tf| tf.as_str()).collect();
        assert_eq!(ordered, vec!["60"]);
    }

    #[test]
    fn test_observe_is_idempotent() {
        let mut registry = TimeframeRegistry::new();
        registry.observe("1W");
        registry.observe("1W");
        registry.observe("1W");

        assert_eq!(registry.ordered(), vec![Timeframe::W1]);
    }

    #[test]
    fn test_token_round_trip() {
        for tf in Timeframe::ALL {
            assert_eq!(Timeframe::from_token(tf.as_str()), Some(tf));
        }
    }
}
