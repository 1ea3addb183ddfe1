//! Closed indicator key set and the per-family value payloads.
//!
//! The feed transmits indicator payloads as loose JSON objects. They are
//! converted exactly once, at ingestion, into a tagged [`IndicatorValue`] so
//! downstream logic (merge, projection, classification) operates over a closed
//! set of variants instead of duck-typed maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Every indicator key the engine merges. Unknown keys on the wire are
/// silently skipped.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum IndicatorKind {
    #[serde(rename = "EMA50")]
    Ema50,
    #[serde(rename = "EMA200")]
    Ema200,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD")]
    Macd,
    FibonacciBollingerBands,
    #[serde(rename = "VWAP")]
    Vwap,
    BollingerBands,
    CandlestickPatterns,
    OscillatorBands,
    SupportResistance,
    PivotPointsStandard,
    PivotPointsHighLow,
}

impl IndicatorKind {
    /// All keys, in display order.
    pub const ALL: [IndicatorKind; 12] = [
        IndicatorKind::Ema50,
        IndicatorKind::Ema200,
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::FibonacciBollingerBands,
        IndicatorKind::Vwap,
        IndicatorKind::BollingerBands,
        IndicatorKind::CandlestickPatterns,
        IndicatorKind::OscillatorBands,
        IndicatorKind::SupportResistance,
        IndicatorKind::PivotPointsStandard,
        IndicatorKind::PivotPointsHighLow,
    ];

    /// Wire key for this indicator.
    pub fn as_key(&self) -> &'static str {
        match self {
            IndicatorKind::Ema50 => "EMA50",
            IndicatorKind::Ema200 => "EMA200",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::FibonacciBollingerBands => "FibonacciBollingerBands",
            IndicatorKind::Vwap => "VWAP",
            IndicatorKind::BollingerBands => "BollingerBands",
            IndicatorKind::CandlestickPatterns => "CandlestickPatterns",
            IndicatorKind::OscillatorBands => "OscillatorBands",
            IndicatorKind::SupportResistance => "SupportResistance",
            IndicatorKind::PivotPointsStandard => "PivotPointsStandard",
            IndicatorKind::PivotPointsHighLow => "PivotPointsHighLow",
        }
    }

    /// Parse a wire key. Unknown keys yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_key() == key)
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// A single priced reference line belonging to a price-level indicator.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Label {
    #[serde(default)]
    pub id: SmolStr,
    #[serde(default)]
    pub text: String,
    /// Price of the line. Absent or non-numeric on the wire stays `None` and
    /// is discarded by the classifier.
    #[serde(default)]
    pub y: Option<f64>,
    /// Optional renderer style tag (e.g. "label_up" / "label_down").
    #[serde(default)]
    pub style: Option<SmolStr>,
}

/// A vertical band segment (y1..y2) from a band-line indicator.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Line {
    pub y1: f64,
    pub y2: f64,
}

/// Sub-field readings of a scalar/vector indicator, in wire order.
///
/// Sentinel-valued fields are retained here as received; the projection layer
/// owns the filtering.
pub type ScalarValues = IndexMap<SmolStr, f64>;

/// Payload of one indicator key, shaped by its family.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Labels { labels: Vec<Label> },
    Lines { lines: Vec<Line> },
    Scalars(ScalarValues),
}

impl IndicatorValue {
    /// Convert a loose JSON payload into a typed value.
    ///
    /// Permissive by contract: non-object payloads yield `None` (the key is
    /// simply not merged), malformed entries inside label/line arrays are
    /// skipped, and non-numeric scalar fields are ignored.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;

        if let Some(labels) = object.get("labels").and_then(|v| v.as_array()) {
            let labels = labels
                .iter()
                .filter_map(|entry| {
                    let entry = entry.as_object()?;
                    Some(Label {
                        id: entry
                            .get("id")
                            .and_then(|v| v.as_str())
                            .map(SmolStr::new)
                            .unwrap_or_default(),
                        text: entry
                            .get("text")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        y: entry.get("y").and_then(|v| v.as_f64()),
                        style: entry.get("style").and_then(|v| v.as_str()).map(SmolStr::new),
                    })
                })
                .collect();
            return Some(IndicatorValue::Labels { labels });
        }

        if let Some(lines) = object.get("lines").and_then(|v| v.as_array()) {
            let lines = lines
                .iter()
                .filter_map(|entry| {
                    let entry = entry.as_object()?;
                    Some(Line {
                        y1: entry.get("y1").and_then(|v| v.as_f64())?,
                        y2: entry.get("y2").and_then(|v| v.as_f64())?,
                    })
                })
                .collect();
            return Some(IndicatorValue::Lines { lines });
        }

        let scalars: ScalarValues = object
            .iter()
            .filter_map(|(field, v)| v.as_f64().map(|n| (SmolStr::new(field), n)))
            .collect();
        Some(IndicatorValue::Scalars(scalars))
    }

    /// Label list, if this value belongs to a label-set family.
    pub fn labels(&self) -> Option<&[Label]> {
        match self {
            IndicatorValue::Labels { labels } => Some(labels),
            _ => None,
        }
    }

    /// Band lines, if this value belongs to a line-set family.
    pub fn lines(&self) -> Option<&[Line]> {
        match self {
            IndicatorValue::Lines { lines } => Some(lines),
            _ => None,
        }
    }

    /// Scalar sub-field map, if this value belongs to a scalar family.
    pub fn scalars(&self) -> Option<&ScalarValues> {
        match self {
            IndicatorValue::Scalars(values) => Some(values),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_key_round_trip() {
        for kind in IndicatorKind::ALL {
            assert_eq!(IndicatorKind::from_key(kind.as_key()), Some(kind));
        }
        assert_eq!(IndicatorKind::from_key("Ichimoku"), None);
    }

    #[test]
    fn test_from_json_scalars() {
        let value = IndicatorValue::from_json(&json!({"macd": 1.25, "signal": 1.1, "note": "x"}))
            .expect("object payload");

        let scalars = value.scalars().expect("scalar family");
        assert_eq!(scalars.get("macd"), Some(&1.25));
        assert_eq!(scalars.get("signal"), Some(&1.1));
        // non-numeric fields are ignored, not errors
        assert_eq!(scalars.get("note"), None);
    }

    #[test]
    fn test_from_json_labels_keep_missing_y() {
        let value = IndicatorValue::from_json(&json!({
            "labels": [
                {"id": "a", "text": "S 100", "y": 100.0},
                {"id": "b", "text": "detached"},
            ]
        }))
        .expect("label payload");

        let labels = value.labels().expect("label family");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].y, Some(100.0));
        assert_eq!(labels[1].y, None);
    }

    #[test]
    fn test_from_json_lines_skip_malformed() {
        let value = IndicatorValue::from_json(&json!({
            "lines": [
                {"y1": 10.0, "y2": 12.0},
                {"y1": "oops", "y2": 12.0},
                {"y2": 9.0},
            ]
        }))
        .expect("line payload");

        assert_eq!(value.lines(), Some(&[Line { y1: 10.0, y2: 12.0 }][..]));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert_eq!(IndicatorValue::from_json(&json!(64100.2)), None);
        assert_eq!(IndicatorValue::from_json(&json!("EMA50")), None);
        assert_eq!(IndicatorValue::from_json(&json!(null)), None);
    }
}
