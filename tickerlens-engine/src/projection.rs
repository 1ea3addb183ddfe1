//! Scalar indicator projection.
//!
//! Each scalar/vector indicator surfaces a fixed allow-list of sub-fields.
//! Fields present in the payload but not listed are ignored; listed fields
//! holding the sentinel are skipped. The table below is a contract the view
//! reproduces verbatim: changing it silently adds or removes columns.

use crate::indicator::{IndicatorKind, IndicatorValue};
use crate::sentinel::is_sentinel;

/// Allow-listed sub-fields for a scalar indicator key. Label- and line-set
/// families project nothing.
pub fn allowed_fields(kind: IndicatorKind) -> &'static [&'static str] {
    match kind {
        IndicatorKind::Ema50 | IndicatorKind::Ema200 => &["ema"],
        IndicatorKind::Rsi => &["rsi", "rsiMA"],
        IndicatorKind::Macd => &["macd", "signal", "histogram"],
        IndicatorKind::FibonacciBollingerBands => &[
            "basis", "upper1", "upper2", "upper3", "lower1", "lower2", "lower3",
        ],
        IndicatorKind::Vwap => &["vwap", "upperBand", "lowerBand"],
        IndicatorKind::BollingerBands => &["upper", "basis", "lower"],
        IndicatorKind::CandlestickPatterns
        | IndicatorKind::OscillatorBands
        | IndicatorKind::SupportResistance
        | IndicatorKind::PivotPointsStandard
        | IndicatorKind::PivotPointsHighLow => &[],
    }
}

/// One surfaced sub-field reading.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarReading {
    pub field: &'static str,
    pub value: f64,
}

/// Project a stored value through its key's allow-list, in allow-list order.
pub fn project_scalars(kind: IndicatorKind, value: &IndicatorValue) -> Vec<ScalarReading> {
    let Some(scalars) = value.scalars() else {
        return Vec::new();
    };

    allowed_fields(kind)
        .iter()
        .filter_map(|field| {
            let value = scalars.get(*field).copied()?;
            (!is_sentinel(value)).then_some(ScalarReading { field, value })
        })
        .collect()
}
