//! Price-level classification.
//!
//! Turns the raw label set of a price-level indicator plus the live price into
//! an ordered, role-tagged display sequence with a correctly positioned
//! synthetic "current price" row. Pure data-in/data-out: nothing here knows
//! about rendering.
//!
//! Each indicator family supplies a rule table mapping labels to roles and a
//! direction describing which side(s) of the book the produced list shows.

use crate::indicator::{IndicatorKind, Label};
use crate::sentinel::valid_value;
use smol_str::SmolStr;

/// Role a raw label classifies into.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LevelRole {
    Support,
    Resistance,
    Pivot,
}

/// Role tag of one produced display row; drives presentation color.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RowRole {
    Support,
    Resistance,
    Pivot,
    CurrentPrice,
}

impl From<LevelRole> for RowRole {
    fn from(role: LevelRole) -> Self {
        match role {
            LevelRole::Support => RowRole::Support,
            LevelRole::Resistance => RowRole::Resistance,
            LevelRole::Pivot => RowRole::Pivot,
        }
    }
}

/// Which side(s) of the book a produced list shows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    SupportOnly,
    ResistanceOnly,
    Both,
}

impl Direction {
    /// Placeholder shown instead of an empty list.
    pub fn unavailable_message(&self) -> &'static str {
        match self {
            Direction::SupportOnly => "no support levels available",
            Direction::ResistanceOnly => "no resistance levels available",
            Direction::Both => "no levels available",
        }
    }
}

/// How one classification rule recognises a label.
#[derive(Copy, Clone, Debug)]
pub enum Matcher {
    /// Label text contains the given fragment.
    TextContains(&'static str),
    /// Label text contains the given character immediately followed by a
    /// digit (e.g. `R1`, `S3`).
    NumberedText(char),
    /// Label carries the given renderer style tag.
    StyleTag(&'static str),
}

impl Matcher {
    fn matches(&self, label: &Label) -> bool {
        match self {
            Matcher::TextContains(fragment) => label.text.contains(fragment),
            Matcher::NumberedText(prefix) => {
                let bytes = label.text.as_bytes();
                bytes
                    .windows(2)
                    .any(|pair| pair[0] == *prefix as u8 && pair[1].is_ascii_digit())
            }
            Matcher::StyleTag(tag) => label.style.as_deref() == Some(*tag),
        }
    }
}

/// One entry of a family's rule table.
#[derive(Copy, Clone, Debug)]
pub struct ClassifyRule {
    pub matcher: Matcher,
    pub role: LevelRole,
}

/// Family-specific classification parameters. First matching rule wins; a
/// label matching nothing takes the fallback role, or is dropped when the
/// family has none.
#[derive(Copy, Clone, Debug)]
pub struct LevelFamily {
    pub name: &'static str,
    pub rules: &'static [ClassifyRule],
    pub fallback: Option<LevelRole>,
    pub direction: Direction,
}

impl LevelFamily {
    pub fn classify(&self, label: &Label) -> Option<LevelRole> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(label))
            .map(|rule| rule.role)
            .or(self.fallback)
    }

    /// Same family rendered for a different side of the book.
    pub fn with_direction(&self, direction: Direction) -> LevelFamily {
        LevelFamily { direction, ..*self }
    }
}

/// Support/resistance bands: supports are labelled with an "S" marker,
/// everything else is a resistance.
pub const SR_LEVELS: LevelFamily = LevelFamily {
    name: "sr-levels",
    rules: &[ClassifyRule {
        matcher: Matcher::TextContains("S"),
        role: LevelRole::Support,
    }],
    fallback: Some(LevelRole::Resistance),
    direction: Direction::Both,
};

/// Standard pivot set: numbered `R`/`S` levels around a `P (…)` pivot.
pub const PIVOT_STANDARD: LevelFamily = LevelFamily {
    name: "pivot-standard",
    rules: &[
        ClassifyRule {
            matcher: Matcher::TextContains("P ("),
            role: LevelRole::Pivot,
        },
        ClassifyRule {
            matcher: Matcher::NumberedText('R'),
            role: LevelRole::Resistance,
        },
        ClassifyRule {
            matcher: Matcher::NumberedText('S'),
            role: LevelRole::Support,
        },
    ],
    fallback: None,
    direction: Direction::Both,
};

/// High/low pivots carry no text pattern; the renderer style tag tells the
/// sides apart (highs hang a down-pointing label above price, lows the
/// reverse).
pub const PIVOT_HIGH_LOW: LevelFamily = LevelFamily {
    name: "pivot-high-low",
    rules: &[
        ClassifyRule {
            matcher: Matcher::StyleTag("label_down"),
            role: LevelRole::Resistance,
        },
        ClassifyRule {
            matcher: Matcher::StyleTag("label_up"),
            role: LevelRole::Support,
        },
    ],
    fallback: None,
    direction: Direction::Both,
};

/// Default family for a level-capable indicator key.
pub fn family_for(kind: IndicatorKind) -> Option<&'static LevelFamily> {
    match kind {
        IndicatorKind::SupportResistance => Some(&SR_LEVELS),
        IndicatorKind::PivotPointsStandard => Some(&PIVOT_STANDARD),
        IndicatorKind::PivotPointsHighLow => Some(&PIVOT_HIGH_LOW),
        _ => None,
    }
}

/// One produced display row.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelRow {
    pub id: SmolStr,
    pub text: String,
    pub y: f64,
    pub role: RowRole,
}

/// Classifier output: an ordered row sequence, or an explicit marker that the
/// produced side has nothing to show (distinguishable from an empty render).
#[derive(Clone, Debug, PartialEq)]
pub enum ClassifiedLevels {
    Rows(Vec<LevelRow>),
    Unavailable { direction: Direction },
}

impl ClassifiedLevels {
    pub fn rows(&self) -> Option<&[LevelRow]> {
        match self {
            ClassifiedLevels::Rows(rows) => Some(rows),
            ClassifiedLevels::Unavailable { .. } => None,
        }
    }
}

struct Candidate<'a> {
    label: &'a Label,
    discovery: usize,
    y: f64,
    role: LevelRole,
}

/// Classify `labels` against `current_price` per the family's parameters.
///
/// Output ordering: rows above the current price sorted descending by `y`,
/// then the synthetic current-price row when it applies, then rows at or
/// below the price sorted descending by `y`. Ties keep discovery order.
///
/// A `current_price` of 0 (feed not yet warmed up) suppresses the synthetic
/// row unconditionally.
pub fn classify_levels(
    labels: &[Label],
    current_price: f64,
    family: &LevelFamily,
) -> ClassifiedLevels {
    let mut support = Vec::new();
    let mut resistance = Vec::new();
    let mut pivot = Vec::new();

    for (discovery, label) in labels.iter().enumerate() {
        let Some(y) = valid_value(label.y) else {
            continue;
        };
        let Some(role) = family.classify(label) else {
            continue;
        };
        let candidate = Candidate {
            label,
            discovery,
            y,
            role,
        };
        match role {
            // crossed levels are hidden, pivots never price-filter
            LevelRole::Support if y <= current_price => support.push(candidate),
            LevelRole::Resistance if y > current_price => resistance.push(candidate),
            LevelRole::Pivot => pivot.push(candidate),
            LevelRole::Support | LevelRole::Resistance => {}
        }
    }

    let max_support = support
        .iter()
        .map(|c| c.y)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_resistance = resistance.iter().map(|c| c.y).fold(f64::INFINITY, f64::min);
    let insert_price_row =
        current_price > 0.0 && current_price > max_support && current_price <= min_resistance;

    let selected: Vec<Candidate> = match family.direction {
        Direction::SupportOnly => support,
        Direction::ResistanceOnly => resistance,
        Direction::Both => {
            let mut all: Vec<Candidate> = Vec::new();
            all.extend(resistance);
            all.extend(pivot);
            all.extend(support);
            // ties resolve by discovery order, regardless of role
            all.sort_by_key(|c| c.discovery);
            all
        }
    };

    if selected.is_empty() {
        return ClassifiedLevels::Unavailable {
            direction: family.direction,
        };
    }

    let (above, below): (Vec<Candidate>, Vec<Candidate>) = selected
        .into_iter()
        .partition(|candidate| candidate.y > current_price);

    let mut rows: Vec<LevelRow> = Vec::with_capacity(above.len() + below.len() + 1);
    rows.extend(sorted_rows(above));
    if insert_price_row {
        rows.push(current_price_row(current_price));
    }
    rows.extend(sorted_rows(below));

    ClassifiedLevels::Rows(rows)
}

fn sorted_rows(mut candidates: Vec<Candidate<'_>>) -> Vec<LevelRow> {
    // stable sort keeps discovery order on equal y
    candidates.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));
    candidates
        .into_iter()
        .map(|candidate| LevelRow {
            id: candidate.label.id.clone(),
            text: candidate.label.text.clone(),
            y: candidate.y,
            role: candidate.role.into(),
        })
        .collect()
}

fn current_price_row(current_price: f64) -> LevelRow {
    LevelRow {
        id: SmolStr::new_static("current-price"),
        text: format!("Current Price = {current_price:.2}"),
        y: current_price,
        role: RowRole::CurrentPrice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::SENTINEL;

    fn label(id: &str, text: &str, y: f64) -> Label {
        Label {
            id: SmolStr::new(id),
            text: text.to_string(),
            y: Some(y),
            style: None,
        }
    }

    fn styled(id: &str, y: f64, style: &str) -> Label {
        Label {
            id: SmolStr::new(id),
            text: String::new(),
            y: Some(y),
            style: Some(SmolStr::new(style)),
        }
    }

    fn ys(classified: &ClassifiedLevels) -> Vec<(f64, RowRole)> {
        classified
            .rows()
            .expect("rows")
            .iter()
            .map(|row| (row.y, row.role))
            .collect()
    }

    #[test]
    fn test_current_price_row_inserted_between_sides() {
        let labels = vec![
            label("s1", "S 100.0", 100.0),
            label("s2", "S 90.0", 90.0),
            label("r1", "R 120.0", 120.0),
            label("r2", "R 130.0", 130.0),
        ];

        let classified = classify_levels(&labels, 110.0, &SR_LEVELS);
        assert_eq!(
            ys(&classified),
            vec![
                (130.0, RowRole::Resistance),
                (120.0, RowRole::Resistance),
                (110.0, RowRole::CurrentPrice),
                (100.0, RowRole::Support),
                (90.0, RowRole::Support),
            ]
        );

        let price_row = &classified.rows().unwrap()[2];
        assert_eq!(price_row.text, "Current Price = 110.00");
    }

    #[test]
    fn test_cold_feed_suppresses_price_row() {
        let labels = vec![
            label("s1", "S 100.0", 100.0),
            label("s2", "S 90.0", 90.0),
            label("r1", "R 120.0", 120.0),
            label("r2", "R 130.0", 130.0),
        ];

        let classified = classify_levels(&labels, 0.0, &SR_LEVELS);
        let rows = classified.rows().expect("rows");
        assert!(rows.iter().all(|row| row.role != RowRole::CurrentPrice));
        // price 0 puts every surviving label above the price, strictly descending
        assert!(rows.windows(2).all(|pair| pair[0].y >= pair[1].y));
    }

    #[test]
    fn test_price_touching_support_suppresses_row() {
        let labels = vec![label("s1", "S 110.0", 110.0), label("r1", "R 130.0", 130.0)];

        // current price sits exactly on the nearest support: not strictly above
        let classified = classify_levels(&labels, 110.0, &SR_LEVELS);
        assert_eq!(
            ys(&classified),
            vec![(130.0, RowRole::Resistance), (110.0, RowRole::Support)]
        );
    }

    #[test]
    fn test_crossed_levels_are_hidden() {
        let labels = vec![
            label("s1", "S 150.0", 150.0),
            label("r1", "R 80.0", 80.0),
            label("s2", "S 100.0", 100.0),
        ];

        // a support above price and a resistance below price never render
        let classified = classify_levels(&labels, 110.0, &SR_LEVELS);
        assert_eq!(ys(&classified), vec![
            (110.0, RowRole::CurrentPrice),
            (100.0, RowRole::Support),
        ]);
    }

    #[test]
    fn test_empty_set_yields_unavailable_marker() {
        let classified = classify_levels(&[], 110.0, &SR_LEVELS.with_direction(Direction::SupportOnly));
        assert_eq!(
            classified,
            ClassifiedLevels::Unavailable {
                direction: Direction::SupportOnly
            }
        );
        assert_eq!(
            Direction::SupportOnly.unavailable_message(),
            "no support levels available"
        );
    }

    #[test]
    fn test_sentinel_y_is_discarded() {
        let labels = vec![
            label("s1", "S 100.0", 100.0),
            label("bad", "S bogus", SENTINEL),
        ];

        let classified = classify_levels(&labels, 110.0, &SR_LEVELS);
        let rows = classified.rows().expect("rows");
        assert!(rows.iter().all(|row| row.id != "bad"));
    }

    #[test]
    fn test_split_views_attach_price_row_to_produced_side() {
        let labels = vec![
            label("s1", "S 100.0", 100.0),
            label("r1", "R 130.0", 130.0),
        ];

        let supports = classify_levels(&labels, 110.0, &SR_LEVELS.with_direction(Direction::SupportOnly));
        assert_eq!(
            ys(&supports),
            vec![(110.0, RowRole::CurrentPrice), (100.0, RowRole::Support)]
        );

        let resistances =
            classify_levels(&labels, 110.0, &SR_LEVELS.with_direction(Direction::ResistanceOnly));
        assert_eq!(
            ys(&resistances),
            vec![(130.0, RowRole::Resistance), (110.0, RowRole::CurrentPrice)]
        );
    }

    #[test]
    fn test_pivot_standard_family() {
        let labels = vec![
            label("r1", "R1 (64800.0)", 64800.0),
            label("p", "P (64400.0)", 64400.0),
            label("s1", "S1 (64000.0)", 64000.0),
            label("x", "unmarked", 64100.0),
        ];

        let classified = classify_levels(&labels, 64500.0, &PIVOT_STANDARD);
        assert_eq!(
            ys(&classified),
            vec![
                (64800.0, RowRole::Resistance),
                (64500.0, RowRole::CurrentPrice),
                (64400.0, RowRole::Pivot),
                (64000.0, RowRole::Support),
            ]
        );
    }

    #[test]
    fn test_pivot_below_support_keeps_price_order() {
        let labels = vec![
            label("p", "P (95.0)", 95.0),
            label("s1", "S1 (100.0)", 100.0),
            label("r1", "R1 (130.0)", 130.0),
        ];

        // pivots are never price-filtered; they slot wherever their y falls
        let classified = classify_levels(&labels, 110.0, &PIVOT_STANDARD);
        assert_eq!(
            ys(&classified),
            vec![
                (130.0, RowRole::Resistance),
                (110.0, RowRole::CurrentPrice),
                (100.0, RowRole::Support),
                (95.0, RowRole::Pivot),
            ]
        );
    }

    #[test]
    fn test_high_low_family_classifies_by_style() {
        let labels = vec![
            styled("h1", 64850.0, "label_down"),
            styled("l1", 63900.0, "label_up"),
            styled("n1", 64100.0, "label_plain"),
        ];

        let classified = classify_levels(&labels, 64500.0, &PIVOT_HIGH_LOW);
        assert_eq!(
            ys(&classified),
            vec![
                (64850.0, RowRole::Resistance),
                (64500.0, RowRole::CurrentPrice),
                (63900.0, RowRole::Support),
            ]
        );
    }

    #[test]
    fn test_equal_y_keeps_discovery_order() {
        let labels = vec![
            label("first", "R a", 130.0),
            label("second", "R b", 130.0),
        ];

        let classified = classify_levels(&labels, 110.0, &SR_LEVELS);
        let ids: Vec<&str> = classified
            .rows()
            .unwrap()
            .iter()
            .map(|row| row.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "current-price"]);
    }
}
