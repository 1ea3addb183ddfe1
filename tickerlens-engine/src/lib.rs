//! Tickerlens aggregation engine.
//!
//! Consumes a stream of market/indicator update events (one event per
//! symbol+timeframe indicator snapshot, plus periodic full position-list
//! snapshots) and maintains a derived, query-ready view:
//!
//! - a nested symbol → timeframe → indicator-values store with key-wise
//!   last-write-wins merge semantics,
//! - the discovered set of active timeframes in canonical display order,
//! - the current open-position book, wholly replaced on each snapshot,
//! - and, for price-level indicators, an ordered, current-price-aware list of
//!   classified levels ready for direct display.
//!
//! Transport (socket, reconnect policy, initial REST snapshot) and rendering
//! live in consumer crates; this crate is synchronous, in-memory and
//! permissive: feed glitches degrade the view, they never crash it.

pub mod engine;
pub mod error;
pub mod event;
pub mod indicator;
pub mod level;
pub mod position;
pub mod projection;
pub mod sentinel;
pub mod store;
pub mod timeframe;

pub use engine::AggregationEngine;
pub use error::FeedError;
pub use event::{FeedEvent, IndicatorUpdate, Position, PositionSide, PositionSnapshot};
pub use indicator::{IndicatorKind, IndicatorValue, Label, Line};
pub use level::{
    ClassifiedLevels, Direction, LevelFamily, LevelRow, RowRole, classify_levels, family_for,
};
pub use position::PositionBook;
pub use projection::{ScalarReading, allowed_fields, project_scalars};
pub use sentinel::{SENTINEL, is_sentinel};
pub use store::{MarketTick, TimeframeCell};
pub use timeframe::{Timeframe, TimeframeRegistry};
