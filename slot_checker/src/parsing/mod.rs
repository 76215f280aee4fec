//! Parsers for raw grid content.
//!
//! - [`time_labels`]: Resolve left-hand row labels into time anchors

pub mod time_labels;

pub use time_labels::{parse_clock_label, resolve_anchors};
