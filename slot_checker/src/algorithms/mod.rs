//! Availability detection and clinic aggregation.
//!
//! # Components
//!
//! - [`availability`]: Maximal free runs per staff member
//! - [`aggregation`]: Clinic-level roll-up, shortage flag, and timeline

pub mod aggregation;
pub mod availability;

pub use aggregation::aggregate;
pub use availability::{count_blocks, find_free_runs};
