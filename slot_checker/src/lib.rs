//! Clinic slot checker - schedule normalization and availability detection.
//!
//! Booking grids scraped from dent-sys.net and Stransa are normalized into
//! per-staff time slots, searched for runs of free slots long enough for a
//! booking, and rolled up per clinic into a shortage verdict.
//!
//! # Modules
//!
//! - [`models`]: Grids, slots, staff, and results
//! - [`parsing`]: Time-label resolution
//! - [`preprocessing`]: Interval detection, row mapping, grid ingestion
//! - [`algorithms`]: Free-run detection and clinic aggregation
//! - [`services`]: Grid sources and the run orchestrator
//! - [`config`]: TOML configuration

pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod parsing;
pub mod preprocessing;
pub mod services;
pub mod time;

pub use config::CheckerConfig;
pub use error::{SlotError, SlotResult, SourceError};
pub use services::{CheckOrchestrator, FileGridSource, GridSource};
