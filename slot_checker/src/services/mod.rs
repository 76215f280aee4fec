//! Services that drive a check run.
//!
//! - [`source`]: The [`GridSource`] adapter trait
//! - [`file_source`]: Grid source reading pre-scraped JSON files
//! - [`orchestrator`]: Concurrent run over all clinics

pub mod file_source;
pub mod orchestrator;
pub mod source;

pub use file_source::FileGridSource;
pub use orchestrator::{CheckOrchestrator, OrchestratorSettings};
pub use source::GridSource;
