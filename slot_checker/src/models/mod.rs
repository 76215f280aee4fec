//! Domain models for booking grids, time slots, staff, and check results.
//!
//! # Modules
//!
//! - [`grid`]: Raw grids as produced by source-system adapters
//! - [`slot`]: Normalized time slots, row→time tables, and free runs
//! - [`staff`]: Staff members and roles
//! - [`result`]: Clinic- and run-level results

pub mod grid;
pub mod result;
pub mod slot;
pub mod staff;

pub use grid::{
    CellState, IntervalPolicy, RawGrid, RawRow, SlotCell, SourceSystem, StaffColumn, TimeAnchor,
};
pub use result::{
    ClinicCheckError, ClinicCheckResult, ClinicFailure, ClinicId, ClinicOutcome, Diagnostic,
    IntervalReport, RoleSummary, RunResult, RunSummary, StaffAvailability, TimelineEntry,
};
pub use slot::{
    Confidence, DetectedInterval, FreeRun, MappingSource, RowMapping, RowTimeMap, StaffSchedule,
    TimeSlot,
};
pub use staff::{StaffMember, StaffRole};
