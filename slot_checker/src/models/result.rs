//! Per-clinic and per-run check results.
//!
//! Everything here is assembled once per run and never mutated afterwards.
//! The types derive `Serialize` so an external writer can persist them keyed
//! by clinic, check date, and run timestamp.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::grid::SourceSystem;
use super::slot::{Confidence, DetectedInterval, FreeRun};
use super::staff::StaffRole;
use crate::error::{SlotError, SourceError};

/// Clinic identity within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClinicId {
    pub name: String,
    pub system: SourceSystem,
}

impl ClinicId {
    pub fn new(name: impl Into<String>, system: SourceSystem) -> Self {
        Self {
            name: name.into(),
            system,
        }
    }
}

impl fmt::Display for ClinicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.system)
    }
}

/// Non-fatal findings surfaced alongside a clinic result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Staff column present in the grid but absent from the staff rules.
    ConfigurationDrift { staff_id: String },
    /// Rows between two anchors did not match the interval and were closed.
    MappingGap {
        from_row: usize,
        to_row: usize,
        closed_rows: usize,
    },
    /// An anchor that did not move time forward was ignored.
    DroppedAnchor { row_index: usize },
    /// The interval is a fallback, not a detection.
    LowConfidenceInterval { minutes: u32 },
    /// Extrapolated rows fell outside operating hours.
    DiscardedRows { count: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ConfigurationDrift { staff_id } => {
                write!(f, "staff '{}' is not in the staff rules", staff_id)
            }
            Diagnostic::MappingGap {
                from_row,
                to_row,
                closed_rows,
            } => write!(
                f,
                "rows {}..{} do not match the slot interval; {} rows closed",
                from_row, to_row, closed_rows
            ),
            Diagnostic::DroppedAnchor { row_index } => {
                write!(f, "time label on row {} ignored (not increasing)", row_index)
            }
            Diagnostic::LowConfidenceInterval { minutes } => {
                write!(f, "slot interval assumed to be {} minutes", minutes)
            }
            Diagnostic::DiscardedRows { count } => {
                write!(f, "{} rows outside operating hours discarded", count)
            }
        }
    }
}

/// Availability of one counted staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAvailability {
    pub staff_id: String,
    pub role: StaffRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub required_consecutive_slots: usize,
    pub runs: Vec<FreeRun>,
    pub qualifying_blocks: usize,
    pub block_capacity: usize,
}

impl StaffAvailability {
    /// Qualifying runs rendered as `9:25-9:55`.
    pub fn qualifying_ranges(&self) -> Vec<String> {
        self.runs
            .iter()
            .filter(|r| r.qualifies)
            .map(|r| r.to_string())
            .collect()
    }
}

/// Role-level roll-up within a clinic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub role: StaffRole,
    pub staff_count: usize,
    pub qualifying_blocks: usize,
}

/// One free run placed on the clinic timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub staff_id: String,
    pub role: StaffRole,
    #[serde(with = "crate::time::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time::hhmm")]
    pub end_time: NaiveTime,
    pub slot_count: usize,
    pub qualifies: bool,
}

/// One clinic's outcome for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicCheckResult {
    pub clinic: ClinicId,
    pub check_date: NaiveDate,
    pub interval: DetectedInterval,
    pub staff: Vec<StaffAvailability>,
    pub excluded_staff: Vec<String>,
    pub total_qualifying_blocks: usize,
    pub block_capacity: usize,
    pub minimum_blocks_required: usize,
    pub shortage: bool,
    pub roles: Vec<RoleSummary>,
    pub timeline: Vec<TimelineEntry>,
    pub diagnostics: Vec<Diagnostic>,
    pub grid_checksum: String,
    pub checked_at: DateTime<Utc>,
}

impl ClinicCheckResult {
    pub fn has_availability(&self) -> bool {
        !self.shortage
    }
}

/// Why a clinic could not be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicFailure {
    /// No adapter registered for the clinic's source system.
    SourceUnavailable,
    Login,
    Adapter,
    Parse,
    /// No labeled rows; interval-dependent aggregation was skipped.
    InsufficientEvidence,
    TimedOut,
    Internal,
}

impl ClinicFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicFailure::SourceUnavailable => "SOURCE_UNAVAILABLE",
            ClinicFailure::Login => "LOGIN_FAILED",
            ClinicFailure::Adapter => "ADAPTER_FAILED",
            ClinicFailure::Parse => "PARSE_FAILED",
            ClinicFailure::InsufficientEvidence => "INSUFFICIENT_EVIDENCE",
            ClinicFailure::TimedOut => "TIMED_OUT",
            ClinicFailure::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ClinicFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SourceError> for ClinicFailure {
    fn from(err: &SourceError) -> Self {
        match err {
            SourceError::Login(_) => ClinicFailure::Login,
            SourceError::Timeout(_) => ClinicFailure::TimedOut,
            SourceError::Parse(_) => ClinicFailure::Parse,
            SourceError::Unavailable(_) | SourceError::Io(_) => ClinicFailure::Adapter,
        }
    }
}

impl From<&SlotError> for ClinicFailure {
    fn from(err: &SlotError) -> Self {
        match err {
            SlotError::InsufficientEvidence => ClinicFailure::InsufficientEvidence,
            SlotError::MalformedGrid(_) => ClinicFailure::Parse,
            SlotError::Configuration(_) | SlotError::Internal(_) => ClinicFailure::Internal,
        }
    }
}

/// A clinic-scoped failure, recorded instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicCheckError {
    pub clinic: ClinicId,
    pub kind: ClinicFailure,
    pub message: String,
    pub failed_at: DateTime<Utc>,
}

impl ClinicCheckError {
    pub fn new(clinic: ClinicId, kind: ClinicFailure, message: impl Into<String>) -> Self {
        Self {
            clinic,
            kind,
            message: message.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Result slot of one clinic in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ClinicOutcome {
    Checked(ClinicCheckResult),
    Failed(ClinicCheckError),
}

impl ClinicOutcome {
    pub fn clinic(&self) -> &ClinicId {
        match self {
            ClinicOutcome::Checked(r) => &r.clinic,
            ClinicOutcome::Failed(e) => &e.clinic,
        }
    }

    pub fn as_checked(&self) -> Option<&ClinicCheckResult> {
        match self {
            ClinicOutcome::Checked(r) => Some(r),
            ClinicOutcome::Failed(_) => None,
        }
    }

    pub fn as_failed(&self) -> Option<&ClinicCheckError> {
        match self {
            ClinicOutcome::Checked(_) => None,
            ClinicOutcome::Failed(e) => Some(e),
        }
    }
}

/// Interval-detection confidence reported per clinic at run level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalReport {
    pub clinic: ClinicId,
    pub minutes: u32,
    pub confidence: Confidence,
}

/// Full result set of one run, in clinic configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub check_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub run_timed_out: bool,
    pub outcomes: Vec<ClinicOutcome>,
    pub intervals: Vec<IntervalReport>,
}

/// Counts for a run, as shown at the top of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_clinics: usize,
    pub clinics_with_availability: usize,
    pub clinics_with_shortage: usize,
    pub failed_clinics: usize,
}

impl RunResult {
    pub fn summary(&self) -> RunSummary {
        let checked: Vec<&ClinicCheckResult> =
            self.outcomes.iter().filter_map(ClinicOutcome::as_checked).collect();
        let clinics_with_availability = checked.iter().filter(|r| r.has_availability()).count();
        RunSummary {
            total_clinics: self.outcomes.len(),
            clinics_with_availability,
            clinics_with_shortage: checked.len() - clinics_with_availability,
            failed_clinics: self.outcomes.len() - checked.len(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ClinicCheckError> {
        self.outcomes.iter().filter_map(ClinicOutcome::as_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(name: &str, shortage: bool) -> ClinicOutcome {
        ClinicOutcome::Checked(ClinicCheckResult {
            clinic: ClinicId::new(name, SourceSystem::DentSys),
            check_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            interval: DetectedInterval::high(5),
            staff: vec![],
            excluded_staff: vec![],
            total_qualifying_blocks: if shortage { 1 } else { 5 },
            block_capacity: 0,
            minimum_blocks_required: 4,
            shortage,
            roles: vec![],
            timeline: vec![],
            diagnostics: vec![],
            grid_checksum: String::new(),
            checked_at: Utc::now(),
        })
    }

    #[test]
    fn test_run_summary_counts() {
        let run = RunResult {
            check_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            run_timed_out: false,
            outcomes: vec![
                checked("A", false),
                checked("B", true),
                ClinicOutcome::Failed(ClinicCheckError::new(
                    ClinicId::new("C", SourceSystem::Stransa),
                    ClinicFailure::TimedOut,
                    "clinic check exceeded 120s",
                )),
            ],
            intervals: vec![],
        };

        let summary = run.summary();
        assert_eq!(summary.total_clinics, 3);
        assert_eq!(summary.clinics_with_availability, 1);
        assert_eq!(summary.clinics_with_shortage, 1);
        assert_eq!(summary.failed_clinics, 1);
        assert_eq!(run.failures().next().unwrap().kind, ClinicFailure::TimedOut);
    }

    #[test]
    fn test_failure_kinds_from_errors() {
        let login = SourceError::Login("bad password".to_string());
        assert_eq!(ClinicFailure::from(&login), ClinicFailure::Login);
        assert_eq!(
            ClinicFailure::from(&SlotError::InsufficientEvidence),
            ClinicFailure::InsufficientEvidence
        );
        assert_eq!(ClinicFailure::TimedOut.to_string(), "TIMED_OUT");
    }

    #[test]
    fn test_diagnostic_serializes_with_kind_tag() {
        let json = serde_json::to_value(Diagnostic::ConfigurationDrift {
            staff_id: "DH尾崎".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "configuration_drift");
        assert_eq!(json["staff_id"], "DH尾崎");
    }
}
