//! Raw booking grids as handed over by the source-system adapters.
//!
//! A [`RawGrid`] is the only thing the core knows about a scraped page: the
//! ordered rows with their optional left-hand time labels, and one column of
//! [`SlotCell`]s per staff member. Cell states are decided by the adapter and
//! are never re-interpreted downstream.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The two external booking platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceSystem {
    #[serde(rename = "dent-sys")]
    DentSys,
    #[serde(rename = "stransa")]
    Stransa,
}

impl SourceSystem {
    /// How the slot interval of this system is determined.
    ///
    /// Stransa grids are always 15 minutes. dent-sys.net clinics run either
    /// 5- or 10-minute grids; when the evidence is unclear the coarser value
    /// is assumed.
    pub fn interval_policy(&self) -> IntervalPolicy {
        match self {
            SourceSystem::Stransa => IntervalPolicy::Fixed(15),
            SourceSystem::DentSys => IntervalPolicy::AutoDetect {
                candidates: vec![5, 10],
                fallback: 10,
            },
        }
    }

    /// Parse a system name as used in configuration and on the command line.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "dent-sys" | "dentsys" | "dent-sys.net" => Ok(Self::DentSys),
            "stransa" => Ok(Self::Stransa),
            other => Err(format!("Unknown source system: {}", other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::DentSys => "dent-sys",
            SourceSystem::Stransa => "stransa",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot-interval policy of a source system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalPolicy {
    /// Single known granularity, in minutes.
    Fixed(u32),
    /// Pick among `candidates` from anchor spacing; `fallback` when unsure.
    AutoDetect { candidates: Vec<u32>, fallback: u32 },
}

/// State of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Free,
    Booked,
    Closed,
    Unknown,
}

impl CellState {
    pub fn is_free(&self) -> bool {
        matches!(self, CellState::Free)
    }

    fn code(&self) -> u8 {
        match self {
            CellState::Free => b'F',
            CellState::Booked => b'B',
            CellState::Closed => b'C',
            CellState::Unknown => b'U',
        }
    }
}

/// One grid position for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCell {
    pub row_index: usize,
    pub state: CellState,
    pub staff_id: String,
}

/// A grid row with its raw time label, if the page showed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub index: usize,
    #[serde(default)]
    pub label: Option<String>,
}

/// All cells of one staff column.
///
/// Cells may be sparse; a row without a cell is treated as [`CellState::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffColumn {
    pub staff_id: String,
    pub cells: Vec<SlotCell>,
}

impl StaffColumn {
    /// Build a column from a dense list of states, one per row starting at row 0.
    pub fn from_states(staff_id: impl Into<String>, states: &[CellState]) -> Self {
        let staff_id = staff_id.into();
        let cells = states
            .iter()
            .enumerate()
            .map(|(row_index, state)| SlotCell {
                row_index,
                state: *state,
                staff_id: staff_id.clone(),
            })
            .collect();
        Self { staff_id, cells }
    }
}

/// Raw per-staff grid for one clinic on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGrid {
    pub clinic: String,
    pub system: SourceSystem,
    pub rows: Vec<RawRow>,
    pub staff: Vec<StaffColumn>,
}

impl RawGrid {
    /// SHA-256 fingerprint of the grid content.
    ///
    /// Two scrapes of an unchanged page produce the same checksum, which lets
    /// a writer skip storing identical results.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.clinic.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.system.as_str().as_bytes());
        for row in &self.rows {
            hasher.update((row.index as u64).to_le_bytes());
            match &row.label {
                Some(label) => {
                    hasher.update([1u8]);
                    hasher.update(label.as_bytes());
                }
                None => hasher.update([0u8]),
            }
            hasher.update([0u8]);
        }
        for column in &self.staff {
            hasher.update(column.staff_id.as_bytes());
            hasher.update([0u8]);
            for cell in &column.cells {
                hasher.update((cell.row_index as u64).to_le_bytes());
                hasher.update([cell.state.code()]);
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// A row whose wall-clock start time is known with certainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAnchor {
    pub row_index: usize,
    #[serde(with = "crate::time::hhmm")]
    pub time: NaiveTime,
}

impl TimeAnchor {
    pub fn new(row_index: usize, time: NaiveTime) -> Self {
        Self { row_index, time }
    }
}
