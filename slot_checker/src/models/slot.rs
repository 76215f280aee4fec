//! Normalized time slots, row→time tables, and free runs.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::grid::CellState;
use crate::time::{format_clock, minutes_of_day, offset_minutes};

/// How much the caller can trust a derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

/// Slot granularity detected for one clinic grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedInterval {
    pub minutes: u32,
    pub confidence: Confidence,
}

impl DetectedInterval {
    pub fn high(minutes: u32) -> Self {
        Self {
            minutes,
            confidence: Confidence::High,
        }
    }

    pub fn low(minutes: u32) -> Self {
        Self {
            minutes,
            confidence: Confidence::Low,
        }
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence == Confidence::Low
    }
}

/// Where a mapped row's time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingSource {
    /// The row carried a label.
    Anchored,
    /// Stepped between two anchors whose spacing matched the interval.
    Interpolated,
    /// Stepped outward from the first or last anchor.
    Extrapolated,
}

/// Outcome of mapping one grid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowMapping {
    Mapped {
        #[serde(with = "crate::time::hhmm")]
        time: NaiveTime,
        source: MappingSource,
    },
    /// Part of a closed period; never carries a time.
    Closed,
    /// Outside operating hours.
    Discarded,
}

impl RowMapping {
    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            RowMapping::Mapped { time, .. } => Some(*time),
            _ => None,
        }
    }
}

/// Complete row→wall-clock table for one clinic grid, indexed by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTimeMap {
    pub interval_minutes: u32,
    pub rows: Vec<RowMapping>,
}

impl RowTimeMap {
    pub fn get(&self, row_index: usize) -> Option<&RowMapping> {
        self.rows.get(row_index)
    }

    pub fn time_of(&self, row_index: usize) -> Option<NaiveTime> {
        self.rows.get(row_index).and_then(RowMapping::time)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn closed_rows(&self) -> usize {
        self.rows.iter().filter(|r| matches!(r, RowMapping::Closed)).count()
    }

    pub fn discarded_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r, RowMapping::Discarded))
            .count()
    }

    /// Iterate `(row_index, time)` over mapped rows only.
    pub fn mapped(&self) -> impl Iterator<Item = (usize, NaiveTime)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.time().map(|t| (i, t)))
    }
}

/// The normalized unit: one mapped row of one staff column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub row_index: usize,
    #[serde(with = "crate::time::hhmm")]
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub state: CellState,
}

impl TimeSlot {
    /// Start of the following slot, `None` if that would leave the day.
    pub fn end_time(&self) -> Option<NaiveTime> {
        offset_minutes(self.start_time, self.duration_minutes as i64)
    }

    /// Whether `next` starts exactly where this slot ends.
    pub fn is_followed_by(&self, next: &TimeSlot) -> bool {
        minutes_of_day(self.start_time) + self.duration_minutes == minutes_of_day(next.start_time)
    }
}

/// A maximal contiguous run of free slots for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRun {
    pub staff_id: String,
    #[serde(with = "crate::time::hhmm")]
    pub start_time: NaiveTime,
    /// Exclusive end: the time the last free slot ends.
    #[serde(with = "crate::time::hhmm")]
    pub end_time: NaiveTime,
    pub slot_count: usize,
    pub qualifies: bool,
}

impl FreeRun {
    pub fn duration_minutes(&self) -> u32 {
        minutes_of_day(self.end_time).saturating_sub(minutes_of_day(self.start_time))
    }

    pub fn meets(&self, required_consecutive_slots: usize) -> bool {
        self.slot_count >= required_consecutive_slots
    }
}

impl fmt::Display for FreeRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            format_clock(self.start_time),
            format_clock(self.end_time)
        )
    }
}

/// Ordered slot sequence of one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSchedule {
    pub staff_id: String,
    pub slots: Vec<TimeSlot>,
}

impl StaffSchedule {
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.state.is_free()).count()
    }
}
