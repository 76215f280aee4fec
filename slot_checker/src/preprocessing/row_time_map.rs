//! Row → wall-clock mapping across non-uniform gaps.
//!
//! Grids skip rows for closed periods (lunch, early close) instead of showing
//! them, so row spacing is not constant. Between two anchors whose rows match
//! the interval, every row is stepped. When rows are missing, only the rows
//! up to where the next label would appear at the grid's usual label spacing
//! are stepped from the earlier anchor; the rest are marked closed instead of
//! guessed.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::{Diagnostic, MappingSource, RowMapping, RowTimeMap, TimeAnchor};
use crate::time::{minutes_of_day, offset_minutes};

/// Opening and closing time of a clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    #[serde(with = "crate::time::hhmm")]
    pub open: NaiveTime,
    #[serde(with = "crate::time::hhmm")]
    pub close: NaiveTime,
}

impl OperatingHours {
    /// Whether a slot starting at `start` and lasting `minutes` lies within hours.
    pub fn contains_slot(&self, start: NaiveTime, minutes: u32) -> bool {
        match offset_minutes(start, minutes as i64) {
            Some(end) => start >= self.open && end <= self.close,
            None => false,
        }
    }
}

/// A row map together with the findings made while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRows {
    pub map: RowTimeMap,
    pub diagnostics: Vec<Diagnostic>,
}

/// Keep anchors that are inside the grid, on distinct rows, and strictly
/// increasing in time.
fn usable_anchors(
    anchors: &[TimeAnchor],
    row_count: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<TimeAnchor> {
    let mut sorted = anchors.to_vec();
    sorted.sort_by_key(|a| a.row_index);

    let mut kept: Vec<TimeAnchor> = Vec::with_capacity(sorted.len());
    for anchor in sorted {
        let increasing = kept
            .last()
            .map_or(true, |last| anchor.row_index > last.row_index && anchor.time > last.time);
        if anchor.row_index < row_count && increasing {
            kept.push(anchor);
        } else {
            log::warn!(
                "dropping time anchor {} on row {}",
                anchor.time.format("%H:%M"),
                anchor.row_index
            );
            diagnostics.push(Diagnostic::DroppedAnchor {
                row_index: anchor.row_index,
            });
        }
    }
    kept
}

/// The most common row distance between consecutive labels whose rows match
/// the interval exactly. Ties go to the smaller distance.
fn label_spacing(anchors: &[TimeAnchor], interval: u32) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for pair in anchors.windows(2) {
        let span_minutes = minutes_of_day(pair[1].time) - minutes_of_day(pair[0].time);
        let gap_rows = pair[1].row_index - pair[0].row_index;
        if span_minutes == interval * gap_rows as u32 {
            *counts.entry(gap_rows).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(usize, usize)>, (gap, count)| match best {
            Some((_, most)) if most >= count => best,
            _ => Some((gap, count)),
        })
        .map(|(gap, _)| gap)
}

fn extrapolated(
    anchor: &TimeAnchor,
    steps: i64,
    interval: u32,
    hours: Option<&OperatingHours>,
) -> RowMapping {
    let time = offset_minutes(anchor.time, steps * interval as i64);
    let fits = |t: NaiveTime| match hours {
        Some(h) => h.contains_slot(t, interval),
        None => offset_minutes(t, interval as i64).is_some(),
    };
    match time {
        Some(t) if fits(t) => RowMapping::Mapped {
            time: t,
            source: MappingSource::Extrapolated,
        },
        _ => RowMapping::Discarded,
    }
}

/// Build the complete row → time table for a grid.
///
/// # Arguments
/// * `row_count` - Number of rows in the grid
/// * `anchors` - Labeled rows
/// * `interval` - Detected slot interval in minutes
/// * `hours` - Operating hours bounding extrapolation, if configured
///
/// # Returns
/// A [`RowTimeMap`] with one entry per row, plus diagnostics for dropped
/// anchors, closed gaps, and discarded rows.
pub fn map_rows(
    row_count: usize,
    anchors: &[TimeAnchor],
    interval: u32,
    hours: Option<&OperatingHours>,
) -> MappedRows {
    let mut diagnostics = Vec::new();
    let mut rows = vec![RowMapping::Discarded; row_count];
    let interval = interval.max(1);

    let anchors = usable_anchors(anchors, row_count, &mut diagnostics);
    let (Some(first), Some(last)) = (anchors.first().copied(), anchors.last().copied()) else {
        return MappedRows {
            map: RowTimeMap {
                interval_minutes: interval,
                rows,
            },
            diagnostics,
        };
    };

    for row in 0..first.row_index {
        let steps = row as i64 - first.row_index as i64;
        rows[row] = extrapolated(&first, steps, interval, hours);
    }

    for anchor in &anchors {
        rows[anchor.row_index] = RowMapping::Mapped {
            time: anchor.time,
            source: MappingSource::Anchored,
        };
    }

    let label_rows = label_spacing(&anchors, interval);

    for pair in anchors.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let span_minutes = minutes_of_day(b.time) - minutes_of_day(a.time);
        let gap_rows = b.row_index - a.row_index;

        // Rows after `a` that can be stepped; the rest of the gap is closed.
        let expected = (span_minutes / interval) as usize;
        let stepped = if span_minutes % interval == 0 && gap_rows >= expected {
            expected - 1
        } else {
            // Short gap: rows before the next label position still belong to `a`.
            let before_next_label = label_rows.map_or(1, |step| step.min(gap_rows));
            (1..before_next_label)
                .take_while(|offset| (*offset as u32 + 1) * interval <= span_minutes)
                .count()
        };

        for offset in 1..gap_rows {
            let row = a.row_index + offset;
            rows[row] = if offset <= stepped {
                match offset_minutes(a.time, (offset as u32 * interval) as i64) {
                    Some(time) => RowMapping::Mapped {
                        time,
                        source: MappingSource::Interpolated,
                    },
                    None => RowMapping::Closed,
                }
            } else {
                RowMapping::Closed
            };
        }

        let closed_rows = (gap_rows - 1).saturating_sub(stepped);
        if closed_rows > 0 {
            log::debug!(
                "rows {}..{} ({} to {}) do not fit a {}-minute grid; {} rows closed",
                a.row_index,
                b.row_index,
                a.time.format("%H:%M"),
                b.time.format("%H:%M"),
                interval,
                closed_rows
            );
            diagnostics.push(Diagnostic::MappingGap {
                from_row: a.row_index,
                to_row: b.row_index,
                closed_rows,
            });
        }
    }

    for row in last.row_index + 1..row_count {
        let steps = (row - last.row_index) as i64;
        rows[row] = match extrapolated(&last, steps, interval, hours) {
            RowMapping::Discarded => {
                // Anything later is further out of hours.
                break;
            }
            mapping => mapping,
        };
    }

    let map = RowTimeMap {
        interval_minutes: interval,
        rows,
    };
    let discarded = map.discarded_rows();
    if discarded > 0 {
        diagnostics.push(Diagnostic::DiscardedRows { count: discarded });
    }

    MappedRows { map, diagnostics }
}
