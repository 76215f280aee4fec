//! Slot-interval detection from anchor spacing.
//!
//! For two consecutive anchors the per-row spacing is `Δminutes / Δrows`.
//! Pairs that straddle a lunch break show a larger spacing than the real
//! interval, but never an exact multiple that is itself a candidate. When
//! every exact pair agrees on one candidate spacing, that is the grid
//! interval; pairs that agree on more than one are ambiguous.

use crate::error::{SlotError, SlotResult};
use crate::models::{DetectedInterval, IntervalPolicy, TimeAnchor};
use crate::time::minutes_of_day;

/// Infer the slot interval of a grid.
///
/// # Arguments
/// * `anchors` - Labeled rows, in row order
/// * `policy` - Interval policy of the grid's source system
///
/// # Returns
/// * `Ok(DetectedInterval)` - High confidence when detected or fixed; low
///   confidence when the policy fallback was used
/// * `Err(SlotError::InsufficientEvidence)` - If there are no anchors at all
pub fn detect_interval(anchors: &[TimeAnchor], policy: &IntervalPolicy) -> SlotResult<DetectedInterval> {
    if anchors.is_empty() {
        return Err(SlotError::InsufficientEvidence);
    }

    let (candidates, fallback) = match policy {
        IntervalPolicy::Fixed(minutes) => return Ok(DetectedInterval::high(*minutes)),
        IntervalPolicy::AutoDetect {
            candidates,
            fallback,
        } => (candidates, *fallback),
    };

    let mut sorted = anchors.to_vec();
    sorted.sort_by_key(|a| a.row_index);

    // (Δminutes, Δrows) for every consecutive pair on distinct rows.
    let spans: Vec<(i64, i64)> = sorted
        .windows(2)
        .filter(|w| w[1].row_index > w[0].row_index)
        .map(|w| {
            (
                minutes_of_day(w[1].time) as i64 - minutes_of_day(w[0].time) as i64,
                (w[1].row_index - w[0].row_index) as i64,
            )
        })
        .collect();

    let mut observed: Vec<u32> = spans
        .iter()
        .filter(|(minutes, rows)| *minutes > 0 && minutes % rows == 0)
        .map(|(minutes, rows)| (minutes / rows) as u32)
        .filter(|spacing| candidates.contains(spacing))
        .collect();
    observed.sort_unstable();
    observed.dedup();

    let interval = match observed.as_slice() {
        [] => {
            log::debug!(
                "no candidate spacing among {} anchor pairs; assuming {} minutes",
                spans.len(),
                fallback
            );
            return Ok(DetectedInterval::low(fallback));
        }
        [single] => *single,
        several => {
            log::warn!(
                "anchor pairs disagree on the interval ({:?} minutes); assuming {} minutes",
                several,
                fallback
            );
            return Ok(DetectedInterval::low(fallback));
        }
    };

    // Rows packed tighter than the interval, or time running backwards,
    // contradict the detection.
    let contradicted = spans
        .iter()
        .any(|(minutes, rows)| *minutes < interval as i64 * rows);
    if contradicted {
        log::warn!(
            "anchor spacing contradicts a {}-minute interval; assuming {} minutes",
            interval,
            fallback
        );
        return Ok(DetectedInterval::low(fallback));
    }

    Ok(DetectedInterval::high(interval))
}
