//! Free-run detection over a staff member's slot sequence.

use crate::models::{FreeRun, TimeSlot};

struct OpenRun<'a> {
    first: &'a TimeSlot,
    last: &'a TimeSlot,
    slot_count: usize,
}

impl OpenRun<'_> {
    fn close(self, staff_id: &str, required: usize) -> FreeRun {
        FreeRun {
            staff_id: staff_id.to_string(),
            start_time: self.first.start_time,
            // A slot ending exactly at midnight has no representable end.
            end_time: self.last.end_time().unwrap_or(self.last.start_time),
            slot_count: self.slot_count,
            qualifies: self.slot_count >= required,
        }
    }
}

/// Find every maximal run of consecutive free slots.
///
/// Booked, closed, and unknown slots end a run, and so does a gap in time
/// between two neighbouring slots (rows dropped as closed during mapping).
///
/// # Arguments
/// * `staff_id` - Owner of the slots
/// * `slots` - Slots in row order
/// * `required_consecutive_slots` - Minimum run length that qualifies
///
/// # Returns
/// Runs in time order, each annotated with `qualifies`.
pub fn find_free_runs(
    staff_id: &str,
    slots: &[TimeSlot],
    required_consecutive_slots: usize,
) -> Vec<FreeRun> {
    let mut runs = Vec::new();
    let mut current: Option<OpenRun> = None;

    for slot in slots {
        if !slot.state.is_free() {
            if let Some(run) = current.take() {
                runs.push(run.close(staff_id, required_consecutive_slots));
            }
            continue;
        }

        if let Some(run) = current.as_mut() {
            if run.last.is_followed_by(slot) {
                run.last = slot;
                run.slot_count += 1;
                continue;
            }
        }

        let previous = current.replace(OpenRun {
            first: slot,
            last: slot,
            slot_count: 1,
        });
        if let Some(run) = previous {
            runs.push(run.close(staff_id, required_consecutive_slots));
        }
    }

    if let Some(run) = current {
        runs.push(run.close(staff_id, required_consecutive_slots));
    }
    runs
}

/// Number of whole bookings of `required` slots that fit into the runs.
pub fn count_blocks(runs: &[FreeRun], required_consecutive_slots: usize) -> usize {
    let required = required_consecutive_slots.max(1);
    runs.iter().map(|r| r.slot_count / required).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellState::{self, Booked, Closed, Free, Unknown};
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slots_from(start: NaiveTime, minutes: u32, states: &[CellState]) -> Vec<TimeSlot> {
        states
            .iter()
            .enumerate()
            .map(|(i, state)| TimeSlot {
                row_index: i,
                start_time: crate::time::offset_minutes(start, (i as u32 * minutes) as i64).unwrap(),
                duration_minutes: minutes,
                state: *state,
            })
            .collect()
    }

    #[test]
    fn test_single_qualifying_run() {
        let slots = slots_from(t(9, 0), 5, &[Free, Free, Free, Free, Free, Free, Booked]);
        let runs = find_free_runs("橋本", &slots, 6);

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].slot_count, 6);
        assert!(runs[0].qualifies);
        assert_eq!(runs[0].start_time, t(9, 0));
        assert_eq!(runs[0].end_time, t(9, 30));
        assert_eq!(runs[0].to_string(), "9:00-9:30");
    }

    #[test]
    fn test_booked_slot_splits_runs() {
        let slots = slots_from(t(9, 0), 5, &[Free, Free, Free, Free, Free, Booked, Free]);
        let runs = find_free_runs("橋本", &slots, 6);

        let counts: Vec<usize> = runs.iter().map(|r| r.slot_count).collect();
        assert_eq!(counts, vec![5, 1]);
        assert!(runs.iter().all(|r| !r.qualifies));
        assert_eq!(runs[1].start_time, t(9, 30));
    }

    #[test]
    fn test_closed_and_unknown_terminate() {
        let slots = slots_from(t(14, 0), 15, &[Free, Closed, Free, Unknown, Free, Free]);
        let counts: Vec<usize> = find_free_runs("DH中山", &slots, 2)
            .iter()
            .map(|r| r.slot_count)
            .collect();
        assert_eq!(counts, vec![1, 1, 2]);
    }

    #[test]
    fn test_time_gap_terminates() {
        let mut slots = slots_from(t(11, 50), 5, &[Free, Free]);
        slots.extend(slots_from(t(13, 0), 5, &[Free, Free]));
        let runs = find_free_runs("橋本", &slots, 3);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].end_time, t(12, 0));
        assert_eq!(runs[1].start_time, t(13, 0));
    }

    #[test]
    fn test_empty_and_all_booked() {
        assert!(find_free_runs("橋本", &[], 1).is_empty());
        let slots = slots_from(t(9, 0), 10, &[Booked, Booked]);
        assert!(find_free_runs("橋本", &slots, 1).is_empty());
    }

    #[test]
    fn test_count_blocks() {
        let slots = slots_from(t(9, 0), 5, &[Free; 13]);
        let runs = find_free_runs("橋本", &slots, 6);
        assert_eq!(runs.len(), 1);
        assert_eq!(count_blocks(&runs, 6), 2);
        assert_eq!(count_blocks(&runs, 0), 13);
    }
}
