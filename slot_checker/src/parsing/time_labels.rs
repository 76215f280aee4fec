//! Resolve raw left-hand grid labels into time anchors.
//!
//! dent-sys.net prints the hour once (`9`) on the first row of each hour and
//! only the minutes (`10`, `20`, ...) on later labeled rows, while Stransa
//! prints full `H:MM` labels. Both shapes are handled here. Time always moves
//! forward down the grid, which is what separates an hour marker from a
//! minute marker: `10` after `9:50` cannot be 9:10, so it is 10:00.

use chrono::NaiveTime;

use crate::models::{RawRow, TimeAnchor};
use crate::time::{from_minutes, minutes_of_day};

/// Parse an `H:MM` / `HH:MM` label.
pub fn parse_clock_label(text: &str) -> Option<NaiveTime> {
    let (h, m) = text.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_number_label(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || text.len() > 2 || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Resolve the labeled rows of a grid into anchors, in row order.
///
/// Rows without a label, or whose label cannot move time forward, produce no
/// anchor.
pub fn resolve_anchors(rows: &[RawRow]) -> Vec<TimeAnchor> {
    let mut anchors: Vec<TimeAnchor> = Vec::new();
    let mut current_hour: Option<u32> = None;

    for row in rows {
        let Some(label) = row.label.as_deref() else {
            continue;
        };
        let previous = anchors.last().map(|a| minutes_of_day(a.time) as i64);

        if let Some(time) = parse_clock_label(label) {
            if previous.map_or(true, |p| (minutes_of_day(time) as i64) > p) {
                current_hour = Some(minutes_of_day(time) / 60);
                anchors.push(TimeAnchor::new(row.index, time));
            }
            continue;
        }

        let Some(value) = parse_number_label(label) else {
            continue;
        };

        let resolved = match current_hour {
            None => (value <= 23).then(|| (value, value as i64 * 60)),
            Some(hour) => {
                let as_minute = hour as i64 * 60 + value as i64;
                let as_hour = value as i64 * 60;
                let forward = |t: i64| previous.map_or(true, |p| t > p);
                if value < 60 && forward(as_minute) {
                    Some((hour, as_minute))
                } else if value <= 23 && value >= hour && forward(as_hour) {
                    Some((value, as_hour))
                } else {
                    None
                }
            }
        };

        match resolved.and_then(|(hour, minutes)| from_minutes(minutes).map(|t| (hour, t))) {
            Some((hour, time)) => {
                current_hour = Some(hour);
                anchors.push(TimeAnchor::new(row.index, time));
            }
            None => log::debug!("row {}: label '{}' is not a time marker", row.index, label),
        }
    }

    anchors
}
