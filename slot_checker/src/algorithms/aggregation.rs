//! Per-clinic roll-up of staff availability.

use chrono::{NaiveDate, Utc};

use crate::algorithms::availability::{count_blocks, find_free_runs};
use crate::config::{required_slots, ClinicSettings, StaffRules};
use crate::models::{
    ClinicCheckResult, Diagnostic, RoleSummary, StaffAvailability, StaffMember, StaffRole,
    TimelineEntry,
};
use crate::preprocessing::NormalizedGrid;

/// Assemble the check result of one clinic.
///
/// Staff matching an exclude pattern or disabled in the staff rules are
/// listed in `excluded_staff` and not counted. Grid columns missing from the
/// staff rules are counted as [`StaffRole::Unknown`] and reported as
/// configuration drift.
///
/// # Arguments
/// * `grid` - Normalized grid of the clinic
/// * `rules` - Staff rules of the clinic
/// * `settings` - Effective clinic settings
/// * `check_date` - Day the grid describes
///
/// # Returns
/// The immutable [`ClinicCheckResult`] for this clinic.
pub fn aggregate(
    grid: &NormalizedGrid,
    rules: &StaffRules,
    settings: &ClinicSettings,
    check_date: NaiveDate,
) -> ClinicCheckResult {
    let mut diagnostics = grid.diagnostics.clone();
    let mut excluded_staff = Vec::new();
    let mut staff = Vec::new();
    let mut timeline = Vec::new();

    for schedule in &grid.staff {
        let name = schedule.staff_id.as_str();
        if settings.is_excluded(name) {
            log::debug!("{}: '{}' matches an exclude pattern", grid.clinic, name);
            excluded_staff.push(name.to_string());
            continue;
        }

        let member = match rules.lookup(name) {
            Some(member) if !member.enabled => {
                log::debug!("{}: '{}' is disabled", grid.clinic, name);
                excluded_staff.push(name.to_string());
                continue;
            }
            Some(member) => member,
            None => {
                log::warn!(
                    "{}: staff '{}' is not in the staff rules, counting as {}",
                    grid.clinic,
                    name,
                    StaffRole::Unknown
                );
                diagnostics.push(Diagnostic::ConfigurationDrift {
                    staff_id: name.to_string(),
                });
                StaffMember::unconfigured(name)
            }
        };

        let required = required_slots(member.role, rules, settings, grid.interval.minutes);
        let runs = find_free_runs(name, &schedule.slots, required);
        let qualifying_blocks = runs.iter().filter(|r| r.qualifies).count();
        let block_capacity = count_blocks(&runs, required);

        timeline.extend(runs.iter().map(|run| TimelineEntry {
            staff_id: run.staff_id.clone(),
            role: member.role,
            start_time: run.start_time,
            end_time: run.end_time,
            slot_count: run.slot_count,
            qualifies: run.qualifies,
        }));

        staff.push(StaffAvailability {
            staff_id: member.staff_id,
            role: member.role,
            memo: member.memo,
            required_consecutive_slots: required,
            runs,
            qualifying_blocks,
            block_capacity,
        });
    }

    // Stable: staff keep grid column order at equal start times.
    timeline.sort_by_key(|entry| entry.start_time);

    let roles = StaffRole::ALL
        .iter()
        .filter_map(|&role| {
            let members: Vec<&StaffAvailability> = staff.iter().filter(|s| s.role == role).collect();
            (!members.is_empty()).then(|| RoleSummary {
                role,
                staff_count: members.len(),
                qualifying_blocks: members.iter().map(|s| s.qualifying_blocks).sum(),
            })
        })
        .collect();

    let total_qualifying_blocks = staff.iter().map(|s| s.qualifying_blocks).sum();
    let block_capacity = staff.iter().map(|s| s.block_capacity).sum();

    ClinicCheckResult {
        clinic: grid.clinic.clone(),
        check_date,
        interval: grid.interval,
        staff,
        excluded_staff,
        total_qualifying_blocks,
        block_capacity,
        minimum_blocks_required: settings.minimum_blocks_required,
        shortage: total_qualifying_blocks < settings.minimum_blocks_required,
        roles,
        timeline,
        diagnostics,
        grid_checksum: grid.checksum.clone(),
        checked_at: Utc::now(),
    }
}
