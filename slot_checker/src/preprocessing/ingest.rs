use crate::error::{SlotError, SlotResult};
use crate::models::{
    CellState, ClinicId, DetectedInterval, Diagnostic, IntervalPolicy, RawGrid, RowTimeMap,
    StaffSchedule, TimeSlot,
};
use crate::parsing::time_labels::resolve_anchors;
use crate::preprocessing::interval::detect_interval;
use crate::preprocessing::row_time_map::{map_rows, OperatingHours};

/// A raw grid after validation, interval detection, and row mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGrid {
    pub clinic: ClinicId,
    pub interval: DetectedInterval,
    pub row_map: RowTimeMap,
    /// Staff in grid column order; only mapped rows become slots.
    pub staff: Vec<StaffSchedule>,
    pub diagnostics: Vec<Diagnostic>,
    pub checksum: String,
}

/// Configuration for grid ingestion
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    /// Overrides the source system's interval policy.
    pub interval_policy: Option<IntervalPolicy>,
    pub operating_hours: Option<OperatingHours>,
}

/// Turns raw adapter grids into normalized per-staff slot sequences.
#[derive(Debug, Clone, Default)]
pub struct GridIngestor {
    config: IngestConfig,
}

impl GridIngestor {
    /// Create an ingestor using each source system's own interval policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an ingestor with custom configuration
    pub fn with_config(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Normalize one clinic grid.
    ///
    /// # Arguments
    /// * `grid` - Raw grid from a source adapter
    ///
    /// # Returns
    /// * `Ok(NormalizedGrid)` - Time-mapped slot sequences per staff member
    /// * `Err(SlotError::MalformedGrid)` - If rows or cells are inconsistent
    /// * `Err(SlotError::InsufficientEvidence)` - If no row carries a time label
    pub fn ingest(&self, grid: &RawGrid) -> SlotResult<NormalizedGrid> {
        validate_shape(grid)?;

        let clinic = ClinicId::new(grid.clinic.clone(), grid.system);
        let policy = self
            .config
            .interval_policy
            .clone()
            .unwrap_or_else(|| grid.system.interval_policy());

        let anchors = resolve_anchors(&grid.rows);
        let interval = detect_interval(&anchors, &policy)?;

        let mut diagnostics = Vec::new();
        if interval.is_low_confidence() {
            log::warn!(
                "{}: slot interval could not be detected, assuming {} minutes",
                clinic,
                interval.minutes
            );
            diagnostics.push(Diagnostic::LowConfidenceInterval {
                minutes: interval.minutes,
            });
        }

        let mapped = map_rows(
            grid.rows.len(),
            &anchors,
            interval.minutes,
            self.config.operating_hours.as_ref(),
        );
        diagnostics.extend(mapped.diagnostics);
        let row_map = mapped.map;

        let staff = grid
            .staff
            .iter()
            .map(|column| {
                let mut states = vec![CellState::Unknown; grid.rows.len()];
                for cell in &column.cells {
                    states[cell.row_index] = cell.state;
                }
                let slots = row_map
                    .mapped()
                    .map(|(row_index, start_time)| TimeSlot {
                        row_index,
                        start_time,
                        duration_minutes: interval.minutes,
                        state: states[row_index],
                    })
                    .collect();
                StaffSchedule {
                    staff_id: column.staff_id.clone(),
                    slots,
                }
            })
            .collect();

        log::debug!(
            "{}: {} rows ({} anchors, {} closed), {} staff, {}-minute slots",
            clinic,
            row_map.len(),
            anchors.len(),
            row_map.closed_rows(),
            grid.staff.len(),
            interval.minutes
        );

        Ok(NormalizedGrid {
            clinic,
            interval,
            row_map,
            staff,
            diagnostics,
            checksum: grid.checksum(),
        })
    }
}

fn validate_shape(grid: &RawGrid) -> SlotResult<()> {
    for (position, row) in grid.rows.iter().enumerate() {
        if row.index != position {
            return Err(SlotError::MalformedGrid(format!(
                "row at position {} has index {}",
                position, row.index
            )));
        }
    }

    for column in &grid.staff {
        if column.staff_id.trim().is_empty() {
            return Err(SlotError::MalformedGrid("staff column without a name".to_string()));
        }
        let mut seen = vec![false; grid.rows.len()];
        for cell in &column.cells {
            if cell.staff_id != column.staff_id {
                return Err(SlotError::MalformedGrid(format!(
                    "cell for '{}' found in column '{}'",
                    cell.staff_id, column.staff_id
                )));
            }
            match seen.get_mut(cell.row_index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(SlotError::MalformedGrid(format!(
                        "duplicate cell for '{}' on row {}",
                        column.staff_id, cell.row_index
                    )))
                }
                None => {
                    return Err(SlotError::MalformedGrid(format!(
                        "cell for '{}' on row {} outside {} rows",
                        column.staff_id,
                        cell.row_index,
                        grid.rows.len()
                    )))
                }
            }
        }
    }
    Ok(())
}
