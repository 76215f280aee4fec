//! Integration tests for check runs over several clinics.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use slot_checker::config::ClinicConfig;
use slot_checker::models::CellState::{Booked, Free};
use slot_checker::models::{ClinicFailure, RawGrid, RawRow, SourceSystem, StaffColumn};
use slot_checker::services::OrchestratorSettings;
use slot_checker::{CheckOrchestrator, CheckerConfig, FileGridSource, GridSource, SourceError};

const CONFIG: &str = r#"
[settings]
minimum_blocks_required = 1

[[clinics]]
name = "駅前院"
system = "dent-sys"

[[clinics]]
name = "南口院"
system = "stransa"

[[clinics]]
name = "本院"
system = "stransa"

[staff."駅前院"]
doctors = ["橋本"]

[staff."南口院"]
hygienists = ["DH中山"]
"#;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// Stransa source where one clinic never answers in time.
struct SlowClinicSource {
    slow_clinic: String,
}

#[async_trait]
impl GridSource for SlowClinicSource {
    fn system(&self) -> SourceSystem {
        SourceSystem::Stransa
    }

    async fn fetch_grid(&self, clinic: &ClinicConfig, _date: NaiveDate) -> Result<RawGrid, SourceError> {
        if clinic.name == self.slow_clinic {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(RawGrid {
            clinic: clinic.name.clone(),
            system: SourceSystem::Stransa,
            rows: vec![
                RawRow {
                    index: 0,
                    label: Some("15:00".to_string()),
                },
                RawRow {
                    index: 1,
                    label: None,
                },
                RawRow {
                    index: 2,
                    label: None,
                },
            ],
            staff: vec![StaffColumn::from_states("DH中山", &[Free, Free, Booked])],
        })
    }
}

fn write_dent_sys_grid(dir: &std::path::Path) {
    let grid = RawGrid {
        clinic: "駅前院".to_string(),
        system: SourceSystem::DentSys,
        rows: ["9", "", "10", "", "20", "", "30"]
            .iter()
            .enumerate()
            .map(|(index, label)| RawRow {
                index,
                label: (!label.is_empty()).then(|| label.to_string()),
            })
            .collect(),
        staff: vec![StaffColumn::from_states(
            "橋本",
            &[Free, Free, Free, Free, Free, Free, Booked],
        )],
    };
    fs::write(
        dir.join("駅前院.json"),
        serde_json::to_string(&grid).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn test_run_deadline_keeps_finished_clinics() {
    let dir = tempdir().unwrap();
    write_dent_sys_grid(dir.path());

    let config = Arc::new(CheckerConfig::from_str(CONFIG).unwrap());
    let orchestrator = CheckOrchestrator::new(config)
        .with_source(Arc::new(FileGridSource::new(SourceSystem::DentSys, dir.path())))
        .with_source(Arc::new(SlowClinicSource {
            slow_clinic: "本院".to_string(),
        }))
        .with_settings(OrchestratorSettings {
            run_timeout: Duration::from_millis(300),
            ..OrchestratorSettings::default()
        });

    let result = orchestrator.run_enabled(None, date()).await;

    assert!(result.run_timed_out);
    assert_eq!(result.outcomes.len(), 3);

    let ekimae = result.outcomes[0].as_checked().unwrap();
    assert_eq!(ekimae.clinic.name, "駅前院");
    assert_eq!(ekimae.total_qualifying_blocks, 1);
    assert!(!ekimae.shortage);

    let minamiguchi = result.outcomes[1].as_checked().unwrap();
    assert_eq!(minamiguchi.interval.minutes, 15);
    assert_eq!(minamiguchi.staff[0].qualifying_ranges(), vec!["15:00-15:30".to_string()]);

    let honin = result.outcomes[2].as_failed().unwrap();
    assert_eq!(honin.clinic.name, "本院");
    assert_eq!(honin.kind, ClinicFailure::TimedOut);

    let summary = result.summary();
    assert_eq!(summary.clinics_with_availability, 2);
    assert_eq!(summary.failed_clinics, 1);
    assert_eq!(result.intervals.len(), 2);
}

#[tokio::test]
async fn test_system_filter_and_missing_grid_file() {
    let dir = tempdir().unwrap();
    let config = Arc::new(CheckerConfig::from_str(CONFIG).unwrap());
    let orchestrator = CheckOrchestrator::new(config)
        .with_source(Arc::new(FileGridSource::new(SourceSystem::DentSys, dir.path())));

    let result = orchestrator
        .run_enabled(Some(SourceSystem::DentSys), date())
        .await;

    assert_eq!(result.outcomes.len(), 1);
    let failure = result.outcomes[0].as_failed().unwrap();
    assert_eq!(failure.kind, ClinicFailure::Adapter);
    assert!(failure.message.contains("駅前院.json"));
    assert!(!result.run_timed_out);
}

#[tokio::test]
async fn test_unlabeled_grid_is_reported_per_clinic() {
    let dir = tempdir().unwrap();
    let grid = RawGrid {
        clinic: "駅前院".to_string(),
        system: SourceSystem::DentSys,
        rows: (0..3).map(|index| RawRow { index, label: None }).collect(),
        staff: vec![StaffColumn::from_states("橋本", &[Free; 3])],
    };
    fs::write(dir.path().join("駅前院.json"), serde_json::to_string(&grid).unwrap()).unwrap();

    let config = Arc::new(CheckerConfig::from_str(CONFIG).unwrap());
    let orchestrator = CheckOrchestrator::new(config)
        .with_source(Arc::new(FileGridSource::new(SourceSystem::DentSys, dir.path())));

    let result = orchestrator
        .run_enabled(Some(SourceSystem::DentSys), date())
        .await;

    assert_eq!(
        result.outcomes[0].as_failed().unwrap().kind,
        ClinicFailure::InsufficientEvidence
    );
}

#[tokio::test]
async fn test_run_result_round_trips_through_json() {
    let dir = tempdir().unwrap();
    write_dent_sys_grid(dir.path());
    let config = Arc::new(CheckerConfig::from_str(CONFIG).unwrap());
    let orchestrator = CheckOrchestrator::new(config)
        .with_source(Arc::new(FileGridSource::new(SourceSystem::DentSys, dir.path())));

    let result = orchestrator.run_enabled(None, date()).await;
    let json = serde_json::to_string(&result).unwrap();
    let restored: slot_checker::models::RunResult = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, result);
    assert_eq!(
        restored.outcomes[1].as_failed().unwrap().kind,
        ClinicFailure::SourceUnavailable
    );
}
