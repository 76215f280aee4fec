//! Run orchestration across clinics and booking systems.
//!
//! Every clinic is checked in its own tokio task. A semaphore per booking
//! system bounds how many clinics of that system are fetched at once, and
//! the per-clinic timeout only starts once the permit is held. A run-level
//! deadline aborts whatever is still running; those clinics are reported as
//! timed out while completed clinics keep their full results.

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;

use crate::algorithms::aggregate;
use crate::config::{CheckerConfig, ClinicConfig, ClinicSettings, RunSettings, StaffRules};
use crate::models::{
    ClinicCheckError, ClinicFailure, ClinicId, ClinicOutcome, IntervalReport, RunResult,
    SourceSystem,
};
use crate::preprocessing::GridIngestor;
use crate::services::source::GridSource;

/// Concurrency and timeout limits applied by [`CheckOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub dent_sys_concurrency: usize,
    pub stransa_concurrency: usize,
    pub clinic_timeout: Duration,
    pub run_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&RunSettings::default())
    }
}

impl From<&RunSettings> for OrchestratorSettings {
    fn from(run: &RunSettings) -> Self {
        Self {
            dent_sys_concurrency: run.dent_sys_concurrency,
            stransa_concurrency: run.stransa_concurrency,
            clinic_timeout: run.clinic_timeout(),
            run_timeout: run.run_timeout(),
        }
    }
}

impl OrchestratorSettings {
    fn concurrency_for(&self, system: SourceSystem) -> usize {
        let limit = match system {
            SourceSystem::DentSys => self.dent_sys_concurrency,
            SourceSystem::Stransa => self.stransa_concurrency,
        };
        limit.max(1)
    }
}

/// Everything a clinic task needs, owned so the task can be `'static`.
struct ClinicJob {
    clinic: ClinicConfig,
    settings: ClinicSettings,
    rules: StaffRules,
    source: Arc<dyn GridSource>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    date: NaiveDate,
}

impl ClinicJob {
    fn clinic_id(&self) -> ClinicId {
        ClinicId::new(self.clinic.name.clone(), self.clinic.system)
    }

    async fn run(self) -> ClinicOutcome {
        let clinic_id = self.clinic_id();
        let _permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                return failed(clinic_id, ClinicFailure::Internal, e.to_string());
            }
        };

        log::info!("{}: checking {}", clinic_id, self.date);
        let fetched = tokio::time::timeout(
            self.timeout,
            self.source.fetch_grid(&self.clinic, self.date),
        )
        .await;

        let mut grid = match fetched {
            Ok(Ok(grid)) => grid,
            Ok(Err(e)) => return failed(clinic_id, ClinicFailure::from(&e), e.to_string()),
            Err(_) => {
                return failed(
                    clinic_id,
                    ClinicFailure::TimedOut,
                    format!("clinic check exceeded {}s", self.timeout.as_secs_f64()),
                )
            }
        };

        if grid.system != self.clinic.system {
            return failed(
                clinic_id,
                ClinicFailure::Adapter,
                format!("adapter returned a {} grid", grid.system),
            );
        }
        if grid.clinic != self.clinic.name {
            log::warn!("{}: adapter labeled the grid '{}'", clinic_id, grid.clinic);
            grid.clinic = self.clinic.name.clone();
        }

        let ingestor = GridIngestor::with_config(self.settings.ingest_config());
        match ingestor.ingest(&grid) {
            Ok(normalized) => {
                let result = aggregate(&normalized, &self.rules, &self.settings, self.date);
                log::info!(
                    "{}: {} qualifying blocks (minimum {}){}",
                    clinic_id,
                    result.total_qualifying_blocks,
                    result.minimum_blocks_required,
                    if result.shortage { ", shortage" } else { "" }
                );
                ClinicOutcome::Checked(result)
            }
            Err(e) => failed(clinic_id, ClinicFailure::from(&e), e.to_string()),
        }
    }
}

fn failed(clinic: ClinicId, kind: ClinicFailure, message: impl Into<String>) -> ClinicOutcome {
    let error = ClinicCheckError::new(clinic, kind, message);
    log::warn!("{}: {} ({})", error.clinic, error.kind, error.message);
    ClinicOutcome::Failed(error)
}

/// Places finished tasks back at their configuration position.
struct Collector<'a> {
    clinics: &'a [ClinicConfig],
    positions: HashMap<Id, usize>,
    outcomes: Vec<Option<ClinicOutcome>>,
}

impl Collector<'_> {
    fn record(&mut self, joined: Result<(Id, ClinicOutcome), JoinError>) {
        let (id, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                let id = e.id();
                let Some(&index) = self.positions.get(&id) else {
                    return;
                };
                if e.is_cancelled() {
                    // Left empty; reported as timed out after the run.
                    return;
                }
                let clinic = &self.clinics[index];
                let outcome = failed(
                    ClinicId::new(clinic.name.clone(), clinic.system),
                    ClinicFailure::Internal,
                    format!("clinic task failed: {}", e),
                );
                (id, outcome)
            }
        };
        if let Some(&index) = self.positions.get(&id) {
            self.outcomes[index] = Some(outcome);
        }
    }
}

/// Runs clinic checks against the registered grid sources.
pub struct CheckOrchestrator {
    config: Arc<CheckerConfig>,
    settings: OrchestratorSettings,
    sources: HashMap<SourceSystem, Arc<dyn GridSource>>,
}

impl CheckOrchestrator {
    /// Create an orchestrator with limits taken from the `[run]` section.
    pub fn new(config: Arc<CheckerConfig>) -> Self {
        let settings = OrchestratorSettings::from(&config.run);
        Self {
            config,
            settings,
            sources: HashMap::new(),
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register the adapter of a booking system, replacing any previous one.
    pub fn with_source(mut self, source: Arc<dyn GridSource>) -> Self {
        self.sources.insert(source.system(), source);
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Check all enabled clinics, optionally restricted to one system.
    pub async fn run_enabled(&self, system: Option<SourceSystem>, date: NaiveDate) -> RunResult {
        let clinics: Vec<ClinicConfig> = self
            .config
            .enabled_clinics(system)
            .into_iter()
            .cloned()
            .collect();
        self.run(&clinics, date).await
    }

    /// Check the given clinics for `date`.
    ///
    /// # Arguments
    /// * `clinics` - Clinics in configuration order
    /// * `date` - Day to check
    ///
    /// # Returns
    /// A [`RunResult`] with exactly one outcome per clinic, in the order given.
    /// Clinic failures never abort the run.
    pub async fn run(&self, clinics: &[ClinicConfig], date: NaiveDate) -> RunResult {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.settings.run_timeout;
        log::info!("checking {} clinics for {}", clinics.len(), date);

        let semaphores: HashMap<SourceSystem, Arc<Semaphore>> =
            [SourceSystem::DentSys, SourceSystem::Stransa]
                .into_iter()
                .map(|s| (s, Arc::new(Semaphore::new(self.settings.concurrency_for(s)))))
                .collect();

        let mut collector = Collector {
            clinics,
            positions: HashMap::new(),
            outcomes: vec![None; clinics.len()],
        };
        let mut tasks = JoinSet::new();

        for (index, clinic) in clinics.iter().enumerate() {
            let (Some(source), Some(semaphore)) = (
                self.sources.get(&clinic.system),
                semaphores.get(&clinic.system),
            ) else {
                collector.outcomes[index] = Some(failed(
                    ClinicId::new(clinic.name.clone(), clinic.system),
                    ClinicFailure::SourceUnavailable,
                    format!("no grid source registered for {}", clinic.system),
                ));
                continue;
            };

            let job = ClinicJob {
                clinic: clinic.clone(),
                settings: self.config.settings_for(clinic),
                rules: self.config.staff_rules_for(&clinic.name),
                source: Arc::clone(source),
                semaphore: Arc::clone(semaphore),
                timeout: self.settings.clinic_timeout,
                date,
            };
            let handle = tasks.spawn(job.run());
            collector.positions.insert(handle.id(), index);
        }

        let drained = tokio::time::timeout_at(deadline, async {
            while let Some(joined) = tasks.join_next_with_id().await {
                collector.record(joined);
            }
        })
        .await;

        let run_timed_out = drained.is_err();
        if run_timed_out {
            log::warn!(
                "run deadline of {}s reached, aborting {} clinic checks",
                self.settings.run_timeout.as_secs_f64(),
                tasks.len()
            );
            tasks.abort_all();
            while let Some(joined) = tasks.join_next_with_id().await {
                collector.record(joined);
            }
        }

        let outcomes: Vec<ClinicOutcome> = collector
            .outcomes
            .into_iter()
            .zip(clinics)
            .map(|(outcome, clinic)| {
                outcome.unwrap_or_else(|| {
                    failed(
                        ClinicId::new(clinic.name.clone(), clinic.system),
                        ClinicFailure::TimedOut,
                        "aborted at the run deadline",
                    )
                })
            })
            .collect();

        let intervals = outcomes
            .iter()
            .filter_map(ClinicOutcome::as_checked)
            .map(|r| IntervalReport {
                clinic: r.clinic.clone(),
                minutes: r.interval.minutes,
                confidence: r.interval.confidence,
            })
            .collect();

        let result = RunResult {
            check_date: date,
            started_at,
            finished_at: Utc::now(),
            run_timed_out,
            outcomes,
            intervals,
        };

        let summary = result.summary();
        log::info!(
            "run finished: {} clinics, {} with availability, {} short, {} failed",
            summary.total_clinics,
            summary.clinics_with_availability,
            summary.clinics_with_shortage,
            summary.failed_clinics
        );
        result
    }
}
