//! Report jobs: trigger, background computation and retrieval

use std::{
    collections::{BTreeSet, HashSet},
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration as StdDuration,
};

use chrono::{DateTime, Utc};
use tokio::{sync::Semaphore, task::JoinSet, time::Instant};
use uuid::Uuid;

use crate::{
    config::ReportConfig,
    error::{AppError, AppResult},
    models::{
        report_job::{ReportJob, ReportJobStatus, TriggerReportResponse},
        store::StoreSnapshot,
    },
    repository::Repository,
    uptime::{
        compute_store_report, group_by_store, report_anchor, ReportOutcome, ReportRow,
        ReportSettings, StatusObservation, StoreFailure, StoreInput,
    },
};

/// Result of one report computation
#[derive(Debug, Clone)]
pub struct ReportRun {
    pub now: DateTime<Utc>,
    pub outcome: ReportOutcome,
}

/// What GET /get_report hands back
#[derive(Debug)]
pub enum ReportDownload {
    Running,
    Ready { file_name: String, contents: Vec<u8> },
}

/// Job ids currently executing in this process
#[derive(Clone, Default)]
struct RunningJobs(Arc<Mutex<HashSet<String>>>);

struct RunningGuard {
    jobs: RunningJobs,
    id: String,
}

impl RunningJobs {
    fn acquire(&self, id: &str) -> AppResult<RunningGuard> {
        let mut jobs = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !jobs.insert(id.to_string()) {
            return Err(AppError::Conflict(format!("report {} is already running", id)));
        }
        Ok(RunningGuard {
            jobs: self.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.jobs
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    config: ReportConfig,
    settings: ReportSettings,
    running: RunningJobs,
}

impl ReportsService {
    /// Fails when the report configuration is unusable
    pub fn new(repository: Repository, config: ReportConfig) -> AppResult<Self> {
        let settings = config.settings()?;
        Ok(Self {
            repository,
            config,
            settings,
            running: RunningJobs::default(),
        })
    }

    /// Register a job and start it in the background
    pub async fn trigger(&self) -> AppResult<TriggerReportResponse> {
        let report_id = Uuid::new_v4().simple().to_string();
        self.repository.reports.create(&report_id, Utc::now()).await?;

        let service = self.clone();
        let id = report_id.clone();
        tokio::spawn(async move {
            if let Err(e) = service.run_job(&id).await {
                tracing::error!("Report {} could not be run: {}", id, e);
            }
        });

        Ok(TriggerReportResponse {
            report_id,
            status: ReportJobStatus::Running,
        })
    }

    /// Execute a registered job and record its outcome
    pub async fn run_job(&self, id: &str) -> AppResult<()> {
        let _guard = self.running.acquire(id)?;
        tracing::info!("Report {} started", id);

        match self.generate(id, Utc::now()).await {
            Ok((path, run)) => {
                tracing::info!(
                    "Report {} complete: {} rows, {} failed stores, written to {}",
                    id,
                    run.outcome.rows.len(),
                    run.outcome.failures.len(),
                    path.display()
                );
                self.repository
                    .reports
                    .mark_complete(
                        id,
                        Utc::now(),
                        &path.to_string_lossy(),
                        run.outcome.rows.len() as i32,
                        &run.outcome.failures,
                    )
                    .await
            }
            Err(e) => {
                tracing::error!("Report {} failed: {}", id, e);
                self.repository
                    .reports
                    .mark_failed(id, Utc::now(), &e.to_string())
                    .await
            }
        }
    }

    /// Load the feeds, compute every store and write the CSV file
    async fn generate(&self, id: &str, wall_clock: DateTime<Utc>) -> AppResult<(PathBuf, ReportRun)> {
        let snapshot = self.repository.stores.load_snapshot().await?;
        let run = self.compute(snapshot, wall_clock).await;

        let dir = PathBuf::from(&self.config.output_dir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("report_{}_{}.csv", run.now.timestamp(), id));
        tokio::fs::write(&path, render_csv(&run.outcome.rows)?).await?;

        Ok((path, run))
    }

    /// Compute the report of a snapshot, one task per store
    pub async fn compute(&self, snapshot: StoreSnapshot, wall_clock: DateTime<Utc>) -> ReportRun {
        compute_snapshot(snapshot, wall_clock, self.settings, &self.config).await
    }

    /// Current state of a job, with the CSV contents once complete
    pub async fn download(&self, id: &str) -> AppResult<ReportDownload> {
        let job = self.repository.reports.get(id).await?;
        match job.job_status() {
            ReportJobStatus::Running => Ok(ReportDownload::Running),
            ReportJobStatus::Failed => Err(AppError::Internal(format!(
                "report generation failed: {}",
                job.error.unwrap_or_default()
            ))),
            ReportJobStatus::Complete => {
                let path = job
                    .csv_path
                    .map(PathBuf::from)
                    .ok_or_else(|| AppError::Internal("report file missing".to_string()))?;
                let contents = tokio::fs::read(&path)
                    .await
                    .map_err(|_| AppError::Internal("report file missing".to_string()))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| format!("report_{}.csv", id));
                Ok(ReportDownload::Ready { file_name, contents })
            }
        }
    }

    pub async fn get_job(&self, id: &str) -> AppResult<ReportJob> {
        self.repository.reports.get(id).await
    }
}

/// Compute the report of a snapshot, one task per store.
///
/// Works without a database, so feeds read straight from files can be
/// reported on as well.
pub async fn compute_snapshot(
    snapshot: StoreSnapshot,
    wall_clock: DateTime<Utc>,
    settings: ReportSettings,
    config: &ReportConfig,
) -> ReportRun {
    let observations: Vec<StatusObservation> = snapshot
        .statuses
        .iter()
        .filter_map(|record| record.to_observation())
        .collect();
    let now = report_anchor(&observations, wall_clock);

    let stores = group_by_store(
        observations,
        snapshot.business_hours.iter().map(|r| r.to_raw()).collect(),
        snapshot
            .timezones
            .into_iter()
            .map(|t| (t.store_id, t.timezone_str))
            .collect(),
    );
    tracing::info!("Computing uptime of {} stores at {}", stores.len(), now);

    let outcome = fan_out(stores, now, settings, config).await;
    ReportRun { now, outcome }
}

async fn fan_out(
    stores: Vec<StoreInput>,
    now: DateTime<Utc>,
    settings: ReportSettings,
    config: &ReportConfig,
) -> ReportOutcome {
    let permits = Arc::new(Semaphore::new(config.workers.max(1)));
    let deadline = Instant::now() + StdDuration::from_secs(config.time_budget_secs);

    let mut pending: BTreeSet<String> = stores.iter().map(|s| s.store_id.clone()).collect();
    let mut tasks = JoinSet::new();
    for store in stores {
        let permits = permits.clone();
        tasks.spawn(async move {
            let store_id = store.store_id.clone();
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Err(canceled(store_id)),
            };
            if Instant::now() >= deadline {
                return Err(canceled(store_id));
            }

            match tokio::task::spawn_blocking(move || compute_store_report(&store, &settings, now)).await {
                Ok(Ok(row)) => Ok(row),
                Ok(Err(e)) => {
                    tracing::warn!("Store {} skipped: {}", store_id, e);
                    Err(StoreFailure {
                        store_id,
                        message: e.to_string(),
                    })
                }
                Err(e) => Err(StoreFailure {
                    store_id,
                    message: format!("computation aborted: {}", e),
                }),
            }
        });
    }

    let mut outcome = ReportOutcome::default();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(row)) => {
                pending.remove(&row.store_id);
                outcome.rows.push(row);
            }
            Ok(Err(failure)) => {
                pending.remove(&failure.store_id);
                outcome.failures.push(failure);
            }
            Err(e) => tracing::error!("Store task panicked: {}", e),
        }
    }
    settle_missing(pending, &mut outcome);

    outcome.rows.sort_by(|a, b| a.store_id.cmp(&b.store_id));
    outcome.failures.sort_by(|a, b| a.store_id.cmp(&b.store_id));
    outcome
}

fn canceled(store_id: String) -> StoreFailure {
    tracing::warn!("Store {} canceled: time budget exhausted", store_id);
    StoreFailure {
        store_id,
        message: "canceled: report time budget exhausted".to_string(),
    }
}

/// Record stores whose task ended without a row or a failure
fn settle_missing(pending: BTreeSet<String>, outcome: &mut ReportOutcome) {
    for store_id in pending {
        tracing::warn!("Store {} lost: its task did not complete", store_id);
        outcome.failures.push(StoreFailure {
            store_id,
            message: "computation aborted: store task did not complete".to_string(),
        });
    }
}

/// Render report rows as CSV, header included even when empty
pub fn render_csv(rows: &[ReportRow]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(ReportRow::CSV_HEADER.split(','))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV buffer: {}", e)))
}
