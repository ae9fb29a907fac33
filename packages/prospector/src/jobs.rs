//! Async job surface over the discovery engine.
//!
//! `submit` returns a queued job immediately and runs discovery on a
//! spawned worker; callers poll `get` for status, progress, and the
//! final result. Jobs live in an in-memory map behind one lock and are
//! never deleted automatically.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::orchestrator::{DiscoveryEngine, DiscoveryOutcome, DiscoveryRequest};
use crate::progress::{ProgressEvent, ProgressSink};

/// Lifecycle of a discovery job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Parameter echo stored on the job for operator inspection.
///
/// Carries counts rather than the exclusion list itself, which can be
/// large.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParams {
    pub location: Option<String>,
    pub radius_miles: Option<f64>,
    pub limit: Option<i64>,
    pub min_score: Option<i64>,
    pub discovery_mode: String,
    pub max_runtime_seconds: Option<f64>,
    pub exclude_record_keys_count: usize,
    pub dry_run: bool,
    pub extract_contacts: bool,
}

impl JobParams {
    fn from_request(request: &DiscoveryRequest) -> Self {
        Self {
            location: request.location.clone(),
            radius_miles: request.radius_miles,
            limit: request.limit,
            min_score: request.min_score,
            discovery_mode: request.discovery_mode.as_str().to_string(),
            max_runtime_seconds: request.max_runtime_seconds,
            exclude_record_keys_count: request.exclude_record_keys.len(),
            dry_run: request.dry_run,
            extract_contacts: request.extract_contacts,
        }
    }
}

/// One background discovery run, owned by the runner's job map.
///
/// Mutated only by the worker executing it; readers get snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryJob {
    pub id: String,
    pub status: JobStatus,
    pub step: String,
    pub message: String,
    /// 0-100, non-decreasing by convention (events without a progress
    /// value leave the prior value in place).
    pub progress: u8,
    pub stopped_early: bool,
    pub params: JobParams,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<DiscoveryOutcome>,
    pub error: Option<String>,
}

type JobMap = Arc<RwLock<HashMap<String, DiscoveryJob>>>;

/// Runs discovery jobs on background workers and serves status polls.
///
/// Each job gets its own spawned task, so multiple jobs may execute
/// concurrently; the map is the only state shared across them.
pub struct JobRunner {
    engine: Arc<DiscoveryEngine>,
    jobs: JobMap,
}

impl JobRunner {
    pub fn new(engine: Arc<DiscoveryEngine>) -> Self {
        Self {
            engine,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Queue a discovery run and start its worker.
    ///
    /// Parameter problems surface here, before any job exists. The
    /// returned snapshot is already `queued`; poll `get` for updates.
    pub fn submit(&self, request: DiscoveryRequest) -> Result<DiscoveryJob> {
        request.validate()?;

        let job_id = format!("explr-{}", &Uuid::new_v4().simple().to_string()[..12]);
        let now = Utc::now();
        let job = DiscoveryJob {
            id: job_id.clone(),
            status: JobStatus::Queued,
            step: "queued".to_string(),
            message: "Discovery job queued.".to_string(),
            progress: 0,
            stopped_early: false,
            params: JobParams::from_request(&request),
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        };
        let snapshot = job.clone();
        if let Ok(mut map) = self.jobs.write() {
            map.insert(job_id.clone(), job);
        }

        let engine = Arc::clone(&self.engine);
        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            run_job(engine, jobs, job_id, request).await;
        });
        Ok(snapshot)
    }

    /// Snapshot of one job, or `None` for an unknown id.
    pub fn get(&self, job_id: &str) -> Option<DiscoveryJob> {
        self.jobs.read().ok()?.get(job_id).cloned()
    }

    /// Snapshots of every job, newest first.
    pub fn jobs(&self) -> Vec<DiscoveryJob> {
        let mut all: Vec<DiscoveryJob> = self
            .jobs
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Synchronous variant for callers that don't need polling.
    pub async fn run_to_completion(
        &self,
        request: DiscoveryRequest,
        progress: ProgressSink,
    ) -> Result<DiscoveryOutcome> {
        self.engine.run_discovery(request, progress).await
    }
}

async fn run_job(engine: Arc<DiscoveryEngine>, jobs: JobMap, job_id: String, request: DiscoveryRequest) {
    update_job(&jobs, &job_id, |job| {
        job.status = JobStatus::Running;
        job.step = "starting".to_string();
        job.message = "Starting discovery pipeline...".to_string();
        job.progress = 1;
        job.started_at = Some(Utc::now());
    });

    let sink: ProgressSink = {
        let jobs = Arc::clone(&jobs);
        let job_id = job_id.clone();
        Arc::new(move |event: ProgressEvent| {
            update_job(&jobs, &job_id, |job| apply_event(job, &event));
        })
    };

    match engine.run_discovery(request, sink).await {
        Ok(outcome) => {
            info!(job_id = job_id.as_str(), matched = outcome.matched_count, "discovery job completed");
            update_job(&jobs, &job_id, |job| {
                job.status = JobStatus::Completed;
                job.step = "complete".to_string();
                job.message = format!("{} matches processed.", outcome.matched_count);
                job.progress = 100;
                job.finished_at = Some(Utc::now());
                job.result = Some(outcome);
            });
        }
        Err(err) => {
            error!(job_id = job_id.as_str(), error = %err, "discovery job failed");
            update_job(&jobs, &job_id, |job| {
                job.status = JobStatus::Failed;
                job.step = "error".to_string();
                job.message = format!("Discovery job failed: {err}");
                job.error = Some(error_chain(&err));
                job.finished_at = Some(Utc::now());
            });
        }
    }
}

/// Merge one progress event into the job. Progress only moves when the
/// event carries a value; step and message always follow the event.
fn apply_event(job: &mut DiscoveryJob, event: &ProgressEvent) {
    job.status = JobStatus::Running;
    job.step = event.step.clone();
    job.message = event.message.clone();
    if let Some(progress) = event.progress {
        job.progress = progress;
    }
    if event.stopped_early {
        job.stopped_early = true;
    }
}

fn update_job<F: FnOnce(&mut DiscoveryJob)>(jobs: &JobMap, job_id: &str, mutate: F) {
    if let Ok(mut map) = jobs.write() {
        if let Some(job) = map.get_mut(job_id) {
            mutate(job);
            job.updated_at = Utc::now();
        }
    }
}

const ERROR_CHAIN_LIMIT: usize = 5;

/// Error message plus up to four underlying causes, for operator
/// diagnosis of a failed worker.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        if parts.len() >= ERROR_CHAIN_LIMIT {
            break;
        }
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join("; caused by: ")
}
