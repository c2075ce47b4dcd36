// JobController - download job lifecycle as seen from the client
//
// Idle -> Submitting -> Polling -> Completed | Failed
//
// One status request is in flight at a time; the next poll is only scheduled
// after the previous response has been applied. Each `start` (and `cancel`)
// bumps a generation counter, so an older loop notices it has been superseded
// at its next suspension point and a response arriving late is dropped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::errors::ClientError;
use super::metadata::is_playlist;
use super::models::{DownloadRequest, JobSnapshot, JobStatus};
use super::schemes::{ApiScheme, SchemeKind};
use super::traits::{Scheduler, Transport};

/// Poll cadence and limits
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay between the end of one status response and the next request
    pub interval: Duration,
    /// Send the first status request right after submission instead of after one interval
    pub poll_immediately: bool,
    /// Never schedule more than this much delay in total; the loop fails instead of
    /// starting a sleep that would cross it. `None` polls until a terminal status
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn for_scheme(kind: SchemeKind) -> Self {
        Self {
            interval: Duration::from_millis(kind.default_poll_interval_ms()),
            poll_immediately: kind.default_poll_immediately(),
            timeout: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::for_scheme(SchemeKind::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Submitting,
    Polling { job_id: String },
    Completed { job_id: String, file_url: String },
    Failed { job_id: Option<String>, error: ClientError },
    /// Stopped by the caller; the backend job itself is left alone
    Cancelled { job_id: Option<String> },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Polling { job_id } | Self::Completed { job_id, .. } => Some(job_id),
            Self::Failed { job_id, .. } | Self::Cancelled { job_id } => job_id.as_deref(),
            Self::Idle | Self::Submitting => None,
        }
    }
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed { job_id: String, file_url: String },
    Failed(ClientError),
    Cancelled,
}

/// A submitted job, tied to the `start` call that created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    job_id: String,
    generation: u64,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

struct Inner {
    state: JobState,
    job: Option<JobSnapshot>,
}

/// Stops the controller's current poll loop; cheap to clone into UI teardown code
#[derive(Clone)]
pub struct CancelHandle {
    generation: Arc<AtomicU64>,
    inner: Arc<Mutex<Inner>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let mut inner = lock(&self.inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let JobState::Submitting | JobState::Polling { .. } = inner.state {
            let job_id = inner.state.job_id().map(str::to_string);
            tracing::info!("[Job] Polling cancelled for {:?}", job_id);
            inner.state = JobState::Cancelled { job_id };
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct JobController {
    transport: Arc<dyn Transport>,
    scheme: Arc<dyn ApiScheme>,
    scheduler: Arc<dyn Scheduler>,
    policy: PollPolicy,
    generation: Arc<AtomicU64>,
    inner: Arc<Mutex<Inner>>,
}

impl JobController {
    pub fn new(
        transport: Arc<dyn Transport>,
        scheme: Arc<dyn ApiScheme>,
        scheduler: Arc<dyn Scheduler>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            transport,
            scheme,
            scheduler,
            policy,
            generation: Arc::new(AtomicU64::new(0)),
            inner: Arc::new(Mutex::new(Inner {
                state: JobState::Idle,
                job: None,
            })),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn state(&self) -> JobState {
        lock(&self.inner).state.clone()
    }

    /// Last status the backend reported for the current job
    pub fn job(&self) -> Option<JobSnapshot> {
        lock(&self.inner).job.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            generation: self.generation.clone(),
            inner: self.inner.clone(),
        }
    }

    /// Stop the current poll loop. No request is sent to the backend
    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    /// Link to the finished file of a job
    pub fn file_url(&self, job_id: &str) -> String {
        self.transport.endpoint(&self.scheme.file_path(job_id))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Apply `f` to the state only if `generation` still owns the controller
    fn update(&self, generation: u64, f: impl FnOnce(&mut Inner)) -> bool {
        let mut inner = lock(&self.inner);
        if !self.is_current(generation) {
            return false;
        }
        f(&mut inner);
        true
    }

    fn validate(&self, request: &DownloadRequest) -> Result<(), ClientError> {
        if request.url.trim().is_empty() {
            return Err(ClientError::Validation("Video URL is required".to_string()));
        }
        if is_playlist(&request.url) {
            return Err(ClientError::UnsupportedInput(
                "Playlists are not supported; paste a single video link".to_string(),
            ));
        }
        if self.scheme.format_required(request.media_type) && request.selected_format().is_none() {
            return Err(ClientError::Validation(format!(
                "Select a quality before downloading {}",
                request.media_type
            )));
        }
        Ok(())
    }

    /// Submit a download job. Any loop still running for this controller is stopped first.
    pub async fn start(&self, request: DownloadRequest) -> Result<JobHandle, ClientError> {
        let generation = {
            let mut inner = lock(&self.inner);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            inner.state = JobState::Submitting;
            inner.job = None;
            generation
        };

        if let Err(error) = self.validate(&request) {
            tracing::warn!("[Job] Rejected before submission: {}", error);
            self.update(generation, |inner| {
                inner.state = JobState::Failed {
                    job_id: None,
                    error: error.clone(),
                }
            });
            return Err(error);
        }

        tracing::info!(
            "[Job] Submitting {} download of {} (format: {:?}, scheme: {})",
            request.media_type,
            request.url,
            request.selected_format(),
            self.scheme.name()
        );
        let response = self
            .transport
            .post_json(self.scheme.download_path(), self.scheme.download_body(&request))
            .await
            .and_then(|body| self.scheme.parse_job_id(body));

        let job_id = match response {
            Ok(job_id) => job_id,
            Err(e) => {
                let error = ClientError::submission(e);
                tracing::warn!("[Job] Submission failed: {}", error);
                self.update(generation, |inner| {
                    inner.state = JobState::Failed {
                        job_id: None,
                        error: error.clone(),
                    }
                });
                return Err(error);
            }
        };

        tracing::info!("[Job] Started job {}", job_id);
        self.update(generation, |inner| {
            inner.state = JobState::Polling {
                job_id: job_id.clone(),
            };
            inner.job = Some(JobSnapshot::pending(job_id.clone()));
        });

        Ok(JobHandle { job_id, generation })
    }

    /// Poll until the job completes, fails, or this loop is cancelled/superseded.
    /// `on_update` sees every applied status, in arrival order.
    pub async fn run<F>(&self, handle: &JobHandle, mut on_update: F) -> JobOutcome
    where
        F: FnMut(&JobSnapshot),
    {
        let status_path = self.scheme.status_path(&handle.job_id);
        let interval = self.policy.interval;
        let mut waited = Duration::ZERO;
        let mut polls: u32 = 0;

        loop {
            if !self.is_current(handle.generation) {
                return JobOutcome::Cancelled;
            }

            if polls > 0 || !self.policy.poll_immediately {
                if let Some(limit) = self.policy.timeout {
                    if waited + interval > limit {
                        let error = ClientError::Poll(format!(
                            "No result after {}s of polling",
                            limit.as_secs()
                        ));
                        return self.fail(handle, error);
                    }
                }
                self.scheduler.sleep(interval).await;
                waited += interval;
                if !self.is_current(handle.generation) {
                    return JobOutcome::Cancelled;
                }
            }

            polls += 1;
            let result = self
                .transport
                .get_json(&status_path)
                .await
                .and_then(|body| self.scheme.parse_status(&handle.job_id, body));

            if !self.is_current(handle.generation) {
                tracing::debug!("[Job] Dropping late status for {}", handle.job_id);
                return JobOutcome::Cancelled;
            }

            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("[Job] Status request #{} for {} failed: {}", polls, handle.job_id, e);
                    return self.fail(handle, ClientError::poll(e));
                }
            };

            let Some(snapshot) = self.apply(handle, snapshot) else {
                return JobOutcome::Cancelled;
            };
            tracing::debug!(
                "[Job] {} poll #{}: {} {:.1}% {}",
                handle.job_id,
                polls,
                snapshot.status,
                snapshot.progress,
                snapshot.text
            );
            on_update(&snapshot);

            match snapshot.status {
                JobStatus::Completed => {
                    let file_url = self.file_url(&handle.job_id);
                    tracing::info!("[Job] {} completed after {} polls: {}", handle.job_id, polls, file_url);
                    self.update(handle.generation, |inner| {
                        inner.state = JobState::Completed {
                            job_id: handle.job_id.clone(),
                            file_url: file_url.clone(),
                        }
                    });
                    return JobOutcome::Completed {
                        job_id: handle.job_id.clone(),
                        file_url,
                    };
                }
                JobStatus::Error => {
                    return self.fail(handle, ClientError::Job(snapshot.failure_message()));
                }
                JobStatus::Pending | JobStatus::Downloading => {}
            }
        }
    }

    /// Submit and poll to the end; returns the file URL
    pub async fn download<F>(&self, request: DownloadRequest, on_update: F) -> Result<String, ClientError>
    where
        F: FnMut(&JobSnapshot),
    {
        let handle = self.start(request).await?;
        match self.run(&handle, on_update).await {
            JobOutcome::Completed { file_url, .. } => Ok(file_url),
            JobOutcome::Failed(error) => Err(error),
            JobOutcome::Cancelled => {
                Err(ClientError::Cancelled("Download was cancelled".to_string()))
            }
        }
    }

    /// Save a completed job's file into `dir`
    pub async fn fetch_file(&self, job_id: &str, dir: &Path) -> Result<PathBuf, ClientError> {
        let fallback = format!("download-{}", job_id);
        self.transport
            .download_to(&self.scheme.file_path(job_id), dir, &fallback)
            .await
            .map_err(ClientError::file)
    }

    // Keeps the cached status monotonic; returns the view that was stored
    fn apply(&self, handle: &JobHandle, mut snapshot: JobSnapshot) -> Option<JobSnapshot> {
        let mut stored = None;
        self.update(handle.generation, |inner| {
            if let Some(previous) = &inner.job {
                if !previous.status.can_advance_to(snapshot.status) {
                    tracing::warn!(
                        "[Job] {} reported {} after {}; keeping {}",
                        handle.job_id,
                        snapshot.status,
                        previous.status,
                        previous.status
                    );
                    snapshot.status = previous.status;
                }
            }
            inner.job = Some(snapshot.clone());
            stored = Some(snapshot);
        });
        stored
    }

    fn fail(&self, handle: &JobHandle, error: ClientError) -> JobOutcome {
        tracing::warn!("[Job] {} failed: {}", handle.job_id, error);
        self.update(handle.generation, |inner| {
            inner.state = JobState::Failed {
                job_id: Some(handle.job_id.clone()),
                error: error.clone(),
            }
        });
        JobOutcome::Failed(error)
    }
}
