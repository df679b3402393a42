//! Job Poller - Remote Execution State Machine
//!
//! **Lifecycle:**
//! 1. `submit` creates a job on the executor and receives an opaque token
//! 2. A background task polls the token until the status leaves the
//!    queued/running range, sleeping a fixed interval between polls
//! 3. The terminal report resolves the handle with stdout/stderr
//!
//! **Failure semantics:**
//! - Pending statuses are retried forever, with no backoff and no cap
//! - Any error while submitting or polling stops the chain immediately;
//!   errors are never retried
//!
//! **Lifetime:**
//! A `JobHandle` owns its poll task. `cancel()` or dropping the handle stops
//! polling at the next suspension point. One poller keeps at most one job in
//! flight: a new submit cancels the job it supersedes.

use crate::judge::{CodeExecutor, ExecutorError};
use edutrack_common::types::{JobRequest, JobStatusReport, Language, NO_OUTPUT};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Outcome of a job that reached a terminal status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalResult {
    pub token: String,
    pub status_id: u32,
    pub status: String,
    /// `NO_OUTPUT` when the job printed nothing
    pub stdout: String,
    pub stderr: String,
    /// Polls scheduled because the job was still queued or running
    pub repolls: u32,
}

impl TerminalResult {
    fn from_report(token: &str, report: JobStatusReport, repolls: u32) -> Self {
        let stdout = report
            .stdout
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_OUTPUT.to_string());
        Self {
            token: token.to_string(),
            status_id: report.status.id,
            status: report.status.description,
            stdout,
            stderr: report.stderr.unwrap_or_default(),
            repolls,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PollError {
    #[error("failed to submit the code: {0}")]
    Submit(#[source] ExecutorError),

    #[error("error fetching the result of job {token}: {source}")]
    Status {
        token: String,
        #[source]
        source: ExecutorError,
    },

    #[error("job {0} was cancelled")]
    Cancelled(String),

    #[error("poll task for job {0} stopped unexpectedly")]
    Aborted(String),
}

struct ActiveJob {
    token: String,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct JobPoller {
    executor: Arc<dyn CodeExecutor>,
    interval: Duration,
    active: Arc<Mutex<Option<ActiveJob>>>,
}

impl JobPoller {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self {
            executor,
            interval: DEFAULT_POLL_INTERVAL,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Create a job and start polling it in the background.
    ///
    /// If creation fails no poll is ever issued.
    pub async fn submit(&self, source_code: &str, language: Language) -> Result<JobHandle, PollError> {
        let request = JobRequest::new(source_code, language);
        let token = match self.executor.create_job(&request).await {
            Ok(token) => token,
            Err(e) => {
                error!(language = %language, error = %e, "Failed to submit job");
                return Err(PollError::Submit(e));
            }
        };
        info!(
            job_id = %token,
            language = %language,
            source_size = source_code.len(),
            "Job submitted"
        );

        let cancel = CancellationToken::new();
        self.supersede(&token, cancel.clone());

        let task = tokio::spawn({
            let poller = self.clone();
            let token = token.clone();
            let cancel = cancel.clone();
            async move {
                let outcome = poller.poll(&token, &cancel).await;
                poller.release(&token);
                outcome
            }
        });

        Ok(JobHandle {
            token,
            cancel,
            task: Some(task),
        })
    }

    /// Poll `token` until it reaches a terminal status, fails, or `cancel`
    /// fires.
    #[instrument(skip(self, cancel), fields(job_id = %token))]
    pub async fn poll(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<TerminalResult, PollError> {
        let mut repolls = 0u32;
        loop {
            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled(token.to_string())),
                report = self.executor.job_status(token) => report,
            };

            let report = match report {
                Ok(report) => report,
                Err(e) => {
                    error!(error = %e, repolls, "Failed to fetch job status");
                    return Err(PollError::Status {
                        token: token.to_string(),
                        source: e,
                    });
                }
            };

            if report.is_terminal() {
                info!(
                    status_id = report.status.id,
                    status = %report.status.description,
                    repolls,
                    "Job finished"
                );
                return Ok(TerminalResult::from_report(token, report, repolls));
            }

            debug!(status_id = report.status.id, phase = ?report.phase(), "Job not finished yet");
            repolls += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled(token.to_string())),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    fn supersede(&self, token: &str, cancel: CancellationToken) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = active.take() {
            warn!(
                previous_job = %previous.token,
                job_id = %token,
                "New job submitted while another was still polling; cancelling the older one"
            );
            previous.cancel.cancel();
        }
        *active = Some(ActiveJob {
            token: token.to_string(),
            cancel,
        });
    }

    fn release(&self, token: &str) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if active.as_ref().map(|job| job.token == token).unwrap_or(false) {
            *active = None;
        }
    }
}

/// Owner of one in-flight job. Dropping it cancels the poll task.
#[derive(Debug)]
pub struct JobHandle {
    token: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<TerminalResult, PollError>>>,
}

impl JobHandle {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(job_id = %self.token, "Cancelling job poll");
            self.cancel.cancel();
        }
    }

    /// A token that cancels this job; usable after the handle is moved
    /// into `wait`.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn wait(mut self) -> Result<TerminalResult, PollError> {
        let outcome = match self.task.as_mut() {
            Some(task) => task.await,
            None => return Err(PollError::Aborted(self.token.clone())),
        };
        self.task = None;

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(job_id = %self.token, error = %e, "Poll task failed");
                Err(PollError::Aborted(self.token.clone()))
            }
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}
