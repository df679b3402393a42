//! Remote Code Executor - Transport Boundary
//!
//! **Responsibility:**
//! Create a job on the remote sandbox and read back its status.
//!
//! The executor knows nothing about polling cadence or cancellation; that is
//! the poller's job (poller.rs). Keeping the seam as a trait lets the poll
//! loop run against a scripted executor in tests.

use async_trait::async_trait;
use edutrack_common::config::Config;
use edutrack_common::endpoints;
use edutrack_common::types::{JobCreated, JobRequest, JobStatusReport};
use reqwest::{Client, RequestBuilder};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutorError {
    #[error("executor unreachable: {0}")]
    Transport(String),

    #[error("executor responded with status {0}")]
    Status(u16),

    #[error("unexpected executor response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ExecutorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ExecutorError::Decode(e.to_string())
        } else {
            ExecutorError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Queue a job and return the executor's opaque token for it
    async fn create_job(&self, request: &JobRequest) -> Result<String, ExecutorError>;

    /// Fetch the current status of a job
    async fn job_status(&self, token: &str) -> Result<JobStatusReport, ExecutorError>;
}

/// Judge0-compatible executor reached over HTTP
#[derive(Debug, Clone)]
pub struct Judge0Client {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    host: Option<String>,
}

impl Judge0Client {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ExecutorError> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: base_url.into(),
            api_key: None,
            host: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ExecutorError> {
        let mut client = Self::new(config.judge0_url.clone())?;
        client.api_key = config.judge0_api_key.clone();
        client.host = config.judge0_host.clone();
        Ok(client)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.header("x-rapidapi-key", key),
            None => request,
        };
        match &self.host {
            Some(host) => request.header("x-rapidapi-host", host),
            None => request,
        }
    }
}

#[async_trait]
impl CodeExecutor for Judge0Client {
    async fn create_job(&self, request: &JobRequest) -> Result<String, ExecutorError> {
        let url = endpoints::executor_jobs(&self.base_url);
        let response = self
            .authorize(self.http.post(url).json(request))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ExecutorError::Status(response.status().as_u16()));
        }
        let created: JobCreated = response.json().await?;
        Ok(created.token)
    }

    async fn job_status(&self, token: &str) -> Result<JobStatusReport, ExecutorError> {
        let url = endpoints::executor_job(&self.base_url, token);
        let response = self.authorize(self.http.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(ExecutorError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}
