// Nightshift — Image-generation job queue abstraction

pub mod http;

use crate::workflow::Workflow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("submit response has no prompt_id: {0}")]
    MissingPromptId(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of a job submission.
#[derive(Debug, Serialize)]
pub struct SubmitRequest<'a> {
    pub prompt: &'a Workflow,
}

/// One queue entry: `[priority, job_id, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueEntry(pub Vec<Value>);

impl QueueEntry {
    pub fn job_id(&self) -> Option<&str> {
        self.0.get(1).and_then(Value::as_str)
    }
}

/// Running and pending jobs as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub queue_running: Vec<QueueEntry>,
    #[serde(default)]
    pub queue_pending: Vec<QueueEntry>,
}

impl QueueSnapshot {
    pub fn is_running(&self, job_id: &str) -> bool {
        self.queue_running.iter().any(|e| e.job_id() == Some(job_id))
    }

    pub fn is_pending(&self, job_id: &str) -> bool {
        self.queue_pending.iter().any(|e| e.job_id() == Some(job_id))
    }

    /// A job is finished once it is neither running nor pending.
    pub fn contains(&self, job_id: &str) -> bool {
        self.is_running(job_id) || self.is_pending(job_id)
    }
}

// ---------------------------------------------------------------------------
// Queue trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Fail unless the service answers its queue endpoint successfully.
    async fn health_check(&self) -> Result<(), QueueError>;

    /// Submit a workflow and return the job id the service assigned.
    async fn submit(&self, workflow: &Workflow) -> Result<String, QueueError>;

    /// Fetch the current running and pending sets.
    async fn snapshot(&self) -> Result<QueueSnapshot, QueueError>;
}
