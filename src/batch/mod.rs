// Nightshift — Resume-safe batch submission loop

use crate::config::{Config, TextConfig};
use crate::progress::Checkpoint;
use crate::prompts::{load_prompts, PromptVariants};
use crate::queue::{JobQueue, QueueError};
use crate::seed;
use crate::workflow::parser::load_workflow;
use crate::workflow::{NodeBindings, Workflow};
use anyhow::Context;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Plan: validated inputs, no network involved
// ---------------------------------------------------------------------------

/// Everything a run needs from disk, validated up front.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub workflow: Workflow,
    pub prompts: Vec<String>,
    pub bindings: NodeBindings,
    pub text: TextConfig,
}

impl BatchPlan {
    /// Load the template and prompt list and resolve the nodes to rewrite.
    pub fn load(cfg: &Config) -> anyhow::Result<Self> {
        let workflow = load_workflow(&cfg.paths.workflow)?;
        let prompts = load_prompts(&cfg.paths.prompts)?;
        let bindings = NodeBindings::resolve(&workflow, &cfg.nodes)?;

        tracing::info!(
            nodes = workflow.len(),
            prompts = prompts.len(),
            samplers = bindings.samplers.len(),
            "Batch plan ready"
        );

        Ok(Self {
            workflow,
            prompts,
            bindings,
            text: cfg.text.clone(),
        })
    }

    pub fn total(&self) -> usize {
        self.prompts.len()
    }

    /// Build the job for prompt `index`: a copy of the template with the
    /// day/night/negative text and `seed` written into the bound nodes.
    pub fn build_job(&self, index: usize, seed: u64) -> Workflow {
        let variants = PromptVariants::compose(&self.prompts[index], &self.text);
        let mut job = self.workflow.clone();

        job.set_text(&self.bindings.day, &variants.day);
        job.set_text(&self.bindings.night, &variants.night);
        if !self.bindings.negative.is_empty() {
            job.set_text(&self.bindings.negative, &self.text.negative);
        }
        job.set_seed(&self.bindings.samplers, seed);

        job
    }
}

// ---------------------------------------------------------------------------
// Per-job state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Submitted { prompt_id: String },
    Waiting { prompt_id: String, polls: u32 },
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Idle => write!(f, "idle"),
            JobState::Submitted { prompt_id } => write!(f, "submitted({prompt_id})"),
            JobState::Waiting { prompt_id, polls } => write!(f, "waiting({prompt_id}, {polls})"),
            JobState::Done => write!(f, "done"),
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    /// Prompts already completed by a previous run.
    pub skipped: usize,
    pub completed: usize,
}

/// Poll the queue until `prompt_id` is neither running nor pending.
///
/// There is no timeout; a failing service surfaces as an HTTP error.
pub async fn wait_until_done(
    queue: &dyn JobQueue,
    prompt_id: &str,
    poll_interval: Duration,
) -> Result<u32, QueueError> {
    let mut polls = 0u32;
    loop {
        let snapshot = queue.snapshot().await?;
        polls += 1;
        if !snapshot.contains(prompt_id) {
            return Ok(polls);
        }
        tracing::trace!(
            prompt_id,
            running = snapshot.is_running(prompt_id),
            polls,
            "Job still queued"
        );
        tokio::time::sleep(poll_interval).await;
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct BatchRunner<'a> {
    queue: &'a dyn JobQueue,
    progress_path: PathBuf,
    poll_interval: Duration,
    dry_run: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(queue: &'a dyn JobQueue, cfg: &Config) -> Self {
        Self {
            queue,
            progress_path: cfg.paths.progress.clone(),
            poll_interval: cfg.service.poll_interval(),
            dry_run: false,
        }
    }

    /// Build payloads without contacting the service or touching progress.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Process every prompt after the last checkpoint, in order.
    pub async fn run(&self, plan: &BatchPlan) -> anyhow::Result<BatchSummary> {
        if !self.dry_run {
            self.queue
                .health_check()
                .await
                .context("service health check failed")?;
        }

        let mut checkpoint = Checkpoint::load(&self.progress_path).await;
        let total = plan.total();
        let start = checkpoint.resume_index().min(total);
        let mut summary = BatchSummary {
            total,
            skipped: start,
            completed: 0,
        };

        if start > 0 {
            tracing::info!(resume_index = start, total, "Resuming from checkpoint");
        }

        for index in start..total {
            let job = plan.build_job(index, seed::seed_for(index));
            tracing::info!("[{}/{}] QUEUE: {}", index + 1, total, plan.prompts[index]);

            if self.dry_run {
                let payload = serde_json::to_string(&job)?;
                tracing::info!(index, bytes = payload.len(), "Dry run, not submitting");
                continue;
            }

            self.process(index, &job)
                .await
                .with_context(|| format!("prompt {} of {} failed", index + 1, total))?;

            checkpoint.mark_done(index);
            checkpoint.save(&self.progress_path).await.with_context(|| {
                format!(
                    "failed to save progress to {}",
                    self.progress_path.display()
                )
            })?;
            summary.completed += 1;
        }

        tracing::info!(
            completed = summary.completed,
            skipped = summary.skipped,
            total,
            "DONE"
        );
        Ok(summary)
    }

    /// Drive one job through submit and wait.
    async fn process(&self, index: usize, job: &Workflow) -> Result<(), QueueError> {
        let mut state = JobState::Idle;
        loop {
            state = match state {
                JobState::Idle => {
                    let prompt_id = self.queue.submit(job).await?;
                    JobState::Submitted { prompt_id }
                }
                JobState::Submitted { prompt_id } => {
                    let polls =
                        wait_until_done(self.queue, &prompt_id, self.poll_interval).await?;
                    JobState::Waiting { prompt_id, polls }
                }
                JobState::Waiting { prompt_id, polls } => {
                    tracing::debug!(index, prompt_id = %prompt_id, polls, "Job left the queue");
                    JobState::Done
                }
                JobState::Done => return Ok(()),
            };
            tracing::trace!(index, state = %state, "Job state");
        }
    }
}
