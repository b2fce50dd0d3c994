//! Background scoring tasks with status tracking and cancellation

use crate::error::{Result, ScoringError};
use crate::processing::analyzer::{CandidateScorer, MatchResult};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Degraded,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Degraded)
    }
}

/// Owned inputs for one background scoring run
#[derive(Debug, Clone, Default)]
pub struct ScoringJob {
    pub cv_text: String,
    pub cover_letter_text: Option<String>,
    pub job_text: Option<String>,
}

impl ScoringJob {
    pub fn new(cv_text: impl Into<String>) -> Self {
        Self {
            cv_text: cv_text.into(),
            ..Default::default()
        }
    }

    pub fn with_cover_letter(mut self, text: impl Into<String>) -> Self {
        self.cover_letter_text = Some(text.into());
        self
    }

    pub fn with_job(mut self, text: impl Into<String>) -> Self {
        self.job_text = Some(text.into());
        self
    }
}

/// Handle to a submitted job
pub struct ScoringTask {
    id: Uuid,
    status: watch::Receiver<TaskStatus>,
    cancel_token: CancellationToken,
    handle: JoinHandle<Result<MatchResult>>,
}

impl ScoringTask {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.borrow()
    }

    /// Receiver for status transitions
    pub fn subscribe(&self) -> watch::Receiver<TaskStatus> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub async fn wait(self) -> Result<MatchResult> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ScoringError::Cancelled),
            Err(e) => Err(ScoringError::provider(format!("Scoring task panicked: {}", e))),
        }
    }
}

/// Runs scoring jobs on the tokio runtime with a concurrency bound
pub struct ScoringPool {
    scorer: Arc<CandidateScorer>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel_token: CancellationToken,
}

impl ScoringPool {
    pub fn new(scorer: Arc<CandidateScorer>, max_concurrent: usize) -> Self {
        Self {
            scorer,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tracker: TaskTracker::new(),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Tasks not yet finished, queued ones included
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn submit(&self, job: ScoringJob) -> ScoringTask {
        let id = Uuid::new_v4();
        let (status_tx, status_rx) = watch::channel(TaskStatus::Pending);
        let cancel_token = self.cancel_token.child_token();

        let scorer = Arc::clone(&self.scorer);
        let permits = Arc::clone(&self.permits);
        let token = cancel_token.clone();

        let handle = self.tracker.spawn(async move {
            let result = run_job(&scorer, &permits, &token, &status_tx, job).await;

            let final_status = match &result {
                Ok(r) if r.degraded => TaskStatus::Degraded,
                Ok(_) => TaskStatus::Completed,
                Err(e) => {
                    warn!("Scoring task {} failed: {}", id, e);
                    TaskStatus::Failed
                }
            };
            status_tx.send_replace(final_status);
            debug!("Scoring task {} finished as {:?}", id, final_status);
            result
        });

        debug!("Submitted scoring task {}", id);
        ScoringTask {
            id,
            status: status_rx,
            cancel_token,
            handle,
        }
    }

    /// Cancel outstanding work and wait for it to wind down.
    ///
    /// Returns false if tasks were still running when the timeout elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        self.cancel_token.cancel();
        info!("Shutting down scoring pool with {} task(s) in flight", self.tracker.len());

        tokio::select! {
            _ = self.tracker.wait() => true,
            _ = tokio::time::sleep(timeout) => {
                warn!(
                    "Scoring pool shutdown timed out with {} task(s) still active",
                    self.tracker.len()
                );
                false
            }
        }
    }
}

async fn run_job(
    scorer: &CandidateScorer,
    permits: &Arc<Semaphore>,
    token: &CancellationToken,
    status: &watch::Sender<TaskStatus>,
    job: ScoringJob,
) -> Result<MatchResult> {
    let _permit = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(ScoringError::Cancelled),
        permit = Arc::clone(permits).acquire_owned() => {
            permit.map_err(|_| ScoringError::Cancelled)?
        }
    };

    status.send_replace(TaskStatus::Running);

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ScoringError::Cancelled),
        result = scorer.score_candidate(
            &job.cv_text,
            job.cover_letter_text.as_deref(),
            job.job_text.as_deref(),
        ) => result,
    }
}
