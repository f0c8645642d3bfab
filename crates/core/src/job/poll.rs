//! Cancellable status polling.
//!
//! Polls are strictly sequential: the next request goes out only after the
//! previous one has settled and `interval` has elapsed. The whole loop races a
//! single deadline measured from the first poll, and a [`CancellationToken`]
//! that tears down the in-flight request and both timers at once.

use crate::backend::RecommendationBackend;
use crate::domain::job::{JobOutcome, JobState, JobStatus, PollReport};
use crate::domain::recommendation::JobId;
use crate::job::PollConfig;
use crate::protocol;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Writes job state on behalf of one poll loop.
///
/// Every write is checked against the loop's token while holding the watch
/// channel's lock, and [`StatePublisher::close`] cancels under that same lock.
/// Once `close` returns, no write from this publisher can land.
#[derive(Clone)]
pub struct StatePublisher {
    state: Arc<watch::Sender<JobState>>,
    cancel: CancellationToken,
}

impl StatePublisher {
    pub fn new(state: Arc<watch::Sender<JobState>>, cancel: CancellationToken) -> Self {
        Self { state, cancel }
    }

    /// Returns false if the loop was cancelled and the write was dropped.
    pub fn publish(&self, next: JobState) -> bool {
        self.state.send_if_modified(|current| {
            if self.cancel.is_cancelled() {
                return false;
            }
            *current = next;
            true
        })
    }

    pub fn close(&self) {
        self.state.send_if_modified(|_| {
            self.cancel.cancel();
            false
        });
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Poll `job_id` until it settles, times out, or `publisher` is closed.
pub(crate) async fn run_poll_loop(
    backend: &dyn RecommendationBackend,
    job_id: &JobId,
    config: &PollConfig,
    publisher: &StatePublisher,
) -> Option<PollReport> {
    let cancel = publisher.token();
    let started = Instant::now();
    let deadline = started + config.deadline;
    let mut attempts: u32 = 0;

    let report = |outcome: JobOutcome, attempts: u32| PollReport {
        job_id: job_id.clone(),
        outcome,
        attempts,
        elapsed: started.elapsed(),
    };

    loop {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%job_id, attempts, "polling cancelled");
                return None;
            }
            _ = sleep_until(deadline) => None,
            res = backend.job_status(job_id) => Some(res),
        };

        let outcome = match response {
            None => Some(JobOutcome::TimedOut),
            Some(res) => {
                attempts += 1;
                match res.and_then(|body| protocol::parse_status_response(&body)) {
                    Ok(JobStatus::Processing) => {
                        tracing::debug!(%job_id, attempts, "job still processing");
                        None
                    }
                    Ok(JobStatus::Completed(payload)) => Some(JobOutcome::Completed(payload)),
                    Ok(JobStatus::Failed(message)) => Some(JobOutcome::Failed(message)),
                    Err(err) if err.is_transient() => {
                        tracing::warn!(%job_id, attempts, error = %err, "status poll failed; will retry");
                        None
                    }
                    Err(err) => Some(JobOutcome::Failed(err.to_string())),
                }
            }
        };

        if let Some(outcome) = outcome {
            let report = report(outcome, attempts);
            tracing::info!(
                %job_id,
                attempts = report.attempts,
                elapsed_ms = report.elapsed.as_millis() as u64,
                outcome = report.outcome.label(),
                "polling finished"
            );
            if !publisher.publish(report.outcome.clone().into()) {
                return None;
            }
            return Some(report);
        }

        if !publisher.publish(JobState::Processing {
            job_id: job_id.clone(),
            attempts,
        }) {
            return None;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = sleep_until(deadline) => {
                let report = report(JobOutcome::TimedOut, attempts);
                tracing::info!(%job_id, attempts, "polling deadline reached");
                if !publisher.publish(JobState::TimedOut) {
                    return None;
                }
                return Some(report);
            }
            _ = sleep(config.interval) => {}
        }
    }
}

/// A poll loop running on its own task.
///
/// Dropping the handle cancels the loop, as does [`PollHandle::cancel`]. Both
/// are idempotent.
pub struct PollHandle {
    job_id: JobId,
    publisher: StatePublisher,
    task: Option<JoinHandle<Option<PollReport>>>,
}

impl PollHandle {
    pub(crate) fn spawn(
        backend: Arc<dyn RecommendationBackend>,
        job_id: JobId,
        config: PollConfig,
        state: Arc<watch::Sender<JobState>>,
    ) -> Self {
        let publisher = StatePublisher::new(state, CancellationToken::new());
        let task = tokio::spawn({
            let publisher = publisher.clone();
            let job_id = job_id.clone();
            async move { run_poll_loop(backend.as_ref(), &job_id, &config, &publisher).await }
        });

        Self {
            job_id,
            publisher,
            task: Some(task),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn cancel(&self) {
        if !self.publisher.is_closed() {
            tracing::debug!(job_id = %self.job_id, "cancelling poll loop");
        }
        self.publisher.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.publisher.is_closed()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end. `None` if it was cancelled.
    pub async fn join(mut self) -> Option<PollReport> {
        let task = self.task.as_mut()?;
        let res = task.await;
        // Finished: nothing left to cancel on drop.
        self.task = None;
        match res {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(job_id = %self.job_id, error = %err, "poll task aborted");
                None
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel();
        }
    }
}
