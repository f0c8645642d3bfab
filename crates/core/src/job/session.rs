use crate::domain::job::{JobState, Submission};
use crate::domain::request::RecommendationRequest;
use crate::error::ClientError;
use crate::job::{JobClient, PollHandle};
use std::sync::Arc;
use tokio::sync::watch;

/// Owns the displayed job state and at most one poll loop.
///
/// Consumers observe transitions through [`JobSession::subscribe`]. Starting a
/// new submission, [`JobSession::stop`], and dropping the session all cancel
/// the running loop first.
pub struct JobSession {
    client: JobClient,
    state: Arc<watch::Sender<JobState>>,
    active: Option<PollHandle>,
}

impl JobSession {
    pub fn new(client: JobClient) -> Self {
        let (state, _) = watch::channel(JobState::Idle);
        Self {
            client,
            state: Arc::new(state),
            active: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.active.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Submit `request` and, in asynchronous mode, start polling for it.
    ///
    /// Validation failures leave the state untouched. Any other submission
    /// error moves the session to `Failed` and is also returned.
    pub async fn start(&mut self, request: &RecommendationRequest) -> Result<(), ClientError> {
        request.validate()?;

        self.stop();
        self.state.send_replace(JobState::Submitting);

        match self.client.submit(request).await {
            Ok(Submission::Pending(job_id)) => {
                self.state.send_replace(JobState::Processing {
                    job_id: job_id.clone(),
                    attempts: 0,
                });
                self.active = Some(self.client.spawn_poll(job_id, self.state.clone()));
                Ok(())
            }
            Ok(Submission::Immediate(payload)) => {
                self.state.send_replace(JobState::ImmediateResult(payload));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "recommendation submission failed");
                self.state.send_replace(JobState::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Wait for the current job to settle and return the final state.
    ///
    /// Dropping this future cancels the poll loop.
    pub async fn settled(&mut self) -> JobState {
        if let Some(handle) = self.active.take() {
            handle.join().await;
        }
        self.state()
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
    }

    /// Back to the blank form.
    pub fn reset(&mut self) {
        self.stop();
        self.state.send_replace(JobState::Idle);
    }
}
