use crate::domain::recommendation::{JobId, RecommendationPayload};
use crate::error::ClientError;
use std::time::Duration;

/// What the generation endpoint handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Asynchronous mode: poll this job until it settles.
    Pending(JobId),
    /// Back-compatible synchronous mode: the result came with the response.
    Immediate(RecommendationPayload),
}

/// One normalized answer from the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Processing,
    Completed(RecommendationPayload),
    Failed(String),
}

/// Terminal result of a poll loop.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(RecommendationPayload),
    Failed(String),
    TimedOut,
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Completed(_) => "completed",
            JobOutcome::Failed(_) => "failed",
            JobOutcome::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub job_id: JobId,
    pub outcome: JobOutcome,
    /// Status requests that settled, including ones that failed in transit.
    pub attempts: u32,
    pub elapsed: Duration,
}

impl PollReport {
    pub fn into_result(self) -> Result<RecommendationPayload, ClientError> {
        match self.outcome {
            JobOutcome::Completed(payload) => Ok(payload),
            JobOutcome::Failed(message) => Err(ClientError::JobFailed(message)),
            JobOutcome::TimedOut => Err(ClientError::Timeout {
                elapsed: self.elapsed,
            }),
        }
    }
}

/// The job as the presentation layer sees it.
///
/// `Idle -> Submitting -> { Processing -> { Completed | Failed | TimedOut } | ImmediateResult }`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Submitting,
    Processing { job_id: JobId, attempts: u32 },
    Completed(RecommendationPayload),
    Failed { message: String },
    TimedOut,
    ImmediateResult(RecommendationPayload),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed(_)
                | JobState::Failed { .. }
                | JobState::TimedOut
                | JobState::ImmediateResult(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Submitting => "submitting",
            JobState::Processing { .. } => "processing",
            JobState::Completed(_) => "completed",
            JobState::Failed { .. } => "failed",
            JobState::TimedOut => "timed_out",
            JobState::ImmediateResult(_) => "immediate_result",
        }
    }

    /// The payload for either successful terminal state.
    pub fn payload(&self) -> Option<&RecommendationPayload> {
        match self {
            JobState::Completed(p) | JobState::ImmediateResult(p) => Some(p),
            _ => None,
        }
    }
}

impl From<JobOutcome> for JobState {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed(payload) => JobState::Completed(payload),
            JobOutcome::Failed(message) => JobState::Failed { message },
            JobOutcome::TimedOut => JobState::TimedOut,
        }
    }
}
