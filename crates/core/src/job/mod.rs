//! Recommendation job submission and status polling.

pub mod poll;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use crate::backend::{GenerateForm, RecommendationBackend};
use crate::config::Settings;
use crate::domain::job::{JobState, JobStatus, PollReport, Submission};
use crate::domain::recommendation::{HistoryEntry, JobId, RecommendationPayload};
use crate::domain::request::{Attachment, RecommendationRequest};
use crate::error::ClientError;
use crate::protocol;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub use poll::{PollHandle, StatePublisher};
pub use session::JobSession;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between one status response and the next request.
    pub interval: Duration,
    /// Wall-clock budget measured from the start of polling.
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_POLL_DEADLINE,
        }
    }
}

impl PollConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.poll_interval(),
            deadline: settings.poll_deadline(),
        }
    }
}

#[derive(Clone)]
pub struct JobClient {
    backend: Arc<dyn RecommendationBackend>,
    poll: PollConfig,
}

impl JobClient {
    pub fn new(backend: Arc<dyn RecommendationBackend>, poll: PollConfig) -> Self {
        Self { backend, poll }
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    /// Send a request to the generation endpoint.
    ///
    /// Empty or invalid requests fail with [`ClientError::Validation`] before
    /// anything goes over the wire.
    pub async fn submit(&self, request: &RecommendationRequest) -> Result<Submission, ClientError> {
        request.validate()?;

        let (file_id, statement) = match &request.attachment {
            Some(Attachment::Uploaded(id)) => (Some(id), None),
            Some(Attachment::Inline(file)) => (None, Some(file)),
            None => (None, None),
        };
        let form = GenerateForm {
            filters: request.filters_json()?,
            file_id,
            statement,
        };

        let body = self.backend.generate(form).await?;
        let submission = protocol::parse_submit_response(&body)?;

        match &submission {
            Submission::Pending(job_id) => {
                tracing::info!(backend = self.backend.name(), %job_id, "recommendation job accepted");
            }
            Submission::Immediate(payload) => {
                tracing::info!(
                    backend = self.backend.name(),
                    count = payload.count,
                    "recommendation returned synchronously"
                );
            }
        }
        Ok(submission)
    }

    /// Ask for the status of `job_id` once.
    pub async fn check_status(&self, job_id: &JobId) -> Result<JobStatus, ClientError> {
        let body = self.backend.job_status(job_id).await?;
        protocol::parse_status_response(&body)
    }

    /// Poll `job_id` on the current task until it settles.
    ///
    /// Returns `None` if `cancel` fires first.
    pub async fn poll_until_settled(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Option<PollReport> {
        let (state, _) = watch::channel(JobState::Processing {
            job_id: job_id.clone(),
            attempts: 0,
        });
        let publisher = StatePublisher::new(Arc::new(state), cancel.clone());
        poll::run_poll_loop(self.backend.as_ref(), job_id, &self.poll, &publisher).await
    }

    /// Poll `job_id` on a background task, publishing every transition to `state`.
    pub fn spawn_poll(&self, job_id: JobId, state: Arc<watch::Sender<JobState>>) -> PollHandle {
        PollHandle::spawn(self.backend.clone(), job_id, self.poll, state)
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        let body = self.backend.history().await?;
        protocol::parse_history(&body)
    }

    pub async fn recommendation(&self, id: &str) -> Result<RecommendationPayload, ClientError> {
        let body = self.backend.recommendation(id).await?;
        protocol::parse_detail(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::CardType;
    use crate::domain::upload::{FileId, UploadedFile, PDF_MIME_TYPE};
    use crate::job::testing::ScriptedBackend;
    use serde_json::json;

    fn client(backend: &Arc<ScriptedBackend>) -> JobClient {
        JobClient::new(backend.clone(), PollConfig::default())
    }

    fn visa_request() -> RecommendationRequest {
        let mut req = RecommendationRequest::default();
        req.card_types.insert(CardType::Visa);
        req
    }

    #[tokio::test]
    async fn empty_request_never_reaches_the_network() {
        let backend = Arc::new(ScriptedBackend::default());
        let err = client(&backend)
            .submit(&RecommendationRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(backend.submit_calls(), 0);
    }

    #[tokio::test]
    async fn job_id_response_is_pending() {
        let backend = Arc::new(ScriptedBackend::default().with_submit_response(json!({"jobId": "abc"})));
        let submission = client(&backend).submit(&visa_request()).await.unwrap();
        assert_eq!(submission, Submission::Pending(JobId::new("abc")));
    }

    #[tokio::test]
    async fn data_response_is_immediate() {
        let data = json!({"recommendations": [{"name": "Discover it"}], "summary": "s"});
        let backend = Arc::new(
            ScriptedBackend::default().with_submit_response(json!({"success": true, "data": data})),
        );
        let submission = client(&backend).submit(&visa_request()).await.unwrap();
        let Submission::Immediate(payload) = submission else {
            panic!("expected immediate result");
        };
        assert_eq!(payload.cards[0].name, "Discover it");
    }

    #[tokio::test]
    async fn neither_job_nor_data_is_protocol_error() {
        let backend = Arc::new(ScriptedBackend::default().with_submit_response(json!({"ok": 1})));
        let err = client(&backend).submit(&visa_request()).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn attachment_selects_form_field() {
        let backend = Arc::new(ScriptedBackend::default());
        let client = client(&backend);

        client
            .submit(&visa_request().with_file_id(FileId::new("f-1")))
            .await
            .unwrap();
        let inline = UploadedFile::new("s.pdf", PDF_MIME_TYPE, b"%PDF".to_vec());
        client
            .submit(&visa_request().with_statement(inline))
            .await
            .unwrap();

        let forms = backend.submitted();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].file_id.as_deref(), Some("f-1"));
        assert_eq!(forms[0].statement, None);
        assert_eq!(forms[1].file_id, None);
        assert_eq!(forms[1].statement.as_deref(), Some("s.pdf"));

        let filters: serde_json::Value = serde_json::from_str(&forms[0].filters).unwrap();
        assert_eq!(filters["cardTypes"], json!(["VISA"]));
        assert_eq!(filters["annualFeeRange"], "any");
    }

    #[tokio::test]
    async fn history_and_detail_are_normalized() {
        let backend = Arc::new(
            ScriptedBackend::default()
                .with_history(json!({"data": [{"id": "h1", "title": "Premium Travel Cards", "cards": 3}]}))
                .with_detail(json!({"data": {"recommendedCards": [{"name": "Venture X", "fee": "$395"}]}})),
        );
        let client = client(&backend);

        let history = client.history().await.unwrap();
        assert_eq!(history[0].title, "Premium Travel Cards");

        let detail = client.recommendation("h1").await.unwrap();
        assert_eq!(detail.cards[0].annual_fee, "$395");
    }
}
