pub mod http;

use crate::domain::recommendation::JobId;
use crate::domain::upload::{FileId, UploadedFile};
use crate::error::ClientError;
use serde_json::Value;

/// Multipart fields for `/recommendations/generate`.
#[derive(Debug, Clone)]
pub struct GenerateForm<'a> {
    /// JSON-encoded filters, sent as the `filters` field.
    pub filters: String,
    pub file_id: Option<&'a FileId>,
    pub statement: Option<&'a UploadedFile>,
}

/// Transport to the recommendation backend.
///
/// Implementations return the decoded JSON body of a 2xx response and map
/// everything else to [`ClientError`]. Interpreting the body is left to
/// [`crate::protocol`].
#[async_trait::async_trait]
pub trait RecommendationBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn upload_pdf(&self, file: &UploadedFile) -> Result<Value, ClientError>;

    async fn generate(&self, form: GenerateForm<'_>) -> Result<Value, ClientError>;

    async fn job_status(&self, job_id: &JobId) -> Result<Value, ClientError>;

    async fn history(&self) -> Result<Value, ClientError>;

    async fn recommendation(&self, id: &str) -> Result<Value, ClientError>;
}
