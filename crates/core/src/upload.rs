use crate::backend::RecommendationBackend;
use crate::domain::upload::{FileId, UploadedFile};
use crate::error::ClientError;
use crate::protocol;
use std::sync::Arc;

/// Validates statements locally and uploads them. Never retries.
#[derive(Clone)]
pub struct UploadClient {
    backend: Arc<dyn RecommendationBackend>,
}

impl UploadClient {
    pub fn new(backend: Arc<dyn RecommendationBackend>) -> Self {
        Self { backend }
    }

    /// Upload `file` and record the server-issued id on it.
    pub async fn upload(&self, file: &mut UploadedFile) -> Result<FileId, ClientError> {
        file.validate()?;

        let body = self.backend.upload_pdf(file).await?;
        let file_id = protocol::parse_upload_response(&body)?;

        tracing::info!(
            backend = self.backend.name(),
            file = %file.name,
            size = file.size(),
            %file_id,
            "statement uploaded"
        );
        file.file_id = Some(file_id.clone());
        Ok(file_id)
    }
}
