use crate::backend::{GenerateForm, RecommendationBackend};
use crate::config::Settings;
use crate::domain::recommendation::JobId;
use crate::domain::upload::UploadedFile;
use crate::error::ClientError;
use crate::protocol;
use anyhow::Context;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Upload,
    Generate,
    Status,
    History,
    Detail,
}

impl Endpoint {
    fn label(self) -> &'static str {
        match self {
            Endpoint::Upload => "upload",
            Endpoint::Generate => "generate",
            Endpoint::Status => "status",
            Endpoint::History => "history",
            Endpoint::Detail => "detail",
        }
    }

    fn http_error(self, status: u16, server_message: Option<String>) -> ClientError {
        let message = server_message.unwrap_or_else(|| match self {
            Endpoint::Upload => format!("PDF upload failed with status {status}"),
            Endpoint::Generate => format!("API request failed with status {status}"),
            Endpoint::Status => format!("Failed to check recommendation status: {status}"),
            Endpoint::History => format!("Failed to fetch recommendation history: {status}"),
            Endpoint::Detail => format!("Failed to fetch recommendation: {status}"),
        });
        match self {
            Endpoint::Upload => ClientError::Upload { status, message },
            _ => ClientError::Request { status, message },
        }
    }
}

/// [`RecommendationBackend`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
    upload_path: Vec<String>,
}

impl HttpBackend {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            settings.api_base_url(),
            settings.upload_path(),
            settings.http_timeout(),
        )
    }

    pub fn new(base_url: &str, upload_path: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid API base URL: {base_url}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "API base URL must be hierarchical (got {base_url})"
        );

        let upload_path: Vec<String> = upload_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        anyhow::ensure!(!upload_path.is_empty(), "upload path must be non-empty");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build recommendation http client")?;

        Ok(Self {
            http,
            base_url,
            upload_path,
        })
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL can carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_json(
        &self,
        endpoint: Endpoint,
        res: reqwest::Response,
    ) -> Result<Value, ClientError> {
        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            let server_message = serde_json::from_str::<Value>(&text)
                .ok()
                .as_ref()
                .and_then(protocol::error_message);
            tracing::debug!(
                endpoint = endpoint.label(),
                %status,
                body = %text,
                "recommendation backend returned an error status"
            );
            return Err(endpoint.http_error(status.as_u16(), server_message));
        }

        serde_json::from_str::<Value>(&text).map_err(|e| {
            ClientError::Protocol(format!(
                "{} response is not valid JSON ({e}): {text}",
                endpoint.label()
            ))
        })
    }

    async fn get_json(&self, endpoint: Endpoint, url: Url) -> Result<Value, ClientError> {
        tracing::debug!(endpoint = endpoint.label(), %url, "GET");
        let res = self.http.get(url).send().await?;
        self.read_json(endpoint, res).await
    }
}

fn file_part(file: &UploadedFile) -> Result<Part, ClientError> {
    Ok(Part::bytes(file.content.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)?)
}

#[async_trait::async_trait]
impl RecommendationBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn upload_pdf(&self, file: &UploadedFile) -> Result<Value, ClientError> {
        let url = self.url(self.upload_path.iter().map(String::as_str));
        tracing::debug!(%url, file = %file.name, size = file.size(), "uploading statement");

        let multipart = Form::new().part("pdf", file_part(file)?);
        let res = self.http.post(url).multipart(multipart).send().await?;
        self.read_json(Endpoint::Upload, res).await
    }

    async fn generate(&self, form: GenerateForm<'_>) -> Result<Value, ClientError> {
        let url = self.url(["recommendations", "generate"]);

        let mut multipart = Form::new().text("filters", form.filters);
        if let Some(file_id) = form.file_id {
            multipart = multipart.text("fileId", file_id.as_str().to_string());
        }
        if let Some(statement) = form.statement {
            multipart = multipart.part("statementFile", file_part(statement)?);
        }

        tracing::debug!(
            %url,
            file_id = ?form.file_id.map(|f| f.as_str()),
            inline_statement = form.statement.is_some(),
            "submitting recommendation request"
        );
        let res = self.http.post(url).multipart(multipart).send().await?;
        self.read_json(Endpoint::Generate, res).await
    }

    async fn job_status(&self, job_id: &JobId) -> Result<Value, ClientError> {
        let url = self.url(["recommendations", "status", job_id.as_str()]);
        self.get_json(Endpoint::Status, url).await
    }

    async fn history(&self) -> Result<Value, ClientError> {
        let url = self.url(["recommendations", "history"]);
        self.get_json(Endpoint::History, url).await
    }

    async fn recommendation(&self, id: &str) -> Result<Value, ClientError> {
        let url = self.url(["recommendations", id]);
        self.get_json(Endpoint::Detail, url).await
    }
}
