//! In-memory backend for exercising the clients without a server.

use crate::backend::{GenerateForm, RecommendationBackend};
use crate::domain::recommendation::JobId;
use crate::domain::upload::UploadedFile;
use crate::error::ClientError;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One scripted answer from the status endpoint.
#[derive(Clone)]
pub(crate) enum Step {
    Reply(Value),
    NetworkError,
    /// Reply once the gate is notified.
    Gated(Arc<Notify>, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubmittedForm {
    pub filters: String,
    pub file_id: Option<String>,
    pub statement: Option<String>,
}

/// Scripts are consumed front to back; the last entry repeats forever.
pub(crate) struct ScriptedBackend {
    upload_response: Value,
    submit_responses: Mutex<VecDeque<Value>>,
    statuses: Mutex<HashMap<String, VecDeque<Step>>>,
    history: Value,
    detail: Value,
    upload_calls: AtomicUsize,
    submitted: Mutex<Vec<SubmittedForm>>,
    polled: Mutex<Vec<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            upload_response: json!({"success": true, "data": {"fileId": "f-1"}}),
            submit_responses: Mutex::new(VecDeque::from([json!({"jobId": "abc"})])),
            statuses: Mutex::new(HashMap::new()),
            history: json!([]),
            detail: json!({"data": {"cards": []}}),
            upload_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            polled: Mutex::new(Vec::new()),
        }
    }
}

fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl ScriptedBackend {
    pub fn with_upload_response(mut self, body: Value) -> Self {
        self.upload_response = body;
        self
    }

    pub fn with_submit_response(self, body: Value) -> Self {
        self.with_submit_responses(vec![body])
    }

    pub fn with_submit_responses(self, bodies: Vec<Value>) -> Self {
        *self.submit_responses.lock().unwrap() = bodies.into();
        self
    }

    pub fn with_statuses(self, job_id: &str, steps: Vec<Step>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(job_id.to_string(), steps.into());
        self
    }

    pub fn with_history(mut self, body: Value) -> Self {
        self.history = body;
        self
    }

    pub fn with_detail(mut self, body: Value) -> Self {
        self.detail = body;
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn submitted(&self) -> Vec<SubmittedForm> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.polled.lock().unwrap().len()
    }

    pub fn status_calls_for(&self, job_id: &str) -> usize {
        self.polled
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == job_id)
            .count()
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecommendationBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn upload_pdf(&self, _file: &UploadedFile) -> Result<Value, ClientError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.upload_response.clone())
    }

    async fn generate(&self, form: GenerateForm<'_>) -> Result<Value, ClientError> {
        self.submitted.lock().unwrap().push(SubmittedForm {
            filters: form.filters,
            file_id: form.file_id.map(|id| id.as_str().to_string()),
            statement: form.statement.map(|f| f.name.clone()),
        });
        let body = next_scripted(&mut self.submit_responses.lock().unwrap());
        body.ok_or_else(|| ClientError::transport("no scripted submit response"))
    }

    async fn job_status(&self, job_id: &JobId) -> Result<Value, ClientError> {
        self.polled.lock().unwrap().push(job_id.as_str().to_string());
        let step = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(job_id.as_str())
            .and_then(next_scripted)
            .unwrap_or_else(|| Step::Reply(json!({"status": "processing"})));

        match step {
            Step::Reply(body) => Ok(body),
            Step::NetworkError => Err(ClientError::transport("connection reset by peer")),
            Step::Gated(gate, body) => {
                gate.notified().await;
                Ok(body)
            }
        }
    }

    async fn history(&self) -> Result<Value, ClientError> {
        Ok(self.history.clone())
    }

    async fn recommendation(&self, _id: &str) -> Result<Value, ClientError> {
        Ok(self.detail.clone())
    }
}
