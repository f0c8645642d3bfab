//! Normalizes backend JSON into the typed job/upload model.
//!
//! The backend has shipped several response shapes over time. Everything that
//! sniffs field names lives here; the clients only ever see typed values or a
//! [`ClientError::Protocol`].

use crate::domain::job::{JobStatus, Submission};
use crate::domain::recommendation::{HistoryEntry, JobId, RecommendationPayload, RecommendedCard};
use crate::domain::upload::FileId;
use crate::error::ClientError;
use serde_json::Value;

const FILE_ID_KEYS: [&str; 4] = ["fileId", "id", "file_id", "uuid"];
const JOB_ID_KEYS: [&str; 2] = ["jobId", "job_id"];
const CARD_LIST_KEYS: [&str; 3] = ["recommendations", "cards", "recommendedCards"];

/// Message the backend attached to an error response, if any.
pub fn error_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(message_text))
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

pub fn parse_upload_response(body: &Value) -> Result<FileId, ClientError> {
    let nested = body.get("data").and_then(|data| id_field(data, &["fileId"]));
    nested
        .or_else(|| id_field(body, &FILE_ID_KEYS))
        .map(FileId::new)
        .ok_or_else(|| ClientError::Protocol("upload response did not include a file id".to_string()))
}

pub fn parse_submit_response(body: &Value) -> Result<Submission, ClientError> {
    let job_id = id_field(body, &JOB_ID_KEYS)
        .or_else(|| body.get("data").and_then(|data| id_field(data, &JOB_ID_KEYS)));
    if let Some(job_id) = job_id {
        return Ok(Submission::Pending(JobId::new(job_id)));
    }

    match body.get("data") {
        Some(data) if !data.is_null() => Ok(Submission::Immediate(parse_payload(data)?)),
        _ => Err(ClientError::Protocol(
            "generate response had neither a job id nor result data".to_string(),
        )),
    }
}

/// An explicit `status` wins over the `success` flag. An `error` field fails
/// any job that has not completed, whatever its status says.
pub fn parse_status_response(body: &Value) -> Result<JobStatus, ClientError> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase());

    match status.as_deref() {
        Some("completed") => completed(body),
        Some("failed") => Ok(JobStatus::Failed(failure_message(body))),
        Some(_) if has_error(body) => Ok(JobStatus::Failed(failure_message(body))),
        Some("processing") | Some("pending") | Some("queued") => Ok(JobStatus::Processing),
        Some(other) => Err(ClientError::Protocol(format!(
            "unknown job status '{other}'"
        ))),
        None => {
            if has_error(body) || body.get("success") == Some(&Value::Bool(false)) {
                Ok(JobStatus::Failed(failure_message(body)))
            } else if body.get("success") == Some(&Value::Bool(true)) {
                completed(body)
            } else {
                Err(ClientError::Protocol(
                    "status response had no status, success or error field".to_string(),
                ))
            }
        }
    }
}

pub fn parse_payload(data: &Value) -> Result<RecommendationPayload, ClientError> {
    let list = match data {
        Value::Array(_) => Some(data),
        Value::Object(_) => CARD_LIST_KEYS.iter().find_map(|key| data.get(*key)),
        _ => {
            return Err(ClientError::Protocol(
                "recommendation data must be an object or a list".to_string(),
            ))
        }
    };

    let cards = match list {
        Some(Value::Array(items)) => items.iter().filter_map(parse_card).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(ClientError::Protocol(
                "recommended cards must be a list".to_string(),
            ))
        }
    };

    let count = data
        .get("count")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(cards.len());
    let summary = data
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let filters = data.get("filters").filter(|v| !v.is_null()).cloned();

    Ok(RecommendationPayload {
        cards,
        filters,
        summary,
        count,
        raw: data.clone(),
    })
}

pub fn parse_history(body: &Value) -> Result<Vec<HistoryEntry>, ClientError> {
    let list = match body {
        Value::Array(_) => body,
        _ => ["data", "history", "recommendations"]
            .iter()
            .find_map(|key| body.get(*key).filter(|v| v.is_array()))
            .ok_or_else(|| {
                ClientError::Protocol("history response did not include a list".to_string())
            })?,
    };

    serde_json::from_value(list.clone())
        .map_err(|e| ClientError::Protocol(format!("malformed history entry: {e}")))
}

pub fn parse_detail(body: &Value) -> Result<RecommendationPayload, ClientError> {
    match body.get("data") {
        Some(data) if !data.is_null() => parse_payload(data),
        _ => parse_payload(body),
    }
}

fn completed(body: &Value) -> Result<JobStatus, ClientError> {
    match body.get("data") {
        Some(data) if !data.is_null() => Ok(JobStatus::Completed(parse_payload(data)?)),
        _ => Err(ClientError::Protocol(
            "job reported completion without result data".to_string(),
        )),
    }
}

fn has_error(body: &Value) -> bool {
    matches!(body.get("error"), Some(v) if !v.is_null() && v != &Value::Bool(false))
}

// A failed job's `error` is more specific than a progress `message`.
fn failure_message(body: &Value) -> String {
    body.get("error")
        .and_then(message_text)
        .or_else(|| error_message(body))
        .unwrap_or_else(|| "recommendation job failed".to_string())
}

fn parse_card(value: &Value) -> Option<RecommendedCard> {
    match serde_json::from_value::<RecommendedCard>(value.clone()) {
        Ok(card) => Some(card),
        Err(err) => {
            tracing::warn!(error = %err, "skipping malformed recommended card");
            None
        }
    }
}

fn id_field(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
