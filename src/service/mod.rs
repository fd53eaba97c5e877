//! Record Service: the remote REST API that owns patient records.
//!
//! Five operations over `/patient` and `/uploadReport`. Every call carries the
//! raw identity token as the `Authorization` header.

pub mod http;
pub mod mock;

pub use http::*;
pub use mock::*;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{DraftForm, PatientRecord, ReportStatus};
use crate::report::UploadReportRequest;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Non-2xx response. `message` is the body's `error` field when present.
    #[error("Record service returned status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Rejected { status: u16, message: Option<String> },

    #[error("Record service unreachable: {0}")]
    Transport(String),

    #[error("Malformed record service response: {0}")]
    MalformedResponse(String),

    #[error("Invalid record service URL: {0}")]
    InvalidUrl(String),
}

/// Success body of create/delete/upload: an optional confirmation message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceAck {
    #[serde(default)]
    pub message: Option<String>,
}

/// Failure body: an optional human-readable error.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

pub trait RecordService {
    /// `POST /patient` with the full draft.
    fn create(&self, token: &str, draft: &DraftForm) -> Result<ServiceAck, ServiceError>;

    /// `GET /patient?labId=…`, order as returned by the server.
    fn list(&self, token: &str, lab_id: &str) -> Result<Vec<PatientRecord>, ServiceError>;

    /// `DELETE /patient/{id}?labId=…`.
    fn delete(&self, token: &str, patient_id: &str, lab_id: &str)
        -> Result<ServiceAck, ServiceError>;

    /// `PUT /patient/{id}?labId=…` with `{status}`. The server's answer is not
    /// inspected; only transport failures are errors.
    fn update_status(
        &self,
        token: &str,
        patient_id: &str,
        lab_id: &str,
        status: ReportStatus,
    ) -> Result<(), ServiceError>;

    /// `POST /uploadReport` with the base64 file content.
    fn upload_report(
        &self,
        token: &str,
        request: &UploadReportRequest,
    ) -> Result<ServiceAck, ServiceError>;
}

/// Normalise a list response into records.
///
/// The service sometimes answers with the array JSON-encoded inside a string
/// (`"[{…}]"`) instead of the array itself; both shapes are accepted.
pub fn normalize_record_list(value: serde_json::Value) -> Result<Vec<PatientRecord>, ServiceError> {
    let value = match value {
        serde_json::Value::String(encoded) => serde_json::from_str(&encoded)
            .map_err(|e| ServiceError::MalformedResponse(format!("encoded list: {e}")))?,
        other => other,
    };

    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)
            .map_err(|e| ServiceError::MalformedResponse(e.to_string())),
        other => Err(ServiceError::MalformedResponse(format!(
            "expected a list of records, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
