//! Diagnostic report files: selection rules, encoding and the upload payload.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde::Serialize;
use thiserror::Error;

/// File types the picker offers and the upload accepts.
pub const ACCEPTED_REPORT_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unsupported report file type: {0} (accepted: pdf, jpg, jpeg, png)")]
    UnsupportedType(String),

    #[error("Cannot read report file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether `path` has one of the accepted extensions (case-insensitive).
pub fn is_accepted_report(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| ACCEPTED_REPORT_EXTENSIONS.contains(&e.as_str()))
}

/// Storage key the Record Service files the report under.
///
/// The suffix is always `.pdf`, whatever the uploaded type is.
// TODO: confirm with product whether images should keep their own extension.
pub fn report_storage_key(lab_id: &str, patient_id: &str) -> String {
    format!("reports/{lab_id}/{patient_id}.pdf")
}

/// A report file read fully into memory and base64-encoded.
#[derive(Clone)]
pub struct ReportFile {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content_base64: String,
}

impl ReportFile {
    /// Read `path` whole. No streaming or chunking: the upload is one request.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        if !is_accepted_report(path) {
            return Err(ReportError::UnsupportedType(path.display().to_string()));
        }

        let bytes = std::fs::read(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mime_type,
            size_bytes: bytes.len() as u64,
            content_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }
}

impl std::fmt::Debug for ReportFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /uploadReport`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReportRequest {
    pub file_content: String,
    /// Storage key, see [`report_storage_key`].
    pub filename: String,
    pub patient_id: String,
    pub lab_id: String,
}

impl UploadReportRequest {
    pub fn new(file: &ReportFile, patient_id: &str, lab_id: &str) -> Self {
        Self {
            file_content: file.content_base64.clone(),
            filename: report_storage_key(lab_id, patient_id),
            patient_id: patient_id.to_string(),
            lab_id: lab_id.to_string(),
        }
    }
}

impl std::fmt::Debug for UploadReportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadReportRequest")
            .field("filename", &self.filename)
            .field("patient_id", &self.patient_id)
            .field("lab_id", &self.lab_id)
            .field("content_len", &self.file_content.len())
            .finish()
    }
}
