//! The dashboard controller: draft form + cached record list, kept in step
//! with the Record Service by re-fetching after every mutation.

pub mod controller;

pub use controller::*;

use thiserror::Error;

use crate::report::ReportError;
use crate::session::AuthError;

/// User-facing messages. Server-supplied messages take precedence where the
/// service sends one.
pub mod messages {
    pub const PHONE_LENGTH: &str = "Phone Number must be exactly 10 digits!";
    pub const SAVE_OK: &str = "Patient saved successfully!";
    pub const SAVE_FAILED: &str = "Failed to save patient.";
    pub const SAVE_ERROR: &str = "Error submitting patient info";
    pub const FETCH_FAILED: &str = "Failed to fetch patients.";
    pub const FETCH_ERROR: &str = "Error fetching patients";
    pub const DELETE_PROMPT: &str = "Are you sure you want to delete this patient?";
    pub const DELETE_OK: &str = "Patient deleted successfully";
    pub const DELETE_FAILED: &str = "Failed to delete patient";
    pub const DELETE_ERROR: &str = "Error deleting patient";
    pub const STATUS_ERROR: &str = "Error updating status";
    pub const UPLOAD_OK: &str = "Report uploaded successfully";
    pub const UPLOAD_FAILED: &str = "Failed to upload report";
    pub const UPLOAD_ERROR: &str = "Error uploading report";
}

/// How an action ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// The user declined the confirmation or closed the file picker.
    Cancelled,
}

#[derive(Error, Debug)]
pub enum DashboardError {
    /// Rejected before any network access.
    #[error("{0}")]
    Validation(String),

    #[error("Session unavailable: {0}")]
    Auth(#[from] AuthError),

    /// The Record Service answered with a non-success status.
    #[error("{message} (status {status})")]
    Server { status: u16, message: String },

    /// Network failure or an unreadable response.
    #[error("{message}: {detail}")]
    Transport { message: String, detail: String },

    #[error(transparent)]
    Report(#[from] ReportError),
}
