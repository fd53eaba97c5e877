use super::messages;
use super::{ActionOutcome, DashboardError};
use crate::interaction::{Interaction, Notice};
use crate::models::{DraftField, DraftForm, PatientRecord, ReportStatus};
use crate::report::{ReportFile, UploadReportRequest, ACCEPTED_REPORT_EXTENSIONS};
use crate::service::{RecordService, ServiceError};
use crate::session::SessionProvider;

/// Dashboard view-state and the actions that drive it.
///
/// Owns the draft form and the last fetched record list. Every action issues
/// its request(s) in sequence and, after a mutation, replaces `records` with
/// a fresh list from the server; there is no optimistic local change. Messages
/// for the user go through [`Interaction::notify`], the returned `Result` is
/// for the caller.
pub struct DashboardController<S, R, I> {
    session: S,
    service: R,
    ui: I,
    draft: DraftForm,
    records: Vec<PatientRecord>,
    is_loading: bool,
}

impl<S, R, I> DashboardController<S, R, I>
where
    S: SessionProvider,
    R: RecordService,
    I: Interaction,
{
    pub fn new(session: S, service: R, ui: I) -> Self {
        Self {
            session,
            service,
            ui,
            draft: DraftForm::default(),
            records: Vec::new(),
            is_loading: false,
        }
    }

    pub fn draft(&self) -> &DraftForm {
        &self.draft
    }

    /// Records in the order the server returned them.
    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    /// True only while a list fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn service(&self) -> &R {
        &self.service
    }

    pub fn interaction(&self) -> &I {
        &self.ui
    }

    /// Assign a draft field. The phone field ignores non-digit input.
    pub fn update_draft_field(&mut self, field: DraftField, value: &str) -> bool {
        let accepted = self.draft.set(field, value);
        if !accepted {
            tracing::debug!(field = field.as_str(), "Draft input rejected");
        }
        accepted
    }

    /// Create a record from the draft, then clear the draft and re-fetch.
    pub fn submit_record(&mut self) -> Result<ActionOutcome, DashboardError> {
        if !self.draft.has_valid_phone() {
            self.ui.notify(Notice::error(messages::PHONE_LENGTH));
            return Err(DashboardError::Validation(messages::PHONE_LENGTH.into()));
        }

        let session = self.session.current_session()?;
        tracing::info!(lab_id = %session.lab_id(), "Creating patient record");

        match self.service.create(&session.id_token, &self.draft) {
            Ok(ack) => {
                let message = ack.message.unwrap_or_else(|| messages::SAVE_OK.into());
                self.ui.notify(Notice::info(message));
                self.draft.clear();
                self.resync();
                Ok(ActionOutcome::Done)
            }
            Err(e) => Err(self.report_failure(e, messages::SAVE_FAILED, messages::SAVE_ERROR)),
        }
    }

    /// Replace `records` with the server's list for the signed-in lab.
    ///
    /// On failure the previous list is kept.
    pub fn fetch_records(&mut self) -> Result<ActionOutcome, DashboardError> {
        self.is_loading = true;
        let result = self.load_records();
        self.is_loading = false;
        result
    }

    fn load_records(&mut self) -> Result<ActionOutcome, DashboardError> {
        let session = self.session.current_session()?;
        match self.service.list(&session.id_token, session.lab_id()) {
            Ok(records) => {
                tracing::debug!(lab_id = %session.lab_id(), count = records.len(), "Fetched records");
                self.records = records;
                Ok(ActionOutcome::Done)
            }
            Err(e) => Err(self.report_failure(e, messages::FETCH_FAILED, messages::FETCH_ERROR)),
        }
    }

    /// Delete a record after the user confirms.
    pub fn delete_record(&mut self, patient_id: &str) -> Result<ActionOutcome, DashboardError> {
        if !self.ui.confirm(messages::DELETE_PROMPT) {
            tracing::debug!(patient_id, "Delete declined");
            return Ok(ActionOutcome::Cancelled);
        }

        let session = self.session.current_session()?;
        tracing::info!(patient_id, lab_id = %session.lab_id(), "Deleting patient record");

        match self
            .service
            .delete(&session.id_token, patient_id, session.lab_id())
        {
            Ok(_) => {
                self.ui.notify(Notice::info(messages::DELETE_OK));
                self.resync();
                Ok(ActionOutcome::Done)
            }
            Err(e) => Err(self.report_failure(e, messages::DELETE_FAILED, messages::DELETE_ERROR)),
        }
    }

    /// Set a record's status, then re-fetch whatever the server answered.
    pub fn update_status(
        &mut self,
        patient_id: &str,
        status: ReportStatus,
    ) -> Result<ActionOutcome, DashboardError> {
        let session = self.session.current_session()?;
        tracing::info!(patient_id, status = %status, "Updating report status");

        let result = self
            .service
            .update_status(&session.id_token, patient_id, session.lab_id(), status);
        let outcome = match result {
            Ok(()) => Ok(ActionOutcome::Done),
            Err(e) => Err(self.report_failure(e, messages::STATUS_ERROR, messages::STATUS_ERROR)),
        };

        self.resync();
        outcome
    }

    /// Pick a report file, upload it, then mark the record `Completed`.
    ///
    /// The status change is a separate best-effort request: if it fails the
    /// upload stands and the action still counts as done.
    pub fn upload_report(&mut self, patient_id: &str) -> Result<ActionOutcome, DashboardError> {
        let Some(path) = self.ui.pick_report_file(ACCEPTED_REPORT_EXTENSIONS) else {
            tracing::debug!(patient_id, "Report selection cancelled");
            return Ok(ActionOutcome::Cancelled);
        };

        let file = match ReportFile::load(&path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(error = %e, "Report file rejected");
                self.ui.notify(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        let session = self.session.current_session()?;
        let request = UploadReportRequest::new(&file, patient_id, session.lab_id());
        tracing::info!(
            patient_id,
            key = %request.filename,
            size_bytes = file.size_bytes,
            mime = %file.mime_type,
            "Uploading report"
        );

        match self.service.upload_report(&session.id_token, &request) {
            Ok(ack) => {
                let message = ack.message.unwrap_or_else(|| messages::UPLOAD_OK.into());
                self.ui.notify(Notice::info(message));
                // Also performs the final re-fetch.
                if let Err(e) = self.update_status(patient_id, ReportStatus::Completed) {
                    tracing::warn!(patient_id, error = %e, "Report uploaded but status not updated");
                }
                Ok(ActionOutcome::Done)
            }
            Err(e) => Err(self.report_failure(e, messages::UPLOAD_FAILED, messages::UPLOAD_ERROR)),
        }
    }

    /// Sign out with the Session Provider and drop all local view-state.
    pub fn sign_out(&mut self) -> Result<(), DashboardError> {
        self.session.sign_out()?;
        self.draft.clear();
        self.records.clear();
        Ok(())
    }

    /// Re-fetch after a mutation. Its own failure was already shown.
    fn resync(&mut self) {
        if let Err(e) = self.fetch_records() {
            tracing::debug!(error = %e, "Re-fetch after mutation failed");
        }
    }

    /// Show the failure to the user and turn it into a [`DashboardError`].
    ///
    /// Server rejections show the server's `error` text (or `rejected`);
    /// anything else is logged and replaced by the generic `generic` text.
    fn report_failure(
        &mut self,
        error: ServiceError,
        rejected: &str,
        generic: &str,
    ) -> DashboardError {
        match error {
            ServiceError::Rejected { status, message } => {
                let message = message.unwrap_or_else(|| rejected.to_string());
                tracing::warn!(status, message = %message, "Record service rejected request");
                self.ui.notify(Notice::error(message.clone()));
                DashboardError::Server { status, message }
            }
            other => {
                tracing::error!(error = %other, context = generic, "Record service request failed");
                self.ui.notify(Notice::error(generic));
                DashboardError::Transport {
                    message: generic.to_string(),
                    detail: other.to_string(),
                }
            }
        }
    }
}
