use std::collections::HashMap;
use std::sync::Mutex;

use super::{RecordService, ServiceAck, ServiceError};
use crate::models::{DraftForm, PatientRecord, ReportStatus};
use crate::report::UploadReportRequest;

/// Which Record Service operation a call or scripted failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    List,
    Delete,
    UpdateStatus,
    UploadReport,
}

/// One call received by [`MockRecordService`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCall {
    Create {
        token: String,
        draft: DraftForm,
    },
    List {
        token: String,
        lab_id: String,
    },
    Delete {
        patient_id: String,
        lab_id: String,
    },
    UpdateStatus {
        patient_id: String,
        lab_id: String,
        status: ReportStatus,
    },
    UploadReport {
        request: UploadReportRequest,
    },
}

impl RecordCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Create { .. } => Operation::Create,
            Self::List { .. } => Operation::List,
            Self::Delete { .. } => Operation::Delete,
            Self::UpdateStatus { .. } => Operation::UpdateStatus,
            Self::UploadReport { .. } => Operation::UploadReport,
        }
    }
}

struct MockState {
    records: Vec<PatientRecord>,
    calls: Vec<RecordCall>,
    failures: HashMap<Operation, ServiceError>,
    next_id: u32,
}

/// In-memory Record Service for tests and dry runs.
///
/// Behaves like a single-lab server (create assigns `p{n}` ids, delete and
/// status updates mutate the stored list) and records every call. Any
/// operation can be scripted to fail with a given [`ServiceError`].
pub struct MockRecordService {
    state: Mutex<MockState>,
}

impl MockRecordService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                records: Vec::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn with_records(self, records: Vec<PatientRecord>) -> Self {
        self.lock().records = records;
        self
    }

    /// Make every call to `operation` fail with `error`.
    pub fn failing(self, operation: Operation, error: ServiceError) -> Self {
        self.lock().failures.insert(operation, error);
        self
    }

    pub fn calls(&self) -> Vec<RecordCall> {
        self.lock().calls.clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().calls.iter().map(RecordCall::operation).collect()
    }

    pub fn records(&self) -> Vec<PatientRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panic while holding the lock already fails the test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: RecordCall) -> Result<std::sync::MutexGuard<'_, MockState>, ServiceError> {
        let operation = call.operation();
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(error) = state.failures.get(&operation).cloned() {
            return Err(error);
        }
        Ok(state)
    }
}

impl Default for MockRecordService {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordService for MockRecordService {
    fn create(&self, token: &str, draft: &DraftForm) -> Result<ServiceAck, ServiceError> {
        let mut state = self.record(RecordCall::Create {
            token: token.to_string(),
            draft: draft.clone(),
        })?;
        let patient_id = format!("p{}", state.next_id);
        state.next_id += 1;
        state.records.push(PatientRecord {
            patient_id: patient_id.clone(),
            name: draft.name.clone(),
            age: draft.age.clone(),
            gender: draft.gender.clone(),
            phone_number: Some(draft.phone_number.clone()).filter(|s| !s.is_empty()),
            language: Some(draft.language.clone()).filter(|s| !s.is_empty()),
            status: ReportStatus::Pending,
            report_url: Some(draft.report_url.clone()).filter(|s| !s.is_empty()),
            lab_id: None,
        });
        Ok(ServiceAck {
            message: Some(format!("Patient {patient_id} saved")),
        })
    }

    fn list(&self, token: &str, lab_id: &str) -> Result<Vec<PatientRecord>, ServiceError> {
        let state = self.record(RecordCall::List {
            token: token.to_string(),
            lab_id: lab_id.to_string(),
        })?;
        Ok(state.records.clone())
    }

    fn delete(
        &self,
        _token: &str,
        patient_id: &str,
        lab_id: &str,
    ) -> Result<ServiceAck, ServiceError> {
        let mut state = self.record(RecordCall::Delete {
            patient_id: patient_id.to_string(),
            lab_id: lab_id.to_string(),
        })?;
        let before = state.records.len();
        state.records.retain(|r| r.patient_id != patient_id);
        if state.records.len() == before {
            return Err(ServiceError::Rejected {
                status: 404,
                message: Some("Patient not found".into()),
            });
        }
        Ok(ServiceAck::default())
    }

    fn update_status(
        &self,
        _token: &str,
        patient_id: &str,
        lab_id: &str,
        status: ReportStatus,
    ) -> Result<(), ServiceError> {
        let mut state = self.record(RecordCall::UpdateStatus {
            patient_id: patient_id.to_string(),
            lab_id: lab_id.to_string(),
            status,
        })?;
        if let Some(record) = state.records.iter_mut().find(|r| r.patient_id == patient_id) {
            record.status = status;
        }
        Ok(())
    }

    fn upload_report(
        &self,
        _token: &str,
        request: &UploadReportRequest,
    ) -> Result<ServiceAck, ServiceError> {
        let mut state = self.record(RecordCall::UploadReport {
            request: request.clone(),
        })?;
        if let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.patient_id == request.patient_id)
        {
            record.report_url = Some(request.filename.clone());
        }
        Ok(ServiceAck::default())
    }
}
