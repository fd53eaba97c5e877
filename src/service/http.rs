use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{normalize_record_list, RecordService, ServiceAck, ServiceError, ServiceErrorBody};
use crate::models::{DraftForm, PatientRecord, ReportStatus};
use crate::report::UploadReportRequest;

/// Record Service client over HTTPS.
pub struct HttpRecordService {
    base_url: Url,
    client: Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: ReportStatus,
}

impl HttpRecordService {
    /// `base_url` is the API stage root, e.g. `https://api.example.com/prod`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ServiceError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded as one segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder, token: &str) -> Result<Response, ServiceError> {
        request
            .header(AUTHORIZATION, token)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Transport(format!(
                        "request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ServiceError::Transport(e.to_string())
                }
            })
    }

    /// Read the body; on non-2xx turn it into [`ServiceError::Rejected`].
    fn read_success(response: Response) -> Result<String, ServiceError> {
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<ServiceErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        Err(ServiceError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Parse a success body, treating an empty body as the default value.
    fn parse_body<T: DeserializeOwned + Default>(body: &str) -> Result<T, ServiceError> {
        if body.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(body).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
    }
}

impl RecordService for HttpRecordService {
    fn create(&self, token: &str, draft: &DraftForm) -> Result<ServiceAck, ServiceError> {
        let url = self.endpoint(&["patient"])?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(draft);
        let body = Self::read_success(self.send(request, token)?)?;
        // The status decides success; an unexpected body only loses the message.
        Ok(Self::parse_body(&body).unwrap_or_default())
    }

    fn list(&self, token: &str, lab_id: &str) -> Result<Vec<PatientRecord>, ServiceError> {
        let url = self.endpoint(&["patient"])?;
        let request = self.client.get(url).query(&[("labId", lab_id)]);
        let body = Self::read_success(self.send(request, token)?)?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
        normalize_record_list(value)
    }

    fn delete(
        &self,
        token: &str,
        patient_id: &str,
        lab_id: &str,
    ) -> Result<ServiceAck, ServiceError> {
        let url = self.endpoint(&["patient", patient_id])?;
        let request = self.client.delete(url).query(&[("labId", lab_id)]);
        let body = Self::read_success(self.send(request, token)?)?;
        // An ack body is optional and its content is not relied on.
        Ok(Self::parse_body(&body).unwrap_or_default())
    }

    fn update_status(
        &self,
        token: &str,
        patient_id: &str,
        lab_id: &str,
        status: ReportStatus,
    ) -> Result<(), ServiceError> {
        let url = self.endpoint(&["patient", patient_id])?;
        let request = self
            .client
            .put(url)
            .query(&[("labId", lab_id)])
            .header(CONTENT_TYPE, "application/json")
            .json(&StatusUpdate { status });
        let response = self.send(request, token)?;
        if !response.status().is_success() {
            tracing::warn!(
                patient_id,
                status = %status,
                http_status = response.status().as_u16(),
                "Status update answered with non-success; resyncing from server"
            );
        }
        Ok(())
    }

    fn upload_report(
        &self,
        token: &str,
        request: &UploadReportRequest,
    ) -> Result<ServiceAck, ServiceError> {
        let url = self.endpoint(&["uploadReport"])?;
        let http_request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(request);
        let body = Self::read_success(self.send(http_request, token)?)?;
        Ok(Self::parse_body(&body).unwrap_or_default())
    }
}
