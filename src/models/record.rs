use serde::{Deserialize, Deserializer, Serialize};

use super::enums::ReportStatus;

/// A patient record as held by the Record Service.
///
/// `patient_id` is assigned by the server and never invented client-side.
/// Fields the server may echo in different shapes (`age` as a number or a
/// string) are accepted loosely and normalised to strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub patient_id: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub age: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub gender: String,
    #[serde(default, deserialize_with = "loose_optional_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "loose_optional_string")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ReportStatus,
    #[serde(default, deserialize_with = "loose_optional_string")]
    pub report_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_id: Option<String>,
}

impl PatientRecord {
    pub fn has_report(&self) -> bool {
        self.report_url.is_some()
    }
}

/// `null` reads as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_optional_string(deserializer)?.unwrap_or_default())
}

/// Accept a string, a number or a bool; `null` and blank strings become `None`.
fn loose_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}
