use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ModelError;

/// Phone numbers are exactly this many digits.
pub const PHONE_NUMBER_LEN: usize = 10;

/// ASCII digits only. `\d` would also admit other Unicode digit classes.
static PHONE_INPUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]*$").unwrap());

/// The creatable subset of a patient record, held while the user types.
///
/// Serialised as-is for the create request, so the wire names follow the
/// Record Service (camelCase). Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub phone_number: String,
    pub language: String,
    pub report_url: String,
}

/// Names one editable field of [`DraftForm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Age,
    Gender,
    PhoneNumber,
    Language,
    ReportUrl,
}

impl DraftField {
    pub const ALL: [DraftField; 6] = [
        Self::Name,
        Self::Age,
        Self::Gender,
        Self::PhoneNumber,
        Self::Language,
        Self::ReportUrl,
    ];

    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::PhoneNumber => "phoneNumber",
            Self::Language => "language",
            Self::ReportUrl => "reportUrl",
        }
    }
}

impl std::str::FromStr for DraftField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ModelError::UnknownField(s.to_string()))
    }
}

/// Whether `value` is acceptable input for the phone field (digits only).
pub fn is_phone_input(value: &str) -> bool {
    PHONE_INPUT.is_match(value)
}

impl DraftForm {
    /// Assign `value` to `field`.
    ///
    /// The phone field rejects any value containing a non-digit (the draft is
    /// left untouched and `false` returned). Length is not capped here: the
    /// input surface limits it, and [`Self::has_valid_phone`] checks it.
    pub fn set(&mut self, field: DraftField, value: &str) -> bool {
        match field {
            DraftField::Name => self.name = value.to_string(),
            DraftField::Age => self.age = value.to_string(),
            DraftField::Gender => self.gender = value.to_string(),
            DraftField::Language => self.language = value.to_string(),
            DraftField::ReportUrl => self.report_url = value.to_string(),
            DraftField::PhoneNumber => {
                if !is_phone_input(value) {
                    return false;
                }
                self.phone_number = value.to_string();
            }
        }
        true
    }

    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Name => &self.name,
            DraftField::Age => &self.age,
            DraftField::Gender => &self.gender,
            DraftField::PhoneNumber => &self.phone_number,
            DraftField::Language => &self.language,
            DraftField::ReportUrl => &self.report_url,
        }
    }

    pub fn has_valid_phone(&self) -> bool {
        self.phone_number.len() == PHONE_NUMBER_LEN && is_phone_input(&self.phone_number)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_fields_accept_anything() {
        let mut draft = DraftForm::default();
        assert!(draft.set(DraftField::Name, "Asha Rao"));
        assert!(draft.set(DraftField::Age, "34"));
        assert!(draft.set(DraftField::Language, "te"));
        assert_eq!(draft.name, "Asha Rao");
        assert_eq!(draft.get(DraftField::Age), "34");
        assert_eq!(draft.get(DraftField::Language), "te");
    }

    #[test]
    fn phone_accepts_digits() {
        let mut draft = DraftForm::default();
        assert!(draft.set(DraftField::PhoneNumber, "98765"));
        assert_eq!(draft.phone_number, "98765");
    }

    #[test]
    fn phone_rejects_partial_paste_with_letters() {
        let mut draft = DraftForm::default();
        draft.set(DraftField::PhoneNumber, "98765");
        assert!(!draft.set(DraftField::PhoneNumber, "987654321a"));
        assert!(!draft.set(DraftField::PhoneNumber, "+919876543210"));
        assert!(!draft.set(DraftField::PhoneNumber, "98765 43210"));
        assert_eq!(draft.phone_number, "98765");
    }

    #[test]
    fn phone_rejects_non_ascii_digits() {
        let mut draft = DraftForm::default();
        assert!(!draft.set(DraftField::PhoneNumber, "٩٨٧٦٥"));
        assert!(draft.phone_number.is_empty());
    }

    #[test]
    fn long_phone_is_kept_whole_and_invalid() {
        let mut draft = DraftForm::default();
        assert!(draft.set(DraftField::PhoneNumber, "987654321012"));
        assert_eq!(draft.phone_number, "987654321012");
        assert!(!draft.has_valid_phone());
    }

    #[test]
    fn empty_phone_is_accepted_as_input() {
        let mut draft = DraftForm::default();
        draft.set(DraftField::PhoneNumber, "123");
        assert!(draft.set(DraftField::PhoneNumber, ""));
        assert!(draft.phone_number.is_empty());
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut draft = DraftForm::default();
        draft.set(DraftField::Name, "Asha");
        assert!(!draft.is_empty());
        draft.clear();
        assert!(draft.is_empty());
    }

    #[test]
    fn field_names_parse() {
        for field in DraftField::ALL {
            assert_eq!(field.as_str().parse::<DraftField>().unwrap(), field);
        }
        assert!("labId".parse::<DraftField>().is_err());
    }

    #[test]
    fn create_payload_uses_wire_names() {
        let mut draft = DraftForm::default();
        draft.set(DraftField::Name, "Asha");
        draft.set(DraftField::PhoneNumber, "9876543210");
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["name"], "Asha");
        assert_eq!(json["phoneNumber"], "9876543210");
        assert_eq!(json["reportUrl"], "");
        assert!(json.get("labId").is_none());
    }

    proptest! {
        #[test]
        fn any_non_digit_leaves_phone_unchanged(
            prefix in "[0-9]{0,5}",
            junk in "[^0-9]",
            suffix in "[0-9]{0,5}",
        ) {
            let mut draft = DraftForm::default();
            draft.set(DraftField::PhoneNumber, "12345");
            let before = draft.clone();
            let input = format!("{prefix}{junk}{suffix}");
            prop_assert!(!draft.set(DraftField::PhoneNumber, &input));
            prop_assert_eq!(draft, before);
        }

        #[test]
        fn digit_input_is_valid_only_at_ten(digits in "[0-9]{0,20}") {
            let mut draft = DraftForm::default();
            prop_assert!(draft.set(DraftField::PhoneNumber, &digits));
            prop_assert_eq!(draft.phone_number.as_str(), digits.as_str());
            prop_assert_eq!(draft.has_valid_phone(), digits.len() == PHONE_NUMBER_LEN);
        }
    }
}
