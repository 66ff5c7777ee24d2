use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::countries;

pub const ADDRESS1_MAX_LEN: usize = 1024;
pub const ADDRESS2_MAX_LEN: usize = 1024;
pub const ZIP_CODE_MAX_LEN: usize = 12;
pub const CITY_MAX_LEN: usize = 1024;

/// Columns accepted as list filters and sort keys.
pub const FILTERABLE_COLUMNS: &[&str] = &["id", "address1", "address2", "zip_code", "city", "country"];

pub type FieldErrors = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PostalAddress {
    pub id: i64,
    pub address1: String,
    pub address2: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub country: String,
}

impl PostalAddress {
    pub fn fields(&self) -> AddressFields {
        AddressFields {
            address1: self.address1.clone(),
            address2: self.address2.clone(),
            zip_code: self.zip_code.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
        }
    }
}

/// The five-tuple that identifies a postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub address1: String,
    pub address2: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub country: String,
}

impl AddressFields {
    pub fn new(address1: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            address1: address1.into(),
            address2: None,
            zip_code: None,
            city: None,
            country: country.into(),
        }
    }

    pub fn address2(mut self, value: impl Into<String>) -> Self {
        self.address2 = Some(value.into());
        self
    }

    pub fn zip_code(mut self, value: impl Into<String>) -> Self {
        self.zip_code = Some(value.into());
        self
    }

    pub fn city(mut self, value: impl Into<String>) -> Self {
        self.city = Some(value.into());
        self
    }

    /// The uniqueness rule covering this tuple's null pattern.
    pub fn unique_rule(&self) -> UniqueRule {
        UniqueRule {
            has_address2: self.address2.is_some(),
            has_zip_code: self.zip_code.is_some(),
            has_city: self.city.is_some(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        check_text(&mut errors, "address1", Some(&self.address1), ADDRESS1_MAX_LEN);
        check_text(&mut errors, "address2", self.address2.as_deref(), ADDRESS2_MAX_LEN);
        check_text(&mut errors, "zip_code", self.zip_code.as_deref(), ZIP_CODE_MAX_LEN);
        check_text(&mut errors, "city", self.city.as_deref(), CITY_MAX_LEN);

        if self.country.is_empty() {
            errors.insert("country".to_string(), "This field may not be blank.".to_string());
        } else if !countries::is_valid_alpha3(&self.country) {
            errors.insert("country".to_string(), format!("\"{}\" is not a valid choice.", self.country));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn check_text(errors: &mut FieldErrors, field: &str, value: Option<&str>, max_len: usize) {
    let Some(value) = value else { return };
    if value.trim().is_empty() {
        errors.insert(field.to_string(), "This field may not be blank.".to_string());
    } else if value.chars().count() > max_len {
        errors.insert(
            field.to_string(),
            format!("Ensure this field has no more than {} characters.", max_len),
        );
    }
}

/// One of the eight null-aware uniqueness rules over postal addresses.
///
/// Two addresses collide iff they share a rule and agree on every field it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueRule {
    pub has_address2: bool,
    pub has_zip_code: bool,
    pub has_city: bool,
}

impl UniqueRule {
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = vec!["address1"];
        if self.has_address2 {
            fields.push("address2");
        }
        if self.has_zip_code {
            fields.push("zip_code");
        }
        if self.has_city {
            fields.push("city");
        }
        fields.push("country");
        fields
    }

    /// Name of the partial unique index enforcing this rule.
    pub fn index_name(&self) -> String {
        let missing: Vec<&str> = [
            (!self.has_address2).then_some("address2"),
            (!self.has_zip_code).then_some("zip_code"),
            (!self.has_city).then_some("city"),
        ]
        .into_iter()
        .flatten()
        .collect();

        if missing.is_empty() {
            "unique_with_all".to_string()
        } else {
            format!("unique_without_{}", missing.join("_"))
        }
    }

    pub fn conflict_message(&self) -> String {
        format!("The fields {} must make a unique set.", self.fields().join(", "))
    }
}

/// Address body for create and partial update.
///
/// Every field distinguishes "absent" (`None`) from an explicit `null` (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressPayload {
    #[serde(default, deserialize_with = "double_option")]
    pub address1: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address2: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub zip_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub country: Option<Option<String>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl AddressPayload {
    /// Build a full tuple for creation; required fields must be present and non-null.
    pub fn into_fields(self) -> Result<AddressFields, FieldErrors> {
        let mut errors = FieldErrors::new();
        let address1 = required(&mut errors, "address1", self.address1);
        let country = required(&mut errors, "country", self.country);
        if !errors.is_empty() {
            return Err(errors);
        }

        let fields = AddressFields {
            address1,
            address2: self.address2.flatten(),
            zip_code: self.zip_code.flatten(),
            city: self.city.flatten(),
            country,
        };
        fields.validate()?;
        Ok(fields)
    }

    /// Apply a partial update on top of `current`. Absent fields keep their value, `null` clears.
    pub fn apply_to(self, current: &AddressFields) -> Result<AddressFields, FieldErrors> {
        let mut errors = FieldErrors::new();
        for (name, value) in [("address1", &self.address1), ("country", &self.country)] {
            if matches!(value, Some(None)) {
                errors.insert(name.to_string(), "This field may not be null.".to_string());
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let fields = AddressFields {
            address1: self.address1.flatten().unwrap_or_else(|| current.address1.clone()),
            address2: self.address2.unwrap_or_else(|| current.address2.clone()),
            zip_code: self.zip_code.unwrap_or_else(|| current.zip_code.clone()),
            city: self.city.unwrap_or_else(|| current.city.clone()),
            country: self.country.flatten().unwrap_or_else(|| current.country.clone()),
        };
        fields.validate()?;
        Ok(fields)
    }
}

fn required(errors: &mut FieldErrors, field: &str, value: Option<Option<String>>) -> String {
    match value {
        Some(Some(v)) => v,
        Some(None) => {
            errors.insert(field.to_string(), "This field may not be null.".to_string());
            String::new()
        }
        None => {
            errors.insert(field.to_string(), "This field is required.".to_string());
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> AddressPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn unique_rule_names_present_fields() {
        let full = AddressFields::new("1 High St", "GBR").address2("Flat 2").zip_code("AB1 2CD").city("Leeds");
        assert_eq!(full.unique_rule().index_name(), "unique_with_all");
        assert_eq!(
            full.unique_rule().conflict_message(),
            "The fields address1, address2, zip_code, city, country must make a unique set."
        );

        let bare = AddressFields::new("1 High St", "GBR");
        assert_eq!(bare.unique_rule().index_name(), "unique_without_address2_zip_code_city");
        assert_eq!(bare.unique_rule().fields(), vec!["address1", "country"]);

        let no_city = AddressFields::new("1 High St", "GBR").zip_code("AB1");
        assert_eq!(no_city.unique_rule().index_name(), "unique_without_address2_city");
    }

    #[test]
    fn create_payload_requires_address1_and_country() {
        let errors = payload(json!({ "city": "Leeds" })).into_fields().unwrap_err();
        assert_eq!(errors["address1"], "This field is required.");
        assert_eq!(errors["country"], "This field is required.");

        let errors = payload(json!({ "address1": null, "country": "GBR" })).into_fields().unwrap_err();
        assert_eq!(errors["address1"], "This field may not be null.");
    }

    #[test]
    fn create_payload_validates_lengths_and_country() {
        let errors = payload(json!({
            "address1": "x",
            "zip_code": "1234567890123",
            "country": "gbr"
        }))
        .into_fields()
        .unwrap_err();
        assert!(errors["zip_code"].contains("12 characters"));
        assert!(errors["country"].contains("not a valid choice"));

        let errors = payload(json!({ "address1": "  ", "country": "GBR" })).into_fields().unwrap_err();
        assert_eq!(errors["address1"], "This field may not be blank.");

        let fields = payload(json!({ "address1": "x", "address2": null, "country": "GBR" })).into_fields().unwrap();
        assert_eq!(fields.address2, None);
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let current = AddressFields::new("1 High St", "GBR").city("Leeds").zip_code("LS1");

        let updated = payload(json!({ "city": null })).apply_to(&current).unwrap();
        assert_eq!(updated.city, None);
        assert_eq!(updated.zip_code.as_deref(), Some("LS1"));

        let updated = payload(json!({ "address2": "Flat 1" })).apply_to(&current).unwrap();
        assert_eq!(updated.address2.as_deref(), Some("Flat 1"));
        assert_eq!(updated.city.as_deref(), Some("Leeds"));

        let errors = payload(json!({ "country": null })).apply_to(&current).unwrap_err();
        assert_eq!(errors["country"], "This field may not be null.");
    }
}
