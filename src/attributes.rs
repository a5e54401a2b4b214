//! Attribute values and the STF 2.0 attribute templates.

use std::collections::HashMap;

use crate::conventions::{
    mandatory_global_attributes, CATCHMENT_ATTR_KEY, COMMENT_ATTR_KEY, HISTORY_ATTR_KEY,
    INSTITUTION_ATTR_KEY, SOURCE_ATTR_KEY, STF_2_0_URL, STF_CONVENTION_VERSION_ATTR_KEY,
    STF_NC_SPEC_ATTR_KEY, TITLE_ATTR_KEY,
};
use crate::error::EftsError;

/// Supported attribute value types
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i32),
    Float(f32),
    Double(f64),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

/// Variable attributes keyed by name.
pub type Attributes = HashMap<String, AttributeValue>;

/// Attribute template describing the kind of data stored in a variable.
pub fn create_var_attribute_definition(
    data_type_code: i32,
    type_description: &str,
    dat_type: &str,
    dat_type_description: &str,
    location_type: &str,
) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("type".to_string(), AttributeValue::Int(data_type_code));
    attrs.insert(
        "type_description".to_string(),
        AttributeValue::from(type_description),
    );
    attrs.insert("dat_type".to_string(), AttributeValue::from(dat_type));
    attrs.insert(
        "dat_type_description".to_string(),
        AttributeValue::from(dat_type_description),
    );
    attrs.insert(
        "location_type".to_string(),
        AttributeValue::from(location_type),
    );
    attrs
}

/// The template most data variables use: accumulated point data derived
/// from interpolated observations.
pub fn default_var_attribute_definition() -> Attributes {
    create_var_attribute_definition(
        2,
        "accumulated over the preceding interval",
        "der",
        "AWAP data interpolated from observations",
        "Point",
    )
}

/// Define the user-provided part of the global attributes.
///
/// With `strict` set, an empty title is rejected.
pub fn create_global_attributes(
    title: &str,
    institution: &str,
    source: &str,
    catchment: &str,
    comment: &str,
    strict: bool,
) -> Result<HashMap<String, String>, EftsError> {
    if strict && title.is_empty() {
        return Err(EftsError::InvalidArgument(
            "Empty title is not accepted as a valid attribute".to_string(),
        ));
    }
    let mut attrs = HashMap::new();
    attrs.insert(TITLE_ATTR_KEY.to_string(), title.to_string());
    attrs.insert(INSTITUTION_ATTR_KEY.to_string(), institution.to_string());
    attrs.insert(SOURCE_ATTR_KEY.to_string(), source.to_string());
    attrs.insert(CATCHMENT_ATTR_KEY.to_string(), catchment.to_string());
    attrs.insert(COMMENT_ATTR_KEY.to_string(), comment.to_string());
    Ok(attrs)
}

/// All mandatory global attributes with placeholder values, convention
/// version and spec URL included.
pub fn default_global_attributes() -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for key in [
        TITLE_ATTR_KEY,
        INSTITUTION_ATTR_KEY,
        SOURCE_ATTR_KEY,
        CATCHMENT_ATTR_KEY,
        COMMENT_ATTR_KEY,
        HISTORY_ATTR_KEY,
    ] {
        attrs.insert(key.to_string(), "not provided".to_string());
    }
    attrs.insert(
        STF_CONVENTION_VERSION_ATTR_KEY.to_string(),
        "2.0".to_string(),
    );
    attrs.insert(STF_NC_SPEC_ATTR_KEY.to_string(), STF_2_0_URL.to_string());
    attrs
}

/// Check that every mandatory global attribute is present, reporting all
/// missing keys at once.
pub fn check_global_attributes(attrs: &HashMap<String, String>) -> Result<(), EftsError> {
    let missing: Vec<&str> = mandatory_global_attributes()
        .into_iter()
        .filter(|k| !attrs.contains_key(*k))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EftsError::MissingGlobalAttributes(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_global_attributes_are_complete() {
        let attrs = default_global_attributes();
        assert!(check_global_attributes(&attrs).is_ok());
        assert_eq!(attrs[STF_CONVENTION_VERSION_ATTR_KEY], "2.0");
    }

    #[test]
    fn check_reports_all_missing_keys() {
        let attrs =
            create_global_attributes("t", "org", "src", "catchment", "comment", false).unwrap();
        let err = check_global_attributes(&attrs).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(STF_CONVENTION_VERSION_ATTR_KEY));
        assert!(msg.contains(HISTORY_ATTR_KEY));
    }

    #[test]
    fn strict_rejects_empty_title() {
        let result = create_global_attributes("", "org", "src", "c", "", true);
        assert!(result.is_err());
    }

    #[test]
    fn var_attribute_template_has_type_code() {
        let attrs = default_var_attribute_definition();
        assert_eq!(attrs["type"], AttributeValue::Int(2));
        assert_eq!(
            attrs["location_type"],
            AttributeValue::Str("Point".to_string())
        );
    }
}
