use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder for any label field the AI could not read.
pub const NOT_DETECTED: &str = "Not detected";

/// Metadata read from the reference shipping label.
///
/// Every field is always populated: missing, null or blank values from the
/// AI response collapse to [`NOT_DETECTED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelMetadata {
    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub shipping_number: String,

    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub ean: String,

    /// Quality-label code.
    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub ql: String,

    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub brand: String,

    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub color: String,

    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub size: String,

    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub vendor_size: String,

    #[serde(default = "not_detected", deserialize_with = "detected_or_sentinel")]
    pub description: String,
}

impl Default for LabelMetadata {
    fn default() -> Self {
        Self {
            shipping_number: not_detected(),
            ean: not_detected(),
            ql: not_detected(),
            brand: not_detected(),
            color: not_detected(),
            size: not_detected(),
            vendor_size: not_detected(),
            description: not_detected(),
        }
    }
}

impl LabelMetadata {
    /// Labelled fields in report grid order.
    pub fn labelled_fields(&self) -> [(&'static str, &str); 8] {
        [
            ("Shipping/Order No.:", self.shipping_number.as_str()),
            ("EAN:", self.ean.as_str()),
            ("QL:", self.ql.as_str()),
            ("Brand:", self.brand.as_str()),
            ("Color:", self.color.as_str()),
            ("Size:", self.size.as_str()),
            ("Vendor size:", self.vendor_size.as_str()),
            ("Description:", self.description.as_str()),
        ]
    }
}

/// Outcome of the label extraction call on the reference image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientValidationResult {
    pub is_valid: bool,
    pub missing_fields: Vec<String>,
    pub detected_data: LabelMetadata,
}

/// True when a value carries real label data rather than the sentinel.
pub fn is_detected(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NOT_DETECTED)
}

fn not_detected() -> String {
    NOT_DETECTED.to_string()
}

fn detected_or_sentinel<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => not_detected(),
    })
}
