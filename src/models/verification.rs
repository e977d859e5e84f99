use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Two-valued judgment on a single audit axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
pub enum Verdict {
    #[serde(rename = "OK")]
    #[strum(serialize = "OK")]
    Ok,
    #[serde(rename = "WARNING")]
    #[strum(serialize = "WARNING")]
    Warning,
}

impl Verdict {
    pub fn is_warning(self) -> bool {
        matches!(self, Verdict::Warning)
    }
}

/// Three-axis verdict returned by the audit protocol call.
///
/// All fields are required; a response missing any of them is rejected as a
/// schema violation rather than accepted partially.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationVerdict {
    pub ean_match: Verdict,
    pub visual_match: Verdict,
    pub damage_detected: Verdict,
    pub ean_details: String,
    pub client_ean: String,
    pub return_ean: String,
    pub shipping_number: String,
    pub visual_details: String,
    pub damage_details: String,
    pub summary: String,
}

impl VerificationVerdict {
    /// Axes in fixed report order: code match, visual match, damage.
    pub fn axes(&self) -> [AxisFinding<'_>; 3] {
        [
            AxisFinding {
                title: "EAN Code / Reference",
                verdict: self.ean_match,
                details: &self.ean_details,
            },
            AxisFinding {
                title: "Appearance and Authenticity",
                verdict: self.visual_match,
                details: &self.visual_details,
            },
            AxisFinding {
                title: "Condition and Integrity",
                verdict: self.damage_detected,
                details: &self.damage_details,
            },
        ]
    }

    /// Overall audit status: warning if any axis is in the warning state.
    pub fn overall_status(&self) -> AuditStatus {
        if self.axes().iter().any(|axis| axis.verdict.is_warning()) {
            AuditStatus::Warning
        } else {
            AuditStatus::Ok
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AxisFinding<'a> {
    pub title: &'static str,
    pub verdict: Verdict,
    pub details: &'a str,
}

/// Overall outcome of an audit, shared by the report filename and the
/// storage metadata record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
pub enum AuditStatus {
    #[serde(rename = "OK")]
    #[strum(serialize = "OK")]
    Ok,
    #[serde(rename = "Warning")]
    #[strum(serialize = "Warning")]
    Warning,
}

impl AuditStatus {
    /// Filename suffix: `S` flags a warning, `N` a clean audit.
    pub fn file_suffix(self) -> char {
        match self {
            AuditStatus::Warning => 'S',
            AuditStatus::Ok => 'N',
        }
    }
}
