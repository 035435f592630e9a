use ai::OutputSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const YES: &str = "Yes";
pub const NO: &str = "No";

fn default_verdict() -> String {
    NO.to_string()
}

/// The model's judgment for one image.
///
/// Values are nominally `"Yes"` or `"No"`, only the prompt asks for that. What the
/// model actually returned is kept unless a [`VerdictPolicy`] says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResult {
    #[serde(default = "default_verdict")]
    pub open_hatch: String,
    #[serde(default = "default_verdict")]
    pub construction: String,
}

impl Default for InferenceResult {
    fn default() -> Self {
        Self {
            open_hatch: default_verdict(),
            construction: default_verdict(),
        }
    }
}

impl InferenceResult {
    pub fn new(open_hatch: impl Into<String>, construction: impl Into<String>) -> Self {
        Self {
            open_hatch: open_hatch.into(),
            construction: construction.into(),
        }
    }

    pub fn with_policy(self, policy: VerdictPolicy) -> Self {
        Self {
            open_hatch: policy.apply(self.open_hatch),
            construction: policy.apply(self.construction),
        }
    }
}

impl OutputSchema for InferenceResult {
    fn json_schema() -> Value {
        json!({
            "title": "RoofInspection",
            "type": "object",
            "properties": {
                "open_hatch": {
                    "title": "Open Hatch",
                    "description": "Indicates if the small roof window on top of building is open.",
                    "default": NO,
                    "type": "string"
                },
                "construction": {
                    "title": "Construction",
                    "description": "Indicates if construction or construction materials is present.",
                    "default": NO,
                    "type": "string"
                }
            }
        })
    }
}

/// Whether a judged value should be highlighted. Only an exact `"Yes"` is.
pub fn is_alert(value: &str) -> bool {
    value == YES
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::EnumString, strum_macros::Display,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum VerdictPolicy {
    /// Record whatever the model answered.
    #[default]
    AsIs,
    /// Case-insensitive yes/no, anything unrecognized becomes `"No"`.
    Normalize,
}

impl VerdictPolicy {
    pub fn apply(self, value: String) -> String {
        match self {
            Self::AsIs => value,
            Self::Normalize => {
                if value.trim().eq_ignore_ascii_case(YES) {
                    YES.to_string()
                } else {
                    NO.to_string()
                }
            }
        }
    }
}
