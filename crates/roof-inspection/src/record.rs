use crate::InferenceResult;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One processed image: the model's answer plus where and when it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedImageRecord {
    pub image_file: String,
    pub timestamp: DateTime<Local>,
    pub response: InferenceResult,
}

impl AnalyzedImageRecord {
    pub fn new(image_file: impl Into<String>, response: InferenceResult) -> Self {
        Self {
            image_file: image_file.into(),
            timestamp: Local::now(),
            response,
        }
    }

    /// Keeps timestamps of a run non-decreasing even if the wall clock steps back.
    pub(crate) fn not_before(mut self, previous: Option<&AnalyzedImageRecord>) -> Self {
        if let Some(previous) = previous {
            if self.timestamp < previous.timestamp {
                self.timestamp = previous.timestamp;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn serializes_flat_record_with_nested_response() {
        let record = AnalyzedImageRecord::new("roof_01.jpg", InferenceResult::new("Yes", "No"));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["image_file"], "roof_01.jpg");
        assert_eq!(value["response"]["open_hatch"], "Yes");
        assert_eq!(value["response"]["construction"], "No");

        let timestamp = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn clamps_to_previous_timestamp() {
        let previous = AnalyzedImageRecord {
            timestamp: Local::now() + Duration::seconds(60),
            ..AnalyzedImageRecord::new("a.png", InferenceResult::default())
        };
        let record = AnalyzedImageRecord::new("b.png", InferenceResult::default())
            .not_before(Some(&previous));
        assert_eq!(record.timestamp, previous.timestamp);
    }
}
