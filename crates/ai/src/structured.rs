use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// A type the model is asked to answer with.
pub trait OutputSchema: DeserializeOwned {
    /// JSON schema shown to the model in the prompt.
    fn json_schema() -> Value;
}

/// Turns free-form completion text into `T`.
///
/// The prompt is extended with the schema of `T`, and the reply is parsed by
/// taking the outermost `{...}` block, so code fences or a sentence around the
/// JSON are tolerated.
pub struct JsonOutputParser<T> {
    _output: PhantomData<fn() -> T>,
}

impl<T> Default for JsonOutputParser<T> {
    fn default() -> Self {
        Self {
            _output: PhantomData,
        }
    }
}

impl<T: OutputSchema> JsonOutputParser<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_instructions(&self) -> String {
        format!(
            "Here's a JSON schema to follow:\n{}\n\nOutput a valid JSON object but do not repeat the schema.",
            T::json_schema()
        )
    }

    pub fn format(&self, prompt: &str) -> String {
        format!("{}\n{}", prompt.trim_end(), self.format_instructions())
    }

    pub fn parse(&self, output: &str) -> anyhow::Result<T> {
        let json_str = extract_json_object(output)
            .ok_or_else(|| anyhow!("no JSON object found in model output: {:?}", output))?;

        serde_json::from_str(json_str)
            .with_context(|| format!("model output does not match the schema: {}", json_str))
    }
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
