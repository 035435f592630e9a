pub mod openai;

#[derive(Debug, Clone)]
pub enum LLMUserMessage {
    Text(String),
    /// Either a remote url or a `data:` url with base64 content.
    ImageUrl(String),
}

#[derive(Debug, Clone)]
pub enum LLMMessage {
    System(String),
    User(Vec<LLMUserMessage>),
    Assistant(String),
}

impl LLMMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::User(vec![LLMUserMessage::Text(text.into())])
    }
}

#[derive(Debug, Clone)]
pub struct LLMInferenceParams {
    pub temperature: Option<f64>,
    pub seed: Option<u64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<usize>,
}

impl Default for LLMInferenceParams {
    fn default() -> Self {
        Self {
            temperature: None,
            seed: None,
            top_p: None,
            max_tokens: Some(1024),
        }
    }
}

impl LLMInferenceParams {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

pub trait LLMModel {
    /// Run one chat completion and return the full reply text.
    fn get_completion(
        &self,
        history: &[LLMMessage],
        params: LLMInferenceParams,
    ) -> impl std::future::Future<Output = anyhow::Result<String>> + Send;
}
