use crate::{InferenceResult, InspectionError, InspectionResult};
use ai::{
    llm::{LLMInferenceParams, LLMMessage, LLMModel, LLMUserMessage},
    ImageInput, JsonOutputParser,
};
use async_trait::async_trait;

pub const ROOF_PROMPT: &str = "Summarize what is in the image. ONLY look at the roof of the building. \
Hatches are small windows on top of a building that can be opened or closed. \
Return the answer in JSON format.";

/// Judges one image.
#[async_trait]
pub trait RoofInspector: Send + Sync {
    async fn inspect(&self, image: &ImageInput) -> InspectionResult<InferenceResult>;
}

/// Asks a hosted multimodal model and parses its reply into [`InferenceResult`].
pub struct VisionInspector<M> {
    model: M,
    params: LLMInferenceParams,
    parser: JsonOutputParser<InferenceResult>,
}

impl<M: LLMModel> VisionInspector<M> {
    pub fn new(model: M, params: LLMInferenceParams) -> Self {
        Self {
            model,
            params,
            parser: JsonOutputParser::new(),
        }
    }

    fn history(&self, image: &ImageInput) -> Vec<LLMMessage> {
        vec![LLMMessage::User(vec![
            LLMUserMessage::Text(self.parser.format(ROOF_PROMPT)),
            LLMUserMessage::ImageUrl(image.to_data_url()),
        ])]
    }
}

#[async_trait]
impl<M> RoofInspector for VisionInspector<M>
where
    M: LLMModel + Send + Sync,
{
    #[tracing::instrument(name = "VisionInspector::inspect", skip_all, fields(image = %image.path().display()))]
    async fn inspect(&self, image: &ImageInput) -> InspectionResult<InferenceResult> {
        let file = image
            .path()
            .file_name()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();

        let reply = self
            .model
            .get_completion(&self.history(image), self.params.clone())
            .await
            .map_err(|reason| InspectionError::Inference {
                file: file.clone(),
                reason,
            })?;

        tracing::debug!("model reply: {}", reply);

        self.parser
            .parse(&reply)
            .map_err(|reason| InspectionError::SchemaCoercion { file, reason })
    }
}
