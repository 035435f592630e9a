use super::{LLMInferenceParams, LLMMessage, LLMModel, LLMUserMessage};
use futures::StreamExt;
use reqwest::{
    self,
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Url,
};
use reqwest_eventsource::{retry, Event, EventSource};
use serde::{Deserialize, Serialize};
use serde_json::{json, Deserializer, Value};
use std::str::FromStr;

pub struct OpenAI {
    base_url: String,
    model: String,
    headers: HeaderMap,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponseChoiceDelta {
    role: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponseChoice {
    index: Option<usize>,
    delta: Option<OpenAIResponseChoiceDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponseChunk {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<OpenAIResponseChoice>,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// Accumulates streamed completion chunks into the final reply.
#[derive(Debug, Default)]
struct ReplyCollector {
    // a buffer to contain possible incomplete message
    buffer: String,
    reply: String,
    finish_reason: Option<String>,
}

impl ReplyCollector {
    fn push(&mut self, data: &str) {
        // sometimes message.data is not a complete JSON value, especially when using AzureOpenAI API
        // so here use a buffer to contain them and try to extract json from buffer
        self.buffer.push_str(data);

        let mut deserialize_error = None;
        let byte_offset;
        {
            let mut stream_deserializer =
                Deserializer::from_str(&self.buffer).into_iter::<OpenAIResponseChunk>();

            while let Some(result) = stream_deserializer.next() {
                match result {
                    Ok(chunk) => {
                        for choice in chunk.choices {
                            if let Some(OpenAIResponseChoiceDelta {
                                content: Some(content),
                                ..
                            }) = choice.delta
                            {
                                self.reply.push_str(&content);
                            }
                            if choice.finish_reason.is_some() {
                                self.finish_reason = choice.finish_reason;
                            }
                        }
                    }
                    Err(e) => {
                        deserialize_error = Some(e);
                        break;
                    }
                }
            }

            byte_offset = stream_deserializer.byte_offset();
        }

        self.buffer.drain(..byte_offset);

        if let Some(err) = deserialize_error {
            if !err.is_eof() {
                tracing::error!("failed to parse response chunk: {}", &self.buffer);
                self.buffer.clear();
            }
        }
    }

    fn finish(self) -> String {
        if let Some(finish_reason) = &self.finish_reason {
            tracing::debug!("LLM finish reason: {:?}", finish_reason);
        }
        if !self.buffer.trim().is_empty() {
            tracing::warn!("dropping incomplete response chunk: {}", self.buffer);
        }
        self.reply
    }
}

fn message_to_value(message: &LLMMessage) -> Value {
    match message {
        LLMMessage::System(v) => json!({ "role": "system", "content": v }),
        LLMMessage::Assistant(v) => json!({ "role": "assistant", "content": v }),
        LLMMessage::User(parts) => match parts.as_slice() {
            [LLMUserMessage::Text(text)] => json!({ "role": "user", "content": text }),
            _ => {
                let content = parts
                    .iter()
                    .map(|part| match part {
                        LLMUserMessage::ImageUrl(url) => {
                            json!({ "type": "image_url", "image_url": { "url": url } })
                        }
                        LLMUserMessage::Text(text) => json!({ "type": "text", "text": text }),
                    })
                    .collect::<Vec<_>>();
                json!({ "role": "user", "content": content })
            }
        },
    }
}

impl LLMModel for OpenAI {
    #[tracing::instrument(name = "OpenAI::get_completion", err(Debug), skip_all, fields(model = %self.model))]
    async fn get_completion(
        &self,
        history: &[LLMMessage],
        params: LLMInferenceParams,
    ) -> anyhow::Result<String> {
        let url = Url::parse(&self.base_url)?;
        let query = url.query().map(|v| v.to_string());
        let mut url = url.join("chat/completions")?;
        url.set_query(query.as_deref());

        tracing::debug!("openai url: {:?}", url);

        let body = OpenAIRequest {
            model: &self.model,
            messages: history.iter().map(message_to_value).collect(),
            stream: true,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            seed: params.seed,
        };
        let request = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .body(serde_json::to_string(&body)?);

        let mut es = EventSource::new(request)?;
        // one round trip only, a failed request is reported instead of reconnected
        es.set_retry_policy(Box::new(retry::Never));

        let mut collector = ReplyCollector::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    tracing::debug!("stream opened");
                }
                Ok(Event::Message(message)) => {
                    if message.data.trim() == "[DONE]" {
                        break;
                    }
                    collector.push(&message.data);
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    tracing::debug!("stream ended");
                    break;
                }
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    es.close();
                    let text = response.text().await.unwrap_or_default();
                    anyhow::bail!("completion request failed with status {}: {}", status, text);
                }
                Err(e) => {
                    es.close();
                    anyhow::bail!("failed to handle event source: {}", e);
                }
            }
        }
        es.close();

        Ok(collector.finish())
    }
}

impl OpenAI {
    /// Create a new OpenAI compatible chat completion client.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> anyhow::Result<Self> {
        // the path must end with '/' so "chat/completions" joins below it,
        // a query string stays where it is
        let mut base_url = Url::from_str(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", api_key).parse()?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            headers,
            client: reqwest::Client::new(),
        })
    }

    pub fn new_azure(
        azure_endpoint: &str,
        api_key: &str,
        deployment_name: &str,
        api_version: &str,
    ) -> anyhow::Result<Self> {
        let base_url = Url::from_str(azure_endpoint)?;
        let mut base_url = base_url.join(&format!("openai/deployments/{}/", deployment_name))?;
        base_url.set_query(Some(&format!("api-version={}", api_version)));

        let mut headers = HeaderMap::new();
        headers.insert("api-key", api_key.parse()?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: base_url.to_string(),
            model: deployment_name.to_string(),
            headers,
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::StatusCode,
        response::{
            sse::{Event as SseEvent, Sse},
            IntoResponse,
        },
        routing::post,
        Json, Router,
    };
    use std::{
        convert::Infallible,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    #[derive(Clone, Default)]
    struct MockState {
        calls: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock server");
        });
        format!("http://{}/v1", addr)
    }

    async fn streaming_completion(
        State(state): State<MockState>,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        state.calls.fetch_add(1, Ordering::SeqCst);
        *state.last_body.lock().unwrap() = Some(body);

        let chunks = vec![
            json!({"id": "1", "choices": [{"index": 0, "delta": {"role": "assistant", "content": "{\"open_hatch\": "}}]}),
            json!({"id": "1", "choices": [{"index": 0, "delta": {"content": "\"Yes\", \"construction\": \"No\"}"}}]}),
            json!({"id": "1", "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}),
        ];
        let stream = async_stream::stream! {
            for chunk in chunks {
                yield Ok::<_, Infallible>(SseEvent::default().data(chunk.to_string()));
            }
            yield Ok(SseEvent::default().data("[DONE]"));
        };
        Sse::new(stream)
    }

    async fn unauthorized(State(state): State<MockState>) -> impl IntoResponse {
        state.calls.fetch_add(1, Ordering::SeqCst);
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Incorrect API key provided"}})),
        )
    }

    #[test_log::test(tokio::test)]
    async fn collects_streamed_reply_and_sends_image_part() {
        let state = MockState::default();
        let router = Router::new()
            .route("/v1/chat/completions", post(streaming_completion))
            .with_state(state.clone());
        let base_url = serve(router).await;

        let client = OpenAI::new(&base_url, "test-key", "vision-test").unwrap();
        let history = vec![LLMMessage::User(vec![
            LLMUserMessage::Text("look at the roof".into()),
            LLMUserMessage::ImageUrl("data:image/png;base64,AAAA".into()),
        ])];

        let reply = client
            .get_completion(&history, LLMInferenceParams::default().with_max_tokens(64))
            .await
            .unwrap();

        assert_eq!(reply, r#"{"open_hatch": "Yes", "construction": "No"}"#);
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);

        let body = state.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "vision-test");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["stream"], true);
        assert!(body.get("temperature").is_none());
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test_log::test(tokio::test)]
    async fn failed_status_is_an_error_without_retry() {
        let state = MockState::default();
        let router = Router::new()
            .route("/v1/chat/completions", post(unauthorized))
            .with_state(state.clone());
        let base_url = serve(router).await;

        let client = OpenAI::new(&base_url, "bad-key", "vision-test").unwrap();
        let result = client
            .get_completion(
                &[LLMMessage::user_text("hello")],
                LLMInferenceParams::default(),
            )
            .await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("401"), "unexpected error: {}", err);
        assert!(err.contains("Incorrect API key"), "unexpected error: {}", err);
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn collector_joins_split_chunks() {
        let mut collector = ReplyCollector::default();
        collector.push(r#"{"choices": [{"delta": {"content": "ab"#);
        collector.push(r#"c"}}]}"#);
        collector.push(r#"{"choices": [{"delta": {"content": "d"}, "finish_reason": "stop"}]}"#);
        assert_eq!(collector.finish(), "abcd");
    }

    #[test]
    fn trailing_slash_goes_before_query() {
        let client = OpenAI::new("https://example.com/v1?x=1", "key", "m").unwrap();
        assert_eq!(client.base_url, "https://example.com/v1/?x=1");

        let client = OpenAI::new("https://example.com/v1/", "key", "m").unwrap();
        assert_eq!(client.base_url, "https://example.com/v1/");

        assert!(OpenAI::new("not a url", "key", "m").is_err());
    }

    #[test_log::test(tokio::test)]
    async fn base_url_with_query_reaches_completions_path() {
        let state = MockState::default();
        let router = Router::new()
            .route("/v1/chat/completions", post(streaming_completion))
            .with_state(state.clone());
        let base_url = format!("{}?tenant=roof", serve(router).await);

        let client = OpenAI::new(&base_url, "test-key", "vision-test").unwrap();
        let reply = client
            .get_completion(
                &[LLMMessage::User(vec![LLMUserMessage::Text("hi".into())])],
                LLMInferenceParams::default(),
            )
            .await
            .unwrap();

        assert!(reply.contains("open_hatch"));
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn azure_url_carries_deployment_and_version() {
        let client = OpenAI::new_azure(
            "https://example.openai.azure.com/",
            "key",
            "gpt-4v",
            "2024-02-01",
        )
        .unwrap();
        assert_eq!(
            client.base_url,
            "https://example.openai.azure.com/openai/deployments/gpt-4v/?api-version=2024-02-01"
        );
        assert_eq!(client.model(), "gpt-4v");
    }
}
