use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

use super::{ChatMessage, FragmentStream, Provider};

/// Client for any OpenAI-compatible chat-completions endpoint
#[derive(Debug)]
pub struct OpenAI {
    /// Base URL of the API, e.g. `https://api.openai.com/v1`
    base_url: String,
    /// Bearer token; may be empty for local servers
    api_key: String,
    /// Model name to request
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// HTTP client for making requests
    client: Client,
    /// Maximum number of attempts to open the stream
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Sampling temperature
    temperature: f32,
    /// Whether to stream the response
    stream: bool,
}

/// One server-sent chunk of a streaming chat completion
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    /// Incremental choices; only the first is used
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    /// Incremental message delta
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    /// New content fragment, absent on role/stop chunks
    #[serde(default)]
    content: Option<String>,
}

/// Model listing response, used for connection testing
#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

impl OpenAI {
    /// Create a new client
    pub fn new(base_url: &str, api_key: &str, model: &str, temperature: f32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            client,
            max_retries: 3,
            backoff_base_ms: 500,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    /// Open the streaming response, retrying connection failures with backoff
    async fn open_stream(&self, request: &ChatCompletionRequest) -> Result<reqwest::Response, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .authorized(self.client.post(self.endpoint("chat/completions")))
                .json(request)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let message = response.text().await.unwrap_or_default();
                    if status == 401 || status == 403 {
                        return Err(ProviderError::AuthenticationError(message));
                    }
                    // Retry server-side errors, give up on client errors
                    if status < 500 || attempt > self.max_retries {
                        return Err(ProviderError::ApiError { status_code: status, message });
                    }
                    warn!("API returned {} on attempt {}, retrying", status, attempt);
                }
                Err(e) => {
                    if attempt > self.max_retries {
                        return Err(ProviderError::ConnectionError(e.to_string()));
                    }
                    warn!("Connection attempt {} failed: {}", attempt, e);
                }
            }

            let backoff = self.backoff_base_ms * 2u64.pow(attempt - 1);
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }
    }
}

#[async_trait::async_trait]
impl Provider for OpenAI {
    async fn chat_stream(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, ProviderError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            stream: true,
        };

        debug!("Opening stream against {} ({})", self.base_url, self.model);
        let response = self.open_stream(&request).await?;
        Ok(sse_fragments(Box::pin(response.bytes_stream())))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self
            .authorized(self.client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::ApiError {
                status_code: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        debug!("Endpoint lists {} models", models.data.len());
        Ok(())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

type ByteStream = std::pin::Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct SseState {
    inner: ByteStream,
    buffer: String,
    done: bool,
}

/// Decode an SSE byte stream into content fragments.
///
/// Lines starting with `data:` carry JSON chunks; `data: [DONE]` ends the
/// stream. Undecodable chunks surface as a single ParseError fragment.
fn sse_fragments(inner: ByteStream) -> FragmentStream {
    let state = SseState { inner, buffer: String::new(), done: false };

    Box::pin(futures_util::stream::unfold(state, |mut st| async move {
        loop {
            // Drain complete lines already buffered
            while let Some(line_end) = st.buffer.find('\n') {
                let line: String = st.buffer.drain(..=line_end).collect();
                let line = line.trim();
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    st.done = true;
                    return None;
                }
                match serde_json::from_str::<ChatCompletionChunk>(data) {
                    Ok(chunk) => {
                        let content = chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|c| c.delta.content)
                            .unwrap_or_default();
                        if !content.is_empty() {
                            return Some((Ok(content), st));
                        }
                    }
                    Err(e) => {
                        error!("Undecodable stream chunk: {}", e);
                        st.done = true;
                        return Some((Err(ProviderError::ParseError(e.to_string())), st));
                    }
                }
            }

            if st.done {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(bytes)) => {
                    st.buffer.push_str(&String::from_utf8_lossy(&bytes));
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(ProviderError::ConnectionError(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    // Whatever is left without a newline cannot be a data line
                    return None;
                }
            }
        }
    }))
}
