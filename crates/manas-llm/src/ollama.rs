use std::time::Duration;

use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

const DEFAULT_PORT: u16 = 11434;
const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
    chat_timeout: Duration,
    embed_timeout: Duration,
}

impl OllamaProvider {
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidBaseUrl`] if `base_url` is not an http(s) URL
    /// with a host.
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(base_url)?,
            model,
            embedding_model,
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        })
    }

    /// Upper bound for a single chat completion. Generation on local hardware
    /// is slow, so this is typically minutes rather than seconds.
    #[must_use]
    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if Ollama is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection to Ollama fails.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        self.client.list_local_models().await.map_err(|e| {
            LlmError::Unavailable(format!("failed to connect to Ollama, is it running? {e}"))
        })?;
        Ok(())
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let ollama_messages: Vec<ChatMessage> = messages.iter().map(convert_message).collect();
        let request = ChatMessageRequest::new(self.model.clone(), ollama_messages);

        let response = with_timeout("chat", self.chat_timeout, async {
            self.client
                .send_chat_messages(request)
                .await
                .map_err(|e| LlmError::Other(format!("Ollama chat request failed: {e}")))
        })
        .await?;

        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: "ollama" });
        }
        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::from(text),
        );

        let response = with_timeout("embedding", self.embed_timeout, async {
            self.client
                .generate_embeddings(request)
                .await
                .map_err(|e| LlmError::Other(format!("Ollama embedding request failed: {e}")))
        })
        .await?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(LlmError::EmptyResponse { provider: "ollama" })
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T, LlmError>>,
) -> Result<T, LlmError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| LlmError::Timeout {
            operation,
            seconds: limit.as_secs(),
        })?
}

fn convert_message(msg: &Message) -> ChatMessage {
    let text = msg.content.clone();
    match msg.role {
        Role::System => ChatMessage::system(text),
        Role::User => ChatMessage::user(text),
        Role::Assistant => ChatMessage::assistant(text),
    }
}

fn build_client(base_url: &str) -> Result<Ollama, LlmError> {
    let invalid = |reason: String| LlmError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason,
    };
    let (host, port) = parse_host_port(base_url);
    let host = url::Url::parse(&host).map_err(|e| invalid(e.to_string()))?;
    if !matches!(host.scheme(), "http" | "https") || !host.has_host() {
        return Err(invalid("expected an http(s) URL with a host".into()));
    }
    Ok(Ollama::builder().host(host).port(port).build())
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), DEFAULT_PORT)
}
