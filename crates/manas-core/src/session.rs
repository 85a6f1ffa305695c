//! Retrieval-augmented chat: retrieve context, render the persona prompt,
//! ask the model.

use std::sync::Arc;

use manas_gateway::{ChatHandler, HandlerError, HandlerFuture};
use manas_index::{IndexError, Retriever};
use manas_llm::{LlmError, LlmProvider, Message};

use crate::persona::{Persona, format_context};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Prompt is missing")]
    EmptyPrompt,
    #[error(transparent)]
    Retrieval(#[from] IndexError),
    #[error(transparent)]
    Provider(#[from] LlmError),
}

/// Index, persona, and generation provider bundled for answering prompts.
///
/// Holding a `ChatSession` means the index is already loaded; it is read-only
/// and can be shared across requests behind an `Arc`.
pub struct ChatSession<P> {
    retriever: Retriever<P>,
    provider: Arc<P>,
    persona: Persona,
}

impl<P: LlmProvider> ChatSession<P> {
    #[must_use]
    pub fn new(retriever: Retriever<P>, provider: Arc<P>, persona: Persona) -> Self {
        Self {
            retriever,
            provider,
            persona,
        }
    }

    #[must_use]
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    #[must_use]
    pub fn retriever(&self) -> &Retriever<P> {
        &self.retriever
    }

    /// Messages sent to the model for `prompt` given the retrieved `context`.
    #[must_use]
    pub fn build_messages(&self, context: &str, prompt: &str) -> [Message; 2] {
        [
            Message::system(self.persona.build_system_prompt()),
            Message::user(self.persona.build_query_prompt(context, prompt)),
        ]
    }

    /// Answer one prompt. No history is kept between calls.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyPrompt`] for an empty prompt, otherwise any
    /// retrieval or generation failure.
    pub async fn answer(&self, prompt: &str) -> Result<String, ChatError> {
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        let passages = self.retriever.search(prompt).await?;
        tracing::debug!(passages = passages.len(), "context retrieved");
        let context = format_context(&passages);

        let messages = self.build_messages(&context, prompt);
        let reply = self.provider.chat(&messages).await?;
        tracing::info!(
            persona = %self.persona.kind(),
            passages = passages.len(),
            reply_len = reply.len(),
            "prompt answered"
        );
        Ok(reply)
    }
}

impl<P: LlmProvider + 'static> ChatHandler for ChatSession<P> {
    fn answer(&self, prompt: String) -> HandlerFuture<'_> {
        Box::pin(async move {
            ChatSession::answer(self, &prompt)
                .await
                .map_err(|e| match e {
                    ChatError::EmptyPrompt => HandlerError::InvalidInput(e.to_string()),
                    other => HandlerError::Internal(other.to_string()),
                })
        })
    }
}
