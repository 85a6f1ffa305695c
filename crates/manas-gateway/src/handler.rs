use std::pin::Pin;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Internal(String),
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'a>>;

/// Answers one chat prompt. The gateway only validates and routes; the
/// implementor owns retrieval and generation.
pub trait ChatHandler: Send + Sync + 'static {
    fn answer(&self, prompt: String) -> HandlerFuture<'_>;
}
