//! Chat and embedding provider abstraction with an Ollama backend.

pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod provider;

pub use error::LlmError;
pub use provider::{LlmProvider, Message, Role};
