//! Configuration, persona prompts, and the retrieval-augmented chat session.

pub mod bootstrap;
pub mod config;
pub mod persona;
pub mod session;

pub use config::Config;
pub use persona::{Persona, PersonaError, PersonaKind};
pub use session::{ChatError, ChatSession};
