//! Document loading, persisted embedding index, and top-k retrieval.
//!
//! Source files are read into [`document::Document`]s, split into passages,
//! embedded through a [`manas_llm::LlmProvider`], and kept in an
//! [`store::IndexStore`] that is persisted as JSON in a storage directory.
//! The [`retriever::Retriever`] answers similarity queries over that store.

pub(crate) mod docstore;
pub mod document;
pub mod error;
pub mod retriever;
pub mod store;
pub mod vector_store;

pub use error::{IndexError, Result};
pub use retriever::{RetrievedPassage, Retriever};
pub use store::{IndexOptions, IndexStore, SyncReport};
