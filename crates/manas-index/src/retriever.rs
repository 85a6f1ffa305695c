use std::sync::Arc;

use manas_llm::LlmProvider;

use crate::error::{IndexError, Result};
use crate::store::IndexStore;

pub const DEFAULT_TOP_K: usize = 5;

/// A passage returned for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub text: String,
    pub score: f32,
    pub file_path: String,
}

/// Top-k similarity search over an [`IndexStore`].
pub struct Retriever<P> {
    index: Arc<IndexStore>,
    provider: Arc<P>,
    top_k: usize,
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(index: Arc<IndexStore>, provider: Arc<P>) -> Self {
        Self {
            index,
            provider,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[must_use]
    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    /// Retrieve the configured number of passages.
    ///
    /// # Errors
    ///
    /// See [`Retriever::retrieve`].
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedPassage>> {
        self.retrieve(query, self.top_k).await
    }

    /// At most `k` passages, most similar first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be embedded or its vector does not
    /// match the index dimension.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self
            .provider
            .embed(query)
            .await
            .map_err(IndexError::QueryEmbedding)?;
        let hits = self.index.search(&vector, k)?;

        tracing::debug!(k, hits = hits.len(), "passages retrieved");
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedPassage {
                text: hit.text,
                score: hit.score,
                file_path: hit.file_path,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use manas_llm::mock::MockProvider;

    use super::*;
    use crate::document::{Document, DocumentMetadata};
    use crate::store::IndexOptions;

    fn doc(path: &str, content: &str) -> Document {
        Document {
            content: content.into(),
            metadata: DocumentMetadata {
                file_path: path.into(),
                file_name: path.rsplit('/').next().unwrap_or(path).into(),
                content_type: "text/plain".into(),
            },
        }
    }

    async fn retriever_over(docs: &[Document]) -> (tempfile::TempDir, Retriever<MockProvider>) {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::default();
        let store = IndexStore::load_or_create(
            &dir.path().join("storage"),
            docs,
            &provider,
            IndexOptions::default(),
        )
        .await
        .unwrap();
        (dir, Retriever::new(Arc::new(store), Arc::new(provider)))
    }

    fn scriptures() -> Vec<Document> {
        vec![
            doc("/data/atma.txt", "The jivatma is an eternal spark of Krishna."),
            doc("/data/yoga.txt", "Bhakti yoga is the path of loving devotion."),
            doc("/data/river.txt", "The Ganges flows from the Himalaya."),
        ]
    }

    #[tokio::test]
    async fn most_similar_passage_first() {
        let (_dir, retriever) = retriever_over(&scriptures()).await;
        let hits = retriever.retrieve("jivatma and Krishna", 3).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].file_path, "/data/atma.txt");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn result_length_bounded_by_k() {
        let (_dir, retriever) = retriever_over(&scriptures()).await;
        assert_eq!(retriever.retrieve("devotion", 2).await.unwrap().len(), 2);
        assert_eq!(retriever.retrieve("devotion", 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn zero_k_skips_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        let store = IndexStore::load_or_create(
            &dir.path().join("storage"),
            &scriptures(),
            provider.as_ref(),
            IndexOptions::default(),
        )
        .await
        .unwrap();
        let retriever = Retriever::new(Arc::new(store), Arc::clone(&provider));
        let calls = provider.embed_calls();

        assert!(retriever.retrieve("anything", 0).await.unwrap().is_empty());
        assert_eq!(provider.embed_calls(), calls);
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let (_dir, retriever) = retriever_over(&[]).await;
        assert!(retriever.search("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_embedding_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::load_or_create(
            &dir.path().join("storage"),
            &scriptures(),
            &MockProvider::default(),
            IndexOptions::default(),
        )
        .await
        .unwrap();
        let failing = Arc::new(MockProvider::default().with_failing_embeddings());
        let retriever = Retriever::new(Arc::new(store), failing);

        let err = retriever.search("query").await.unwrap_err();
        assert!(matches!(err, IndexError::QueryEmbedding(_)));
    }

    #[tokio::test]
    async fn default_top_k_is_five() {
        let docs: Vec<_> = (0..8)
            .map(|i| doc(&format!("/data/{i}.txt"), &format!("verse number {i}")))
            .collect();
        let (_dir, retriever) = retriever_over(&docs).await;

        assert_eq!(retriever.top_k(), DEFAULT_TOP_K);
        assert_eq!(retriever.search("verse").await.unwrap().len(), 5);
        let narrowed = retriever.with_top_k(2);
        assert_eq!(narrowed.search("verse").await.unwrap().len(), 2);
    }
}
