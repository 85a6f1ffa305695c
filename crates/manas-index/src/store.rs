//! Persisted document index: build, load, incremental sync.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use manas_llm::LlmProvider;

use crate::docstore::{DocStore, DocumentRecord};
use crate::document::{Document, PassageSplitter, SplitterConfig};
use crate::error::{IndexError, Result};
use crate::vector_store::{ScoredPassage, StoredPassage, VectorStore};

pub const FORMAT_VERSION: u32 = 1;

const DOCSTORE_FILE: &str = "docstore.json";
const VECTOR_STORE_FILE: &str = "vector_store.json";
const INDEX_STORE_FILE: &str = "index_store.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexMeta {
    format_version: u32,
    embedding_model: String,
    dimension: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub splitter: SplitterConfig,
    /// Re-embed already indexed files whose content hash changed.
    pub detect_changes: bool,
    /// Rebuild from source documents instead of failing on an unreadable store.
    pub rebuild_on_corrupt: bool,
}

/// Summary of a sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub passages_embedded: usize,
    pub persisted: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.inserted + self.updated > 0
    }
}

struct StagedDocument {
    record: DocumentRecord,
    passages: Vec<(String, StoredPassage)>,
}

/// Document index persisted under a storage directory.
///
/// Identity of a document is its `file_path`. Files seen once stay indexed
/// even after they disappear from the source directory.
#[derive(Debug)]
pub struct IndexStore {
    persist_dir: PathBuf,
    embedding_model: String,
    options: IndexOptions,
    splitter: PassageSplitter,
    docstore: DocStore,
    vectors: VectorStore,
}

impl IndexStore {
    fn empty(persist_dir: &Path, embedding_model: &str, options: IndexOptions) -> Self {
        Self {
            persist_dir: persist_dir.to_path_buf(),
            embedding_model: embedding_model.to_owned(),
            splitter: PassageSplitter::new(options.splitter),
            options,
            docstore: DocStore::default(),
            vectors: VectorStore::new(),
        }
    }

    /// Load the index from `persist_dir` if it exists, otherwise build it from
    /// `documents` and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted index is unusable (and
    /// `rebuild_on_corrupt` is off), if embedding fails while building, or if
    /// the new index cannot be written.
    pub async fn load_or_create<P: LlmProvider>(
        persist_dir: &Path,
        documents: &[Document],
        provider: &P,
        options: IndexOptions,
    ) -> Result<Self> {
        let exists = tokio::fs::try_exists(persist_dir)
            .await
            .map_err(|source| IndexError::Read {
                path: persist_dir.to_path_buf(),
                source,
            })?;
        if exists {
            match Self::load(persist_dir, provider.embedding_model(), options.clone()).await {
                Ok(store) => {
                    tracing::info!(
                        dir = %persist_dir.display(),
                        documents = store.document_count(),
                        passages = store.passage_count(),
                        "index loaded"
                    );
                    return Ok(store);
                }
                Err(e) if e.is_corrupt_store() && options.rebuild_on_corrupt => {
                    tracing::warn!(dir = %persist_dir.display(), "rebuilding unusable index: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let mut store = Self::empty(persist_dir, provider.embedding_model(), options);
        let report = store.sync(documents, provider).await?;
        if !report.persisted {
            store.persist().await?;
        }
        tracing::info!(
            dir = %persist_dir.display(),
            documents = store.document_count(),
            passages = store.passage_count(),
            "index created"
        );
        Ok(store)
    }

    /// Read a persisted index.
    ///
    /// # Errors
    ///
    /// Returns an error if any index file is missing, unreadable, or corrupt,
    /// or if it was built with a different embedding model.
    pub async fn load(
        persist_dir: &Path,
        embedding_model: &str,
        options: IndexOptions,
    ) -> Result<Self> {
        let meta: IndexMeta = read_json(&persist_dir.join(INDEX_STORE_FILE)).await?;
        if meta.format_version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion {
                found: meta.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if meta.embedding_model != embedding_model {
            return Err(IndexError::ModelMismatch {
                stored: meta.embedding_model,
                configured: embedding_model.to_owned(),
            });
        }

        let docstore: DocStore = read_json(&persist_dir.join(DOCSTORE_FILE)).await?;
        let vectors: VectorStore = read_json(&persist_dir.join(VECTOR_STORE_FILE)).await?;

        let mut store = Self::empty(persist_dir, embedding_model, options);
        store.docstore = docstore;
        store.vectors = vectors;
        Ok(store)
    }

    /// Index every document whose path is not yet present (or, with
    /// `detect_changes`, whose content changed). Persists only when something
    /// was inserted.
    ///
    /// All-or-nothing: if any embedding fails, neither memory nor storage
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails, if the provider's embedding model
    /// differs from the index's, or if persisting fails.
    pub async fn sync<P: LlmProvider>(
        &mut self,
        documents: &[Document],
        provider: &P,
    ) -> Result<SyncReport> {
        let start = std::time::Instant::now();
        if provider.embedding_model() != self.embedding_model {
            return Err(IndexError::ModelMismatch {
                stored: self.embedding_model.clone(),
                configured: provider.embedding_model().to_owned(),
            });
        }

        let mut report = SyncReport::default();
        let mut seen = HashSet::new();
        let mut staged = Vec::new();
        let mut dimension = self.vectors.dimension();

        for doc in documents {
            let path = doc.file_path();
            if !seen.insert(path) {
                continue;
            }
            let hash = doc.content_hash();
            match self.docstore.get(path) {
                Some(record) if !self.options.detect_changes || record.content_hash == hash => {
                    report.unchanged += 1;
                    continue;
                }
                Some(_) => report.updated += 1,
                None => report.inserted += 1,
            }

            let entry = self.embed_document(doc, hash, provider, &mut dimension).await?;
            report.passages_embedded += entry.passages.len();
            tracing::debug!(
                file = %path,
                passages = entry.passages.len(),
                "document embedded"
            );
            staged.push(entry);
        }

        if staged.is_empty() {
            tracing::debug!(unchanged = report.unchanged, "index up to date");
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        let mut docstore = self.docstore.clone();
        let mut vectors = self.vectors.clone();
        for entry in staged {
            for (id, passage) in entry.passages {
                vectors.upsert(id, passage)?;
            }
            if let Some(old) = docstore.insert(entry.record) {
                let current: HashSet<&str> = docstore
                    .get(&old.file_path)
                    .map(|r| r.passage_ids.iter().map(String::as_str).collect())
                    .unwrap_or_default();
                let stale: Vec<String> = old
                    .passage_ids
                    .into_iter()
                    .filter(|id| !current.contains(id.as_str()))
                    .collect();
                vectors.remove(&stale);
            }
        }

        self.write_all(&docstore, &vectors).await?;
        self.docstore = docstore;
        self.vectors = vectors;

        report.persisted = true;
        report.duration_ms = elapsed_ms(start);
        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            passages = report.passages_embedded,
            duration_ms = report.duration_ms,
            "index synced"
        );
        Ok(report)
    }

    async fn embed_document<P: LlmProvider>(
        &self,
        doc: &Document,
        content_hash: String,
        provider: &P,
        dimension: &mut Option<usize>,
    ) -> Result<StagedDocument> {
        let path = doc.file_path();
        let mut passages = Vec::new();

        for passage in self.splitter.split(&doc.content) {
            let embedding = provider
                .embed(&passage.text)
                .await
                .map_err(|source| IndexError::Embedding {
                    file_path: path.to_owned(),
                    source,
                })?;
            match *dimension {
                Some(expected) if expected != embedding.len() => {
                    return Err(IndexError::DimensionMismatch {
                        expected,
                        actual: embedding.len(),
                    });
                }
                Some(_) => {}
                None => *dimension = Some(embedding.len()),
            }
            let id = passage_id(path, &content_hash, passage.chunk_index);
            passages.push((
                id,
                StoredPassage {
                    file_path: path.to_owned(),
                    chunk_index: passage.chunk_index,
                    text: passage.text,
                    embedding,
                },
            ));
        }

        Ok(StagedDocument {
            record: DocumentRecord {
                file_path: path.to_owned(),
                file_name: doc.metadata.file_name.clone(),
                content_type: doc.metadata.content_type.clone(),
                content_hash,
                passage_ids: passages.iter().map(|(id, _)| id.clone()).collect(),
            },
            passages,
        })
    }

    /// Write the current index to its storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or any index file cannot be written.
    pub async fn persist(&self) -> Result<()> {
        self.write_all(&self.docstore, &self.vectors).await
    }

    async fn write_all(&self, docstore: &DocStore, vectors: &VectorStore) -> Result<()> {
        tokio::fs::create_dir_all(&self.persist_dir)
            .await
            .map_err(|source| IndexError::Write {
                path: self.persist_dir.clone(),
                source,
            })?;

        let meta = IndexMeta {
            format_version: FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimension: vectors.dimension(),
        };
        // docstore goes last: a path it lists always has its passages on disk
        let files = [
            (VECTOR_STORE_FILE, to_json(vectors)?),
            (INDEX_STORE_FILE, to_json(&meta)?),
            (DOCSTORE_FILE, to_json(docstore)?),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, bytes) in &files {
            let path = self.persist_dir.join(name);
            match write_tmp(&path, bytes).await {
                Ok(tmp) => written.push((tmp, path)),
                Err(e) => {
                    for (tmp, _) in &written {
                        let _ = tokio::fs::remove_file(tmp).await;
                    }
                    return Err(e);
                }
            }
        }
        for (tmp, path) in written {
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|source| IndexError::Write { path, source })?;
        }
        tracing::debug!(dir = %self.persist_dir.display(), "index persisted");
        Ok(())
    }

    /// Cosine search over all stored passages.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `query` has the wrong size.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredPassage>> {
        self.vectors.search(query, limit)
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.docstore.len()
    }

    #[must_use]
    pub fn passage_count(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Indexed file paths in sorted order.
    pub fn indexed_files(&self) -> impl Iterator<Item = &str> {
        self.docstore.file_paths()
    }

    #[must_use]
    pub fn contains(&self, file_path: &str) -> bool {
        self.docstore.contains(file_path)
    }

    #[must_use]
    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.dimension()
    }
}

fn passage_id(file_path: &str, content_hash: &str, chunk_index: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(file_path.as_bytes());
    hasher.update(&[0]);
    hasher.update(content_hash.as_bytes());
    hasher.update(&chunk_index.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IndexError::MissingFile(path.to_path_buf()));
        }
        Err(source) => {
            return Err(IndexError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| IndexError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(IndexError::Serialize)
}

/// Write `bytes` to the temporary sibling of `path` and return its location.
async fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|source| IndexError::Write {
            path: tmp.clone(),
            source,
        })?;
    Ok(tmp)
}
