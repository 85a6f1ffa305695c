//! Application bootstrap: config resolution, provider, index, and session
//! construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use manas_index::document::{DirectoryLoader, Document, SplitterConfig};
use manas_index::{IndexOptions, IndexStore, Retriever};
use manas_llm::LlmProvider;
use manas_llm::ollama::OllamaProvider;

use crate::config::Config;
use crate::persona::Persona;
use crate::session::ChatSession;

/// Priority: `--config` flag > `MANAS_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("MANAS_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// # Errors
///
/// Returns an error if `llm.base_url` is not a usable URL.
pub fn create_provider(config: &Config) -> anyhow::Result<OllamaProvider> {
    let provider = OllamaProvider::new(
        &config.llm.base_url,
        config.llm.model.clone(),
        config.llm.embedding_model.clone(),
    )?
    .with_chat_timeout(Duration::from_secs(config.timeouts.llm_seconds))
    .with_embed_timeout(Duration::from_secs(config.timeouts.embedding_seconds));
    Ok(provider)
}

/// Log whether Ollama answers; startup continues either way.
pub async fn health_check(provider: &OllamaProvider) {
    match provider.health_check().await {
        Ok(()) => tracing::info!("ollama health check passed"),
        Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
    }
}

/// # Errors
///
/// Returns an error if the persona name or query template is invalid.
pub fn create_persona(config: &Config) -> anyhow::Result<Persona> {
    let persona = Persona::new(config.persona_kind()?);
    match config.persona.query_template {
        Some(ref template) => persona
            .with_query_template(template.clone())
            .context("invalid persona.query_template"),
        None => Ok(persona),
    }
}

#[must_use]
pub fn index_options(config: &Config) -> IndexOptions {
    IndexOptions {
        splitter: SplitterConfig {
            chunk_size: config.index.chunk_size,
            chunk_overlap: config.index.chunk_overlap,
        },
        detect_changes: config.index.detect_changes,
        rebuild_on_corrupt: config.index.rebuild_on_corrupt,
    }
}

/// # Errors
///
/// Returns an error if the data directory is missing or cannot be listed.
pub async fn load_documents(config: &Config) -> anyhow::Result<Vec<Document>> {
    let loader = DirectoryLoader {
        max_file_size: config.index.max_file_size,
        recursive: config.index.recursive,
    };
    let documents = loader
        .load_dir(&config.index.data_dir)
        .await
        .with_context(|| {
            format!(
                "failed to load documents from {}",
                config.index.data_dir.display()
            )
        })?;
    tracing::info!(count = documents.len(), "source documents loaded");
    Ok(documents)
}

/// Whether `serve` should sync the index with the data directory.
///
/// Follows `index.sync_on_start`, except that a server with an existing index
/// and no data directory starts from the index alone.
#[must_use]
pub fn serve_sync(config: &Config) -> bool {
    if !config.index.sync_on_start {
        return false;
    }
    if !config.index.data_dir.exists() && config.index.storage_dir.exists() {
        tracing::warn!(
            data_dir = %config.index.data_dir.display(),
            "data directory missing, serving the existing index without sync"
        );
        return false;
    }
    true
}

/// Load or build the index, then pick up new source files when `sync` is set.
///
/// Without `sync`, an existing index is opened as-is and the data directory is
/// not read.
///
/// # Errors
///
/// Returns an error if documents cannot be loaded, the persisted index is
/// unusable, or embedding fails.
pub async fn open_index<P: LlmProvider>(
    config: &Config,
    provider: &P,
    sync: bool,
) -> anyhow::Result<IndexStore> {
    let storage = &config.index.storage_dir;
    let options = index_options(config);

    if !sync && storage.exists() {
        match IndexStore::load(storage, provider.embedding_model(), options.clone()).await {
            Ok(store) => {
                tracing::info!(
                    documents = store.document_count(),
                    passages = store.passage_count(),
                    "index loaded"
                );
                return Ok(store);
            }
            Err(e) if e.is_corrupt_store() && options.rebuild_on_corrupt => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to load index from {}", storage.display())
                });
            }
        }
    }

    let documents = load_documents(config).await?;
    let mut store = IndexStore::load_or_create(storage, &documents, provider, options)
        .await
        .with_context(|| format!("failed to open index at {}", storage.display()))?;

    if sync {
        tracing::info!("checking for new documents");
        let report = store
            .sync(&documents, provider)
            .await
            .context("failed to update index")?;
        if report.changed() {
            tracing::info!(
                inserted = report.inserted,
                updated = report.updated,
                "index updated"
            );
        } else {
            tracing::info!("index is up to date");
        }
    }
    Ok(store)
}

/// # Errors
///
/// Returns an error if the configured persona is invalid.
pub fn create_session<P: LlmProvider>(
    config: &Config,
    index: IndexStore,
    provider: Arc<P>,
) -> anyhow::Result<ChatSession<P>> {
    let persona = create_persona(config)?;
    tracing::info!(persona = %persona.kind(), top_k = config.retrieval.top_k, "chat session ready");
    let retriever =
        Retriever::new(Arc::new(index), Arc::clone(&provider)).with_top_k(config.retrieval.top_k);
    Ok(ChatSession::new(retriever, provider, persona))
}

#[cfg(test)]
mod tests {
    use manas_llm::mock::MockProvider;
    use serial_test::serial;

    use super::*;
    use crate::persona::PersonaKind;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.index.data_dir = dir.join("data");
        config.index.storage_dir = dir.join("storage");
        config.llm.embedding_model = "mock-embed".into();
        config
    }

    #[test]
    #[serial]
    fn config_path_priority() {
        unsafe { std::env::remove_var("MANAS_CONFIG") };
        assert_eq!(
            resolve_config_path(None),
            PathBuf::from("config/default.toml")
        );

        unsafe { std::env::set_var("MANAS_CONFIG", "/etc/manas.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/manas.toml"));
        assert_eq!(
            resolve_config_path(Some(Path::new("cli.toml"))),
            PathBuf::from("cli.toml")
        );
        unsafe { std::env::remove_var("MANAS_CONFIG") };
    }

    #[test]
    fn provider_uses_configured_models() {
        let provider = create_provider(&Config::default()).unwrap();
        assert_eq!(provider.model(), "gemma3:4b");
        assert_eq!(provider.embedding_model(), "nomic-embed-text");
    }

    #[test]
    fn persona_from_config() {
        let mut config = Config::default();
        config.persona.name = "devotee".into();
        assert_eq!(create_persona(&config).unwrap().kind(), PersonaKind::Devotee);

        config.persona.query_template = Some("{query_str} only".into());
        assert!(create_persona(&config).is_err());
    }

    #[test]
    fn index_options_follow_config() {
        let mut config = Config::default();
        config.index.chunk_size = 512;
        config.index.detect_changes = true;
        let options = index_options(&config);
        assert_eq!(options.splitter.chunk_size, 512);
        assert_eq!(options.splitter.chunk_overlap, 200);
        assert!(options.detect_changes);
        assert!(!options.rebuild_on_corrupt);
    }

    #[tokio::test]
    async fn open_index_builds_then_syncs_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.index.data_dir).unwrap();
        std::fs::write(config.index.data_dir.join("a.txt"), "Om tat sat.").unwrap();
        let provider = MockProvider::default();

        let store = open_index(&config, &provider, true).await.unwrap();
        assert_eq!(store.document_count(), 1);
        assert!(config.index.storage_dir.is_dir());

        std::fs::write(config.index.data_dir.join("b.txt"), "Hare Krishna.").unwrap();
        let store = open_index(&config, &provider, true).await.unwrap();
        assert_eq!(store.document_count(), 2);
    }

    #[tokio::test]
    async fn open_index_without_sync_skips_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.index.data_dir).unwrap();
        std::fs::write(config.index.data_dir.join("a.txt"), "Om tat sat.").unwrap();
        let provider = MockProvider::default();
        open_index(&config, &provider, true).await.unwrap();

        std::fs::remove_dir_all(&config.index.data_dir).unwrap();
        let store = open_index(&config, &provider, false).await.unwrap();
        assert_eq!(store.document_count(), 1);
    }

    #[tokio::test]
    async fn serve_starts_from_storage_without_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(config.index.sync_on_start);
        std::fs::create_dir_all(&config.index.data_dir).unwrap();
        std::fs::write(config.index.data_dir.join("a.txt"), "Om tat sat.").unwrap();
        let provider = MockProvider::default();
        assert!(serve_sync(&config));
        open_index(&config, &provider, true).await.unwrap();

        std::fs::remove_dir_all(&config.index.data_dir).unwrap();
        assert!(!serve_sync(&config));
        let store = open_index(&config, &provider, serve_sync(&config)).await.unwrap();
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn serve_sync_needs_data_or_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        assert!(serve_sync(&config));
        config.index.sync_on_start = false;
        assert!(!serve_sync(&config));
    }

    #[tokio::test]
    async fn missing_data_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let err = open_index(&config, &MockProvider::default(), true)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to load documents"));
        assert!(!config.index.storage_dir.exists());
    }

    #[tokio::test]
    async fn session_answers_with_configured_top_k() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.retrieval.top_k = 1;
        std::fs::create_dir_all(&config.index.data_dir).unwrap();
        std::fs::write(config.index.data_dir.join("a.txt"), "The soul is eternal.").unwrap();
        std::fs::write(config.index.data_dir.join("b.txt"), "Rivers flow to the sea.").unwrap();

        let provider = Arc::new(MockProvider::default());
        let store = open_index(&config, provider.as_ref(), true).await.unwrap();
        let session = create_session(&config, store, Arc::clone(&provider)).unwrap();

        assert_eq!(session.retriever().top_k(), 1);
        assert_eq!(session.answer("Is the soul eternal?").await.unwrap(), "mock response");
        let user = &provider.last_messages()[1].content;
        assert_eq!(user.matches("file_path: ").count(), 1);
    }
}
