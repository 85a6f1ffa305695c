use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentLoader, DocumentMetadata, LoadError};

/// Reads every visible regular file in a directory into a [`Document`].
///
/// Unreadable or oversized files are skipped with a warning; only a missing or
/// unlistable source directory is an error.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    pub max_file_size: u64,
    pub recursive: bool,
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            recursive: false,
        }
    }
}

impl DirectoryLoader {
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Load all documents under `dir`, sorted by file path.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if `dir` does not exist, is not a directory, or
    /// cannot be listed.
    pub async fn load_dir(&self, dir: &Path) -> Result<Vec<Document>, LoadError> {
        let meta = tokio::fs::metadata(dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(dir.to_path_buf())
            } else {
                LoadError::Unreadable {
                    path: dir.to_path_buf(),
                    source: e,
                }
            }
        })?;
        if !meta.is_dir() {
            return Err(LoadError::NotADirectory(dir.to_path_buf()));
        }

        let root = tokio::fs::canonicalize(dir)
            .await
            .map_err(|e| LoadError::Unreadable {
                path: dir.to_path_buf(),
                source: e,
            })?;

        let mut files = self.collect_files(&root).await?;
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            if let Some(doc) = self.read_file(&path).await {
                documents.push(doc);
            }
        }

        if documents.is_empty() {
            tracing::warn!(dir = %root.display(), "no readable documents found");
        } else {
            tracing::debug!(dir = %root.display(), count = documents.len(), "documents loaded");
        }
        Ok(documents)
    }

    async fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        // canonical directories already queued; symlink cycles are walked once
        let mut visited = HashSet::from([root.to_path_buf()]);

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if dir == root => {
                    return Err(LoadError::Unreadable {
                        path: dir,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), "skipping unreadable directory: {e}");
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), "directory listing interrupted: {e}");
                        break;
                    }
                };
                if is_hidden(&entry.file_name()) {
                    continue;
                }
                let path = entry.path();
                let Ok(meta) = tokio::fs::metadata(&path).await else {
                    tracing::warn!(path = %path.display(), "skipping entry with unreadable metadata");
                    continue;
                };
                if meta.is_dir() {
                    if !self.recursive {
                        continue;
                    }
                    match tokio::fs::canonicalize(&path).await {
                        Ok(canonical) if visited.insert(canonical.clone()) => pending.push(path),
                        Ok(_) => {
                            tracing::debug!(dir = %path.display(), "skipping already visited directory");
                        }
                        Err(e) => {
                            tracing::warn!(dir = %path.display(), "skipping unresolvable directory: {e}");
                        }
                    }
                } else if meta.is_file() {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    async fn read_file(&self, path: &Path) -> Option<Document> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > self.max_file_size => {
                tracing::warn!(
                    path = %path.display(),
                    size = meta.len(),
                    limit = self.max_file_size,
                    "skipping oversized file"
                );
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), "skipping unreadable file: {e}");
                return None;
            }
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), "skipping unreadable file: {e}");
                return None;
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(Document {
            content: String::from_utf8_lossy(&bytes).into_owned(),
            metadata: DocumentMetadata {
                file_path: path.display().to_string(),
                file_name,
                content_type: content_type_for(path).to_owned(),
            },
        })
    }
}

impl DocumentLoader for DirectoryLoader {
    fn load<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Document>, LoadError>> + Send + 'a>> {
        Box::pin(self.load_dir(path))
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md" | "markdown") => "text/markdown",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        _ => "text/plain",
    }
}
