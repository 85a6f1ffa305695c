pub mod error;
pub mod loader;
pub mod splitter;

use std::path::Path;
use std::pin::Pin;

pub use error::LoadError;
pub use loader::DirectoryLoader;
pub use splitter::{Passage, PassageSplitter, SplitterConfig};

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Path the file was read from. This is the document's identity.
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.metadata.file_path
    }

    /// BLAKE3 hex digest of the document text.
    #[must_use]
    pub fn content_hash(&self) -> String {
        blake3::hash(self.content.as_bytes()).to_hex().to_string()
    }
}

pub trait DocumentLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Document>, LoadError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document {
            content: content.into(),
            metadata: DocumentMetadata {
                file_path: "/data/a.txt".into(),
                file_name: "a.txt".into(),
                content_type: "text/plain".into(),
            },
        }
    }

    #[test]
    fn content_hash_is_stable_and_content_sensitive() {
        assert_eq!(doc("om").content_hash(), doc("om").content_hash());
        assert_ne!(doc("om").content_hash(), doc("om tat sat").content_hash());
        assert_eq!(doc("").content_hash().len(), 64);
    }

    #[test]
    fn file_path_accessor() {
        assert_eq!(doc("x").file_path(), "/data/a.txt");
    }
}
