use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("source directory {0} does not exist")]
    NotFound(PathBuf),

    #[error("source path {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read source directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}
