use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScannerError>;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Source root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Source root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("No regular files to analyze under {}", .0.display())]
    EmptyTree(PathBuf),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Scan task failed: {0}")]
    TaskFailed(String),
}

impl ScannerError {
    /// Errors that mean the tree itself could not be acquired.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            ScannerError::RootNotFound(_) | ScannerError::NotADirectory(_) | ScannerError::EmptyTree(_)
        )
    }
}
