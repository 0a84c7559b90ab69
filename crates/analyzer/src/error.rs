use recon_scanner::ScannerError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The source tree could not be acquired; no record exists for this run.
    #[error("Acquisition failure: {0}")]
    Acquisition(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

impl AnalyzerError {
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(self, AnalyzerError::Acquisition(_))
    }
}

impl From<ScannerError> for AnalyzerError {
    fn from(err: ScannerError) -> Self {
        if err.is_acquisition_failure() {
            return AnalyzerError::Acquisition(err.to_string());
        }
        match err {
            ScannerError::Cancelled => AnalyzerError::Cancelled,
            other => AnalyzerError::Scan(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AnalyzerError {
    fn from(err: tokio::task::JoinError) -> Self {
        AnalyzerError::TaskFailed(err.to_string())
    }
}
