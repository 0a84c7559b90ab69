use crate::error::{AnalyzerError, Result};
use crate::metrics::MetricsWeights;
use recon_detect::StackWeights;
use recon_protocol::AnalysisDepth;
use recon_scanner::{
    default_scan_concurrency, scan_concurrency_from_env, ScanOptions, DEFAULT_MAX_TEXT_BYTES,
    MAX_SCAN_CONCURRENCY,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one analysis run
///
/// Sources, lowest precedence first: defaults, an optional TOML file, the
/// `RECON_SCAN_CONCURRENCY` environment variable, command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzerConfig {
    /// How much of the pipeline runs
    pub depth: AnalysisDepth,

    /// Scan worker count (unset = derived from available parallelism)
    pub jobs: Option<usize>,

    /// Honor `.gitignore` files inside the analyzed tree
    pub respect_gitignore: bool,

    /// Text files above this size are reported unreadable
    pub max_text_bytes: u64,

    /// Stack signature weights and detection threshold
    pub stack: StackWeights,

    /// Complexity heuristic weights
    pub metrics: MetricsWeights,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            depth: AnalysisDepth::default(),
            jobs: None,
            respect_gitignore: true,
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            stack: StackWeights::default(),
            metrics: MetricsWeights::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw).map_err(|source| AnalyzerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RECON_SCAN_CONCURRENCY` when it is set
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(jobs) = scan_concurrency_from_env() {
            self.jobs = Some(jobs);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(jobs) = self.jobs {
            if jobs == 0 || jobs > MAX_SCAN_CONCURRENCY {
                return Err(AnalyzerError::InvalidConfig(format!(
                    "jobs must be within 1..={MAX_SCAN_CONCURRENCY}, got {jobs}"
                )));
            }
        }
        if self.max_text_bytes == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "maxTextBytes must be positive".to_string(),
            ));
        }
        self.stack.validate().map_err(AnalyzerError::InvalidConfig)?;
        self.metrics.validate().map_err(AnalyzerError::InvalidConfig)?;
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            jobs: self.jobs.unwrap_or_else(default_scan_concurrency),
            respect_gitignore: self.respect_gitignore,
            max_text_bytes: self.max_text_bytes,
            excluded: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AnalyzerConfig::from_toml_str(
            "depth = \"deep\"\njobs = 4\n\n[stack]\nthreshold = 0.5\n\n[metrics]\nmaxScore = 40.0\n",
        )
        .unwrap();

        assert_eq!(config.depth, AnalysisDepth::Deep);
        assert_eq!(config.jobs, Some(4));
        assert!(config.respect_gitignore);
        assert_eq!(config.stack.threshold, 0.5);
        assert_eq!(config.stack.manifest_file, 0.6);
        assert_eq!(config.metrics.max_score, 40.0);
        assert_eq!(config.metrics.branch_weight, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AnalyzerConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.jobs = Some(MAX_SCAN_CONCURRENCY + 1);
        assert!(config.validate().is_err());

        config.jobs = Some(2);
        config.stack.threshold = 0.0;
        assert!(config.validate().is_err());

        config.stack.threshold = 0.35;
        config.max_text_bytes = 0;
        assert!(config.validate().is_err());

        config.max_text_bytes = 1024;
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_options().jobs, 2);
    }

    #[test]
    fn load_reports_the_offending_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("recon.toml");
        std::fs::write(&path, "depth = 3\n").unwrap();

        let err = AnalyzerConfig::load(&path).unwrap_err();
        assert!(matches!(err, AnalyzerError::ConfigParse { .. }));
        assert!(err.to_string().contains("recon.toml"));
    }
}
