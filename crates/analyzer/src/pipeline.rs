use crate::artifacts::{write_artifacts, ArtifactPaths, DOCUMENT_FILE_NAME, RECORD_FILE_NAME};
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::metrics::compute_metrics;
use crate::synth::{synthesize, Upstream};
use recon_detect::{classify_architecture, detect_stack, discover_entry_points};
use recon_extract::{extract_endpoints, extract_schema};
use recon_protocol::AnalysisResult;
use recon_scanner::{scan_tree, CancelToken, ScanOptions, ScanOutput};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{spawn_blocking, JoinHandle};

/// Observable state of one run.
///
/// `Pending → Scanning → Analyzing → Synthesizing → Done`; `Failed` when the tree cannot be
/// acquired or a later step errors; `Cancelled` when the token fires before the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisPhase {
    Pending,
    Scanning,
    Analyzing,
    Synthesizing,
    Done,
    Failed,
    Cancelled,
}

impl AnalysisPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisPhase::Pending => "pending",
            AnalysisPhase::Scanning => "scanning",
            AnalysisPhase::Analyzing => "analyzing",
            AnalysisPhase::Synthesizing => "synthesizing",
            AnalysisPhase::Done => "done",
            AnalysisPhase::Failed => "failed",
            AnalysisPhase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AnalysisPhase::Done | AnalysisPhase::Failed | AnalysisPhase::Cancelled
        )
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis run over one source tree
pub struct Analyzer {
    config: AnalyzerConfig,
    phase_tx: watch::Sender<AnalysisPhase>,
}

async fn join_optional<T>(task: Option<JoinHandle<T>>) -> Result<Option<T>> {
    match task {
        Some(handle) => Ok(Some(handle.await?)),
        None => Ok(None),
    }
}

fn check_cancelled(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(AnalyzerError::Cancelled);
    }
    Ok(())
}

/// Root checks that do not need a walk: the path must exist and be a directory.
async fn acquire(root: &Path) -> Result<()> {
    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(AnalyzerError::Acquisition(format!(
            "Source root is not a directory: {}",
            root.display()
        ))),
        Err(err) => Err(AnalyzerError::Acquisition(format!(
            "Source root does not exist: {} ({err})",
            root.display()
        ))),
    }
}

/// Root-relative paths where a run's artifacts land, so later runs do not scan them.
///
/// Empty when the output directory does not exist yet or lies outside the root.
async fn artifact_exclusions(root: &Path, out_dir: &Path) -> Vec<PathBuf> {
    let (Ok(root), Ok(out_dir)) = (
        tokio::fs::canonicalize(root).await,
        tokio::fs::canonicalize(out_dir).await,
    ) else {
        return Vec::new();
    };
    match out_dir.strip_prefix(&root) {
        Ok(relative) if relative.as_os_str().is_empty() => {
            vec![PathBuf::from(RECORD_FILE_NAME), PathBuf::from(DOCUMENT_FILE_NAME)]
        }
        Ok(relative) => vec![relative.to_path_buf()],
        Err(_) => Vec::new(),
    }
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let (phase_tx, _) = watch::channel(AnalysisPhase::Pending);
        Ok(Self { config, phase_tx })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn phase(&self) -> AnalysisPhase {
        *self.phase_tx.borrow()
    }

    /// Receiver that observes every phase transition of this analyzer
    pub fn subscribe(&self) -> watch::Receiver<AnalysisPhase> {
        self.phase_tx.subscribe()
    }

    fn enter(&self, phase: AnalysisPhase) {
        log::debug!("Phase: {phase}");
        self.phase_tx.send_replace(phase);
    }

    fn finish<T>(&self, outcome: &Result<T>) {
        let phase = match outcome {
            Ok(_) => AnalysisPhase::Done,
            Err(AnalyzerError::Cancelled) => AnalysisPhase::Cancelled,
            Err(_) => AnalysisPhase::Failed,
        };
        self.enter(phase);
    }

    /// Run every phase the configured depth asks for and return the record
    pub async fn run(&self, root: &Path, cancel: &CancelToken) -> Result<AnalysisResult> {
        let outcome = self.execute(root, Vec::new(), cancel).await;
        self.finish(&outcome);
        outcome
    }

    /// Run, then write `analysis.json` and `RECONSTRUCTED_SPEC.md` under `out_dir`
    ///
    /// Nothing is written unless the run reached synthesis. An `out_dir` inside the root is
    /// left out of the scan.
    pub async fn run_to_dir(
        &self,
        root: &Path,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<(AnalysisResult, ArtifactPaths)> {
        let excluded = artifact_exclusions(root, out_dir).await;
        let outcome = match self.execute(root, excluded, cancel).await {
            Ok(result) => write_artifacts(out_dir, &result)
                .await
                .map(|paths| (result, paths)),
            Err(err) => Err(err),
        };
        self.finish(&outcome);
        outcome
    }

    async fn execute(
        &self,
        root: &Path,
        excluded: Vec<PathBuf>,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult> {
        acquire(root).await?;
        check_cancelled(cancel)?;

        self.enter(AnalysisPhase::Scanning);
        let options = ScanOptions {
            excluded,
            ..self.config.scan_options()
        };
        let scan = scan_tree(root, &options, cancel).await?;
        log::info!(
            "Scanned {} files under {} ({} warnings)",
            scan.files.len(),
            root.display(),
            scan.warnings.len()
        );
        check_cancelled(cancel)?;

        self.enter(AnalysisPhase::Analyzing);
        let scan = Arc::new(scan);
        let result = self.analyze(scan, cancel).await?;
        log::info!(
            "Analysis complete: {} endpoints, {} entities, {} warnings",
            result.endpoints.len(),
            result.schema_entities.len(),
            result.warnings.len()
        );
        Ok(result)
    }

    async fn analyze(&self, scan: Arc<ScanOutput>, cancel: &CancelToken) -> Result<AnalysisResult> {
        let depth = self.config.depth;

        let stack_task = {
            let scan = Arc::clone(&scan);
            let weights = self.config.stack.clone();
            spawn_blocking(move || detect_stack(&scan.files, &weights))
        };
        let architecture_task = depth.runs_architecture().then(|| {
            let scan = Arc::clone(&scan);
            spawn_blocking(move || classify_architecture(&scan.files))
        });
        let metrics_task = depth.runs_metrics().then(|| {
            let scan = Arc::clone(&scan);
            let weights = self.config.metrics.clone();
            spawn_blocking(move || compute_metrics(&scan.files, &weights))
        });
        let routes_task = depth.runs_extraction().then(|| {
            let scan = Arc::clone(&scan);
            spawn_blocking(move || extract_endpoints(&scan.files))
        });
        let schema_task = depth.runs_extraction().then(|| {
            let scan = Arc::clone(&scan);
            spawn_blocking(move || extract_schema(&scan.files))
        });
        let entry_points = discover_entry_points(&scan.files);

        // Barrier: synthesis needs every extractor's output.
        let stack = stack_task.await?;
        let architecture = join_optional(architecture_task).await?;
        let metrics = join_optional(metrics_task).await?;
        let routes = join_optional(routes_task).await?;
        let schema = join_optional(schema_task).await?;
        check_cancelled(cancel)?;

        self.enter(AnalysisPhase::Synthesizing);
        Ok(synthesize(
            depth,
            Upstream {
                scan: &scan,
                stack,
                entry_points,
                architecture,
                metrics,
                routes,
                schema,
            },
        ))
    }
}

/// Convenience wrapper: one run with a fresh analyzer.
pub async fn analyze(
    root: &Path,
    config: AnalyzerConfig,
    cancel: &CancelToken,
) -> Result<AnalysisResult> {
    Analyzer::new(config)?.run(root, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(AnalysisPhase::Done.is_terminal());
        assert!(AnalysisPhase::Cancelled.is_terminal());
        assert!(!AnalysisPhase::Synthesizing.is_terminal());
        assert_eq!(AnalysisPhase::Analyzing.to_string(), "analyzing");
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = AnalyzerConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            Analyzer::new(config),
            Err(AnalyzerError::InvalidConfig(_))
        ));
    }
}
