//! # Recon Analyzer
//!
//! Runs one analysis over a materialized source tree and produces its two artifacts.
//!
//! ## Pipeline
//!
//! ```text
//! Source root
//!     │
//!     ├──> Scanning (recon-scanner, bounded worker pool)
//!     │
//!     ├──> Analyzing (blocking tasks over one Arc<ScanOutput>)
//!     │      ├─ Stack detection + entry points
//!     │      ├─ Architecture classification     (full, deep)
//!     │      ├─ Metrics                         (full, deep)
//!     │      ├─ Endpoint extraction             (deep)
//!     │      └─ Schema extraction               (deep)
//!     │
//!     ├──> Synthesizing (barrier)
//!     │      ├─ Dependency diagram              (deep)
//!     │      └─ AnalysisResult, built by value
//!     │
//!     └──> Artifacts
//!            ├─ analysis.json
//!            └─ RECONSTRUCTED_SPEC.md
//! ```
//!
//! Phases are observable through [`Analyzer::subscribe`]; a [`CancelToken`] stops the run at
//! any point before synthesis and nothing is written.

mod artifacts;
mod config;
mod error;
mod metrics;
mod pipeline;
mod render;
mod synth;

pub use artifacts::{write_artifacts, ArtifactPaths, DOCUMENT_FILE_NAME, RECORD_FILE_NAME};
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use metrics::{compute_metrics, MetricsWeights};
pub use pipeline::{analyze, AnalysisPhase, Analyzer};
pub use recon_scanner::CancelToken;
pub use render::render_markdown;
pub use synth::{infer_features, synthesize, Upstream};
