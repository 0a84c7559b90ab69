//! # Recon Scanner
//!
//! Turns a source tree into classified file records.
//!
//! ## Pipeline
//!
//! ```text
//! Source root
//!     │
//!     ├──> File Walker (ignored scopes, .gitignore aware)
//!     │      └─> Sorted file paths
//!     │
//!     ├──> Reader (bounded worker pool)
//!     │      └─> Text or unreadable marker + content digest
//!     │
//!     └──> Classifier (ordered role rules)
//!            └─> FileRecord per file, sorted by path
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use recon_scanner::{scan_tree, CancelToken, ScanOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let output = scan_tree("/path/to/project", &ScanOptions::default(), &CancelToken::new()).await?;
//!     println!("Scanned {} files", output.files.len());
//!     Ok(())
//! }
//! ```

mod cancel;
mod classifier;
mod error;
mod limits;
mod reader;
mod scan;
mod walker;

pub use cancel::CancelToken;
pub use classifier::{classify, infer_language, ClassifyInput, RoleRule, ROLE_RULES};
pub use error::{Result, ScannerError};
pub use limits::{
    default_scan_concurrency, parse_scan_concurrency, scan_concurrency_from_env,
    MAX_SCAN_CONCURRENCY, SCAN_CONCURRENCY_ENV,
};
pub use scan::{scan_tree, ScanOptions, ScanOutput, ScannedFile, DEFAULT_MAX_TEXT_BYTES};
pub use walker::{FileWalker, IGNORED_SCOPES};
