use crate::cancel::CancelToken;
use crate::classifier::{classify, infer_language, ClassifyInput};
use crate::error::{Result, ScannerError};
use crate::limits::default_scan_concurrency;
use crate::reader::{count_lines, load_file, LoadedFile, TextContent};
use crate::walker::FileWalker;
use recon_protocol::paths::normalize_relative_path;
use recon_protocol::{FileRecord, Language, Role, Warning};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Text files above this size are reported unreadable.
pub const DEFAULT_MAX_TEXT_BYTES: u64 = 1_048_576; // 1 MB

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub jobs: usize,
    pub respect_gitignore: bool,
    pub max_text_bytes: u64,
    /// Root-relative paths left out of the walk, such as the run's own output directory.
    pub excluded: Vec<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            jobs: default_scan_concurrency(),
            respect_gitignore: true,
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            excluded: Vec::new(),
        }
    }
}

/// One classified file, with its text when it could be decoded.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub record: FileRecord,
    pub content: Option<Arc<str>>,
}

impl ScannedFile {
    pub fn path(&self) -> &str {
        &self.record.path
    }

    pub fn role(&self) -> Role {
        self.record.role
    }

    pub fn language(&self) -> Language {
        self.record.language
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// Immutable result of the scanning phase, sorted by path.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    pub root: PathBuf,
    pub files: Vec<ScannedFile>,
    pub warnings: Vec<Warning>,
    /// Hex SHA-256 over every file's path and content digest, in path order.
    pub fingerprint: String,
}

impl ScanOutput {
    pub fn records(&self) -> Vec<FileRecord> {
        self.files.iter().map(|file| file.record.clone()).collect()
    }

    pub fn find(&self, path: &str) -> Option<&ScannedFile> {
        self.files
            .binary_search_by(|file| file.path().cmp(path))
            .ok()
            .map(|idx| &self.files[idx])
    }

    pub fn text_files(&self) -> impl Iterator<Item = (&ScannedFile, &str)> {
        self.files
            .iter()
            .filter_map(|file| file.text().map(|text| (file, text)))
    }

    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &ScannedFile> {
        self.files.iter().filter(move |file| file.role() == role)
    }
}

struct FileScan {
    file: ScannedFile,
    digest: [u8; 32],
    warning: Option<Warning>,
}

/// Walks `root`, then reads and classifies every file on a bounded pool of tokio tasks.
pub async fn scan_tree(
    root: impl AsRef<Path>,
    options: &ScanOptions,
    cancel: &CancelToken,
) -> Result<ScanOutput> {
    let root = root.as_ref().to_path_buf();
    let meta = match tokio::fs::metadata(&root).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScannerError::RootNotFound(root));
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_dir() {
        return Err(ScannerError::NotADirectory(root));
    }

    let walker = FileWalker::new(&root)
        .respect_gitignore(options.respect_gitignore)
        .exclude(options.excluded.iter().cloned());
    let paths = tokio::task::spawn_blocking(move || walker.walk())
        .await
        .map_err(|e| ScannerError::TaskFailed(e.to_string()))?;
    if paths.is_empty() {
        return Err(ScannerError::EmptyTree(root));
    }
    if cancel.is_cancelled() {
        return Err(ScannerError::Cancelled);
    }

    let jobs = options.jobs.max(1);
    log::info!("Scanning {} files with {jobs} workers", paths.len());

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();
    for path in paths {
        if cancel.is_cancelled() {
            tasks.abort_all();
            return Err(ScannerError::Cancelled);
        }
        let Some(relative) = normalize_relative_path(&root, &path) else {
            log::debug!("Skipping {} outside the source root", path.display());
            continue;
        };
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ScannerError::TaskFailed(e.to_string()))?;
        let max_text_bytes = options.max_text_bytes;
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _permit = permit;
            if cancel.is_cancelled() {
                return None;
            }
            Some(scan_file(path, relative, max_text_bytes).await)
        });
    }

    let mut scans = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if cancel.is_cancelled() {
            tasks.abort_all();
            return Err(ScannerError::Cancelled);
        }
        match joined {
            Ok(Some(scan)) => scans.push(scan),
            Ok(None) => return Err(ScannerError::Cancelled),
            Err(e) => return Err(ScannerError::TaskFailed(e.to_string())),
        }
    }

    scans.sort_by(|a, b| a.file.record.path.cmp(&b.file.record.path));

    let mut hasher = Sha256::new();
    let mut files = Vec::with_capacity(scans.len());
    let mut warnings = Vec::new();
    for scan in scans {
        hasher.update(scan.file.record.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(scan.digest);
        warnings.extend(scan.warning);
        files.push(scan.file);
    }
    warnings.sort();
    let fingerprint = to_hex(&hasher.finalize());

    log::info!(
        "Scanned {} files ({} unreadable)",
        files.len(),
        warnings.len()
    );

    Ok(ScanOutput {
        root,
        files,
        warnings,
        fingerprint,
    })
}

async fn scan_file(path: PathBuf, relative: String, max_text_bytes: u64) -> FileScan {
    let LoadedFile { content, digest } = load_file(&path, max_text_bytes).await;

    match content {
        TextContent::Text(text) => {
            let language = infer_language(&relative, Some(&text));
            let (role, _) = classify(&ClassifyInput::new(&relative, language, Some(&text)));
            let line_count = count_lines(&text);
            FileScan {
                file: ScannedFile {
                    record: FileRecord {
                        path: relative,
                        role,
                        language,
                        line_count,
                    },
                    content: Some(Arc::from(text)),
                },
                digest,
                warning: None,
            }
        }
        TextContent::Unreadable(reason) => {
            log::debug!("Unreadable file {relative}: {reason}");
            let language = infer_language(&relative, None);
            let warning = Warning::file_unreadable(relative.clone(), reason);
            FileScan {
                file: ScannedFile {
                    record: FileRecord {
                        path: relative,
                        role: Role::Other,
                        language,
                        line_count: 0,
                    },
                    content: None,
                },
                digest,
                warning: Some(warning),
            }
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
