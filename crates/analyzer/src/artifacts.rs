use crate::error::{AnalyzerError, Result};
use crate::render::render_markdown;
use recon_protocol::{serialize_record, AnalysisResult};
use std::path::{Path, PathBuf};

pub const RECORD_FILE_NAME: &str = "analysis.json";
pub const DOCUMENT_FILE_NAME: &str = "RECONSTRUCTED_SPEC.md";

/// Where the two artifacts of a run were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub record: PathBuf,
    pub document: PathBuf,
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("out")
    ))
}

/// Writes every `(path, contents)` pair to its temp file first and renames only once all
/// writes succeeded; on a failed write the temp files are removed and no target is touched.
async fn write_all_atomic(entries: &[(&Path, &str)]) -> Result<()> {
    let temps: Vec<PathBuf> = entries.iter().map(|(path, _)| temp_path(path)).collect();
    for (tmp, (_, contents)) in temps.iter().zip(entries) {
        if let Err(err) = tokio::fs::write(tmp, contents).await {
            for stale in &temps {
                if let Err(e) = tokio::fs::remove_file(stale).await {
                    log::debug!("Could not remove {}: {e}", stale.display());
                }
            }
            return Err(err.into());
        }
    }
    for (tmp, (path, _)) in temps.iter().zip(entries) {
        tokio::fs::rename(tmp, path).await?;
    }
    Ok(())
}

/// Render both artifacts, then write them through temp files + rename.
///
/// Rendering happens before anything touches the disk, so a serialization failure leaves the
/// output directory as it was. Neither artifact is replaced unless both temp writes succeed.
pub async fn write_artifacts(out_dir: &Path, result: &AnalysisResult) -> Result<ArtifactPaths> {
    let record =
        serialize_record(result).map_err(|err| AnalyzerError::Serialization(err.to_string()))?;
    let document = render_markdown(result);

    tokio::fs::create_dir_all(out_dir).await?;
    let paths = ArtifactPaths {
        record: out_dir.join(RECORD_FILE_NAME),
        document: out_dir.join(DOCUMENT_FILE_NAME),
    };
    write_all_atomic(&[
        (paths.record.as_path(), record.as_str()),
        (paths.document.as_path(), document.as_str()),
    ])
    .await?;
    log::info!(
        "Wrote {} and {}",
        paths.record.display(),
        paths.document.display()
    );
    Ok(paths)
}
