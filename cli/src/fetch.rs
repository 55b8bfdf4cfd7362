use crate::error::FetchError;
use crate::events::{EventSink, PipelineEvent, Stage};
use crate::github::ResolvedBranch;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// A fully downloaded archive waiting to be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub resolved_branch: String,
    pub archive_path: PathBuf,
    pub size_bytes: u64,
}

/// Streams the resolved branch's archive to `archive_path`.
///
/// The file is flushed and closed before this returns. If the body fails
/// part-way through, whatever was written so far stays on disk.
pub async fn download_archive(
    resolved: ResolvedBranch,
    archive_path: &Path,
    sink: &dyn EventSink,
) -> Result<FetchResult, FetchError> {
    let ResolvedBranch {
        branch,
        url,
        mut response,
    } = resolved;

    let total = response.content_length().filter(|len| *len > 0);
    log::debug!(
        "saving {} to {} ({} bytes declared)",
        url,
        archive_path.display(),
        total.map_or_else(|| "unknown".to_string(), |t| t.to_string())
    );

    let io_err = |source: std::io::Error| FetchError::Io {
        path: archive_path.to_path_buf(),
        source,
    };

    if let Some(parent) = archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
    }
    let mut file = tokio::fs::File::create(archive_path)
        .await
        .map_err(io_err)?;

    let mut written: u64 = 0;
    sink.emit(PipelineEvent::Progress {
        stage: Stage::Download,
        done: 0,
        total,
    });

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.clone(),
            source,
        })?
    {
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
        sink.emit(PipelineEvent::Progress {
            stage: Stage::Download,
            done: written,
            total,
        });
    }

    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    drop(file);

    sink.emit(PipelineEvent::ArchiveSaved {
        path: archive_path.to_path_buf(),
        bytes: written,
    });

    Ok(FetchResult {
        resolved_branch: branch,
        archive_path: archive_path.to_path_buf(),
        size_bytes: written,
    })
}
