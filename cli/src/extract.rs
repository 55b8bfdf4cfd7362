use crate::error::ExtractError;
use crate::events::{EventSink, PipelineEvent, Stage};
use crate::fetch::FetchResult;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub destination: PathBuf,
    pub entries: usize,
}

/// Unpacks the fetched archive into `destination`, then deletes the archive.
///
/// Entries keep their relative paths inside the archive. Existing files in
/// `destination` are overwritten but never removed. Entries that would land
/// outside `destination` abort the extraction; whatever was written before the
/// failure stays, and so does the archive.
pub fn extract_archive(
    fetched: &FetchResult,
    destination: &Path,
    sink: &dyn EventSink,
) -> Result<ExtractReport, ExtractError> {
    let io_err = |path: &Path, source: io::Error| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    };
    let zip_err = |source: zip::result::ZipError| ExtractError::Archive {
        path: fetched.archive_path.clone(),
        source,
    };

    fs::create_dir_all(destination).map_err(|e| io_err(destination, e))?;

    let file = File::open(&fetched.archive_path).map_err(|e| io_err(&fetched.archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;
    let total = archive.len();
    log::debug!(
        "extracting {} entries from {} into {}",
        total,
        fetched.archive_path.display(),
        destination.display()
    );

    for i in 0..total {
        let mut entry = archive.by_index(i).map_err(zip_err)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractError::UnsafeEntry(entry.name().to_string()))?;
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| io_err(&out_path, e))?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            let mut out = File::create(&out_path).map_err(|e| io_err(&out_path, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| io_err(&out_path, e))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                    .map_err(|e| io_err(&out_path, e))?;
            }
        }

        sink.emit(PipelineEvent::Progress {
            stage: Stage::Extract,
            done: (i + 1) as u64,
            total: Some(total as u64),
        });
    }

    drop(archive);
    fs::remove_file(&fetched.archive_path).map_err(|e| io_err(&fetched.archive_path, e))?;

    sink.emit(PipelineEvent::Extracted {
        destination: destination.to_path_buf(),
        entries: total,
    });

    Ok(ExtractReport {
        destination: destination.to_path_buf(),
        entries: total,
    })
}
