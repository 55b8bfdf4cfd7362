use crate::repo::RepoRef;
use directories::UserDirs;
use std::path::{Path, PathBuf};

/// Folder created under the downloads root to hold every fetched repository.
pub const APP_DIR_NAME: &str = "GitDown";

/// Maps repositories to the directory they are always extracted into:
/// `<downloads-root>/<app-dir>/<owner>--<name>/`.
#[derive(Debug, Clone)]
pub struct DestinationLayout {
    root: PathBuf,
    app_dir: String,
}

impl DestinationLayout {
    pub fn new(downloads_root: impl Into<PathBuf>) -> Self {
        Self {
            root: downloads_root.into(),
            app_dir: APP_DIR_NAME.to_string(),
        }
    }

    pub fn with_app_dir(mut self, app_dir: &str) -> Self {
        self.app_dir = app_dir.to_string();
        self
    }

    pub fn destination(&self, repo: &RepoRef) -> PathBuf {
        self.root.join(&self.app_dir).join(repo.slug())
    }
}

/// The user's downloads folder. Uses the localized XDG directory on Linux and
/// the profile's `Downloads` on Windows, falling back to `~/Downloads`.
pub fn default_downloads_dir() -> Option<PathBuf> {
    let dirs = UserDirs::new()?;
    Some(
        dirs.download_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dirs.home_dir().join("Downloads")),
    )
}
