use crate::github::DEFAULT_GITHUB_URL;
use crate::layout::APP_DIR_NAME;
use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "gitdown.toml";
pub const GITHUB_URL_ENV: &str = "GITDOWN_GITHUB_URL";

/// User settings, read from `gitdown.toml` in the platform config directory.
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL archives are fetched from.
    pub github_url: String,
    /// Root the application folder is created in. Defaults to the user's
    /// downloads folder.
    pub downloads_dir: Option<PathBuf>,
    /// Name of the folder under the downloads root.
    pub app_dir: String,
    /// Where the zip is saved before extraction. Defaults to the working directory.
    pub archive_dir: Option<PathBuf>,
    /// Request timeout in seconds. No timeout when unset.
    pub timeout_secs: Option<u64>,
    /// Run dependency installers after extraction.
    pub install: bool,
    /// Interpreter used for `pip install`.
    pub python: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_url: DEFAULT_GITHUB_URL.to_string(),
            downloads_dir: None,
            app_dir: APP_DIR_NAME.to_string(),
            archive_dir: None,
            timeout_secs: None,
            install: true,
            python: if cfg!(windows) { "python" } else { "python3" }.to_string(),
        }
    }
}

impl Config {
    pub fn get_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "gitdown", "gitdown")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the config from `path`, or the platform location when `None`.
    /// A missing file is not an error. The base URL env var wins over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::get_path()?,
        };

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))?
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(url) = std::env::var(GITHUB_URL_ENV) {
            config.github_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.github_url)
            .with_context(|| format!("github_url `{}` is not a valid URL", self.github_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("github_url must be http or https, got {}", url.scheme()));
        }
        if self.app_dir.trim().is_empty() {
            return Err(anyhow!("app_dir must not be empty"));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }
}
