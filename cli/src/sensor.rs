use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Language ecosystems the sensor and installers know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Python,
    Node,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 2] = [Ecosystem::Python, Ecosystem::Node];

    /// File extensions that suggest a tree belongs to this ecosystem.
    pub fn marker_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py"],
            Self::Node => &["js", "mjs", "cjs", "ts"],
        }
    }

    /// The dependency manifest an installer for this ecosystem consumes.
    pub fn manifest_name(&self) -> &'static str {
        match self {
            Self::Python => "requirements.txt",
            Self::Node => "package.json",
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.marker_extensions().contains(&ext))
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "Python"),
            Self::Node => write!(f, "Node"),
        }
    }
}

/// Coarse, best-effort guess at what kind of project a tree holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentClassification {
    pub detected: Vec<Ecosystem>,
}

impl EnvironmentClassification {
    pub fn is_detected(&self, ecosystem: Ecosystem) -> bool {
        self.detected.contains(&ecosystem)
    }
}

/// Walks `root` and reports which ecosystems have at least one marker file.
/// Unreadable entries are skipped; a missing or empty tree detects nothing.
pub fn sense_environment(root: &Path, ecosystems: &[Ecosystem]) -> EnvironmentClassification {
    let mut detected = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        for ecosystem in ecosystems {
            if !detected.contains(ecosystem) && ecosystem.matches(entry.path()) {
                log::debug!("{} marker found: {}", ecosystem, entry.path().display());
                detected.push(*ecosystem);
            }
        }
        if detected.len() == ecosystems.len() {
            break;
        }
    }

    // Keep the caller's ordering regardless of which marker turned up first.
    detected.sort_by_key(|found| ecosystems.iter().position(|e| e == found));
    EnvironmentClassification { detected }
}

/// First file named `file_name` under `root`, walking top-down. Within a
/// directory its own files are checked before any subdirectory, so the
/// shallowest match wins.
pub fn find_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(|entry| entry.into_path())
}
