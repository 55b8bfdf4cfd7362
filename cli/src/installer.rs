use crate::error::InstallError;
use crate::events::{EventSink, PipelineEvent};
use crate::sensor::{self, Ecosystem};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Installs the dependencies listed in one ecosystem's manifest file.
///
/// Implementations only need to know how to point their package manager at a
/// manifest; locating the manifest is done by [`DependencyInstaller`].
pub trait Installer: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    fn manifest_name(&self) -> &str {
        self.ecosystem().manifest_name()
    }

    fn install(&self, manifest: &Path) -> Result<(), InstallError>;
}

/// `python -m pip install -r requirements.txt`
pub struct PipInstaller {
    python: String,
}

impl PipInstaller {
    pub fn new(python: &str) -> Self {
        Self {
            python: python.to_string(),
        }
    }
}

impl Default for PipInstaller {
    fn default() -> Self {
        Self::new(if cfg!(windows) { "python" } else { "python3" })
    }
}

impl Installer for PipInstaller {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn install(&self, manifest: &Path) -> Result<(), InstallError> {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "pip", "install", "-r"]).arg(manifest);
        run(cmd, &self.python)
    }
}

/// `npm install`, run next to the `package.json`.
pub struct NpmInstaller {
    npm: String,
}

impl Default for NpmInstaller {
    fn default() -> Self {
        Self {
            npm: if cfg!(windows) { "npm.cmd" } else { "npm" }.to_string(),
        }
    }
}

impl Installer for NpmInstaller {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Node
    }

    fn install(&self, manifest: &Path) -> Result<(), InstallError> {
        let mut cmd = Command::new(&self.npm);
        cmd.arg("install");
        if let Some(dir) = manifest.parent() {
            cmd.current_dir(dir);
        }
        run(cmd, &self.npm)
    }
}

fn run(mut cmd: Command, program: &str) -> Result<(), InstallError> {
    let command = format!("{:?}", cmd);
    log::debug!("running {}", command);

    let output = cmd.output().map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            InstallError::ToolMissing(program.to_string())
        } else {
            InstallError::Spawn {
                command: command.clone(),
                source,
            }
        }
    })?;

    if output.status.success() {
        return Ok(());
    }

    Err(InstallError::Failed {
        command,
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[derive(Debug)]
pub struct InstallAttempt {
    pub ecosystem: Ecosystem,
    pub manifest: PathBuf,
    pub result: Result<(), InstallError>,
}

/// What the install stage did. An empty attempt list means nothing to install.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub attempts: Vec<InstallAttempt>,
}

impl InstallReport {
    pub fn nothing_to_install(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.attempts.iter().all(|a| a.result.is_ok())
    }
}

/// Runs every registered installer whose manifest exists in the tree.
///
/// Failures are collected, never propagated: installing dependencies is a
/// convenience on top of a successful download.
pub struct DependencyInstaller {
    installers: Vec<Box<dyn Installer>>,
}

impl DependencyInstaller {
    pub fn new(installers: Vec<Box<dyn Installer>>) -> Self {
        Self { installers }
    }

    /// Pip and npm, using the given Python interpreter.
    pub fn with_defaults(python: &str) -> Self {
        Self::new(vec![
            Box::new(PipInstaller::new(python)),
            Box::new(NpmInstaller::default()),
        ])
    }

    pub fn install_all(&self, root: &Path, sink: &dyn EventSink) -> InstallReport {
        let mut report = InstallReport::default();

        for installer in &self.installers {
            let ecosystem = installer.ecosystem();
            let Some(manifest) = sensor::find_file(root, installer.manifest_name()) else {
                log::debug!("no {} under {}", installer.manifest_name(), root.display());
                continue;
            };

            sink.emit(PipelineEvent::ManifestFound {
                ecosystem,
                path: manifest.clone(),
            });

            let result = installer.install(&manifest);
            if let Err(e) = &result {
                log::debug!("{} dependencies failed to install: {}", ecosystem, e);
            }
            sink.emit(PipelineEvent::InstallFinished {
                ecosystem,
                success: result.is_ok(),
                message: result.as_ref().err().map(|e| e.to_string()),
            });

            report.attempts.push(InstallAttempt {
                ecosystem,
                manifest,
                result,
            });
        }

        if report.nothing_to_install() {
            sink.emit(PipelineEvent::NothingToInstall);
        }
        report
    }
}
