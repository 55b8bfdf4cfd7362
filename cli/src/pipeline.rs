//! The fetch pipeline: resolve branch, download, extract, sense, install.
//!
//! Stages run strictly one after another. Resolution, download and extraction
//! failures abort the run; sensing and installing are advisory and only ever
//! report what happened.

use crate::error::{ExtractError, FetchError};
use crate::events::{EventSink, PipelineEvent, Stage};
use crate::extract::{self, ExtractReport};
use crate::fetch::{self, FetchResult};
use crate::github::GithubClient;
use crate::installer::{DependencyInstaller, InstallReport};
use crate::layout::DestinationLayout;
use crate::repo::RepoRef;
use crate::sensor::{self, Ecosystem, EnvironmentClassification};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct PipelineReport {
    pub repo: RepoRef,
    pub branch: String,
    pub destination: PathBuf,
    pub archive_bytes: u64,
    pub entries: usize,
    pub environment: EnvironmentClassification,
    /// `None` when installing was disabled.
    pub install: Option<InstallReport>,
}

pub struct Pipeline {
    client: GithubClient,
    layout: DestinationLayout,
    archive_dir: PathBuf,
    ecosystems: Vec<Ecosystem>,
    installer: Option<Arc<DependencyInstaller>>,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    pub fn new(
        client: GithubClient,
        layout: DestinationLayout,
        archive_dir: impl Into<PathBuf>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            client,
            layout,
            archive_dir: archive_dir.into(),
            ecosystems: Ecosystem::ALL.to_vec(),
            installer: None,
            sink,
        }
    }

    pub fn with_installer(mut self, installer: DependencyInstaller) -> Self {
        self.installer = Some(Arc::new(installer));
        self
    }

    pub fn with_ecosystems(mut self, ecosystems: &[Ecosystem]) -> Self {
        self.ecosystems = ecosystems.to_vec();
        self
    }

    /// Runs the whole pipeline on a background task. Pair with a
    /// [`ChannelSink`](crate::events::ChannelSink) to follow progress from
    /// another task or thread.
    pub fn spawn(self, repo: RepoRef) -> JoinHandle<Result<PipelineReport, FetchError>> {
        tokio::spawn(async move { self.run(&repo).await })
    }

    pub async fn run(&self, repo: &RepoRef) -> Result<PipelineReport, FetchError> {
        match self.run_stages(repo).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.sink.emit(PipelineEvent::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_stages(&self, repo: &RepoRef) -> Result<PipelineReport, FetchError> {
        let sink = self.sink.as_ref();
        log::info!("fetching {}", repo);

        // 1. Resolve branch
        sink.emit(PipelineEvent::StageStarted {
            stage: Stage::Probe,
        });
        let resolved = self.client.resolve_branch(repo, sink).await?;
        sink.emit(PipelineEvent::StageFinished {
            stage: Stage::Probe,
        });

        // 2. Download
        sink.emit(PipelineEvent::StageStarted {
            stage: Stage::Download,
        });
        let archive_path = self
            .archive_dir
            .join(repo.archive_file_name(&resolved.branch));
        let fetched = fetch::download_archive(resolved, &archive_path, sink).await?;
        sink.emit(PipelineEvent::StageFinished {
            stage: Stage::Download,
        });

        // 3. Extract
        sink.emit(PipelineEvent::StageStarted {
            stage: Stage::Extract,
        });
        let destination = self.layout.destination(repo);
        let extracted = self.extract(fetched.clone(), destination).await?;
        sink.emit(PipelineEvent::StageFinished {
            stage: Stage::Extract,
        });

        // 4. Sense
        sink.emit(PipelineEvent::StageStarted {
            stage: Stage::Sense,
        });
        let environment = self.sense(extracted.destination.clone()).await;
        for ecosystem in &self.ecosystems {
            sink.emit(PipelineEvent::EnvironmentSensed {
                ecosystem: *ecosystem,
                detected: environment.is_detected(*ecosystem),
            });
        }
        sink.emit(PipelineEvent::StageFinished {
            stage: Stage::Sense,
        });

        // 5. Install
        let install = match &self.installer {
            Some(installer) => {
                sink.emit(PipelineEvent::StageStarted {
                    stage: Stage::Install,
                });
                let report = self
                    .install(installer.clone(), extracted.destination.clone())
                    .await;
                sink.emit(PipelineEvent::StageFinished {
                    stage: Stage::Install,
                });
                report
            }
            None => None,
        };

        Ok(PipelineReport {
            repo: repo.clone(),
            branch: fetched.resolved_branch,
            destination: extracted.destination,
            archive_bytes: fetched.size_bytes,
            entries: extracted.entries,
            environment,
            install,
        })
    }

    async fn extract(
        &self,
        fetched: FetchResult,
        destination: PathBuf,
    ) -> Result<ExtractReport, FetchError> {
        let sink = self.sink.clone();
        let report = tokio::task::spawn_blocking(move || {
            extract::extract_archive(&fetched, &destination, sink.as_ref())
        })
        .await
        .map_err(|e| ExtractError::Worker(e.to_string()))??;
        Ok(report)
    }

    async fn sense(&self, root: PathBuf) -> EnvironmentClassification {
        let ecosystems = self.ecosystems.clone();
        tokio::task::spawn_blocking(move || sensor::sense_environment(&root, &ecosystems))
            .await
            .unwrap_or_else(|e| {
                log::warn!("environment sensing stopped: {}", e);
                EnvironmentClassification::default()
            })
    }

    async fn install(
        &self,
        installer: Arc<DependencyInstaller>,
        root: PathBuf,
    ) -> Option<InstallReport> {
        let sink = self.sink.clone();
        match tokio::task::spawn_blocking(move || installer.install_all(&root, sink.as_ref())).await
        {
            Ok(report) => Some(report),
            Err(e) => {
                log::warn!("dependency installation stopped: {}", e);
                None
            }
        }
    }
}
