//! End-to-end runs of the fetch pipeline against an in-process stand-in for
//! GitHub's archive endpoint.

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use gitdown::error::{FetchError, InstallError};
use gitdown::events::{ChannelSink, NullSink, PipelineEvent, Stage};
use gitdown::github::GithubClient;
use gitdown::installer::{DependencyInstaller, Installer};
use gitdown::layout::DestinationLayout;
use gitdown::sensor::Ecosystem;
use gitdown::{Pipeline, RepoRef};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

#[derive(Clone, Default)]
struct MockGithub {
    archives: Arc<HashMap<String, Vec<u8>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

async fn serve_archive(State(github): State<MockGithub>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    github.requests.lock().unwrap().push(path.clone());
    match github.archives.get(&path) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Starts the mock server with archives keyed by `(owner, repo, branch)`.
async fn spawn_github(archives: Vec<(&str, &str, &str, Vec<u8>)>) -> (String, MockGithub) {
    let archives: HashMap<String, Vec<u8>> = archives
        .into_iter()
        .map(|(owner, repo, branch, bytes)| {
            (
                format!("/{}/{}/archive/refs/heads/{}.zip", owner, repo, branch),
                bytes,
            )
        })
        .collect();
    let github = MockGithub {
        archives: Arc::new(archives),
        requests: Arc::default(),
    };

    let app = Router::new()
        .fallback(serve_archive)
        .with_state(github.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock github");
    let addr = listener.local_addr().expect("mock github address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock github stopped");
    });

    (format!("http://{}", addr), github)
}

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

struct RecordingInstaller {
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl Installer for RecordingInstaller {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn install(&self, manifest: &Path) -> Result<(), InstallError> {
        self.calls.lock().unwrap().push(manifest.to_path_buf());
        Ok(())
    }
}

struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().unwrap(),
        }
    }

    fn downloads(&self) -> PathBuf {
        self.tmp.path().join("downloads")
    }

    fn archives(&self) -> PathBuf {
        self.tmp.path().join("work")
    }

    fn pipeline(&self, base_url: &str) -> Pipeline {
        let client = GithubClient::new(base_url, Some(std::time::Duration::from_secs(10))).unwrap();
        Pipeline::new(
            client,
            DestinationLayout::new(self.downloads()),
            self.archives(),
            Arc::new(NullSink),
        )
    }

    fn archive_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.archives()) {
            Ok(entries) => entries.filter_map(Result::ok).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[tokio::test]
async fn main_branch_is_fetched_extracted_and_sensed() {
    let archive = zip_bytes(&[
        ("widget-main/README.md", "# widget"),
        ("widget-main/app.py", "print('widget')"),
    ]);
    let archive_len = archive.len() as u64;
    let (base_url, github) = spawn_github(vec![("acme", "widget", "main", archive)]).await;
    let ws = Workspace::new();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let installer = DependencyInstaller::new(vec![Box::new(RecordingInstaller {
        calls: calls.clone(),
    })]);
    let repo = RepoRef::new("acme", "widget").unwrap();

    let report = ws
        .pipeline(&base_url)
        .with_installer(installer)
        .run(&repo)
        .await
        .unwrap();

    let destination = ws.downloads().join("GitDown").join("acme--widget");
    assert_eq!(report.branch, "main");
    assert_eq!(report.destination, destination);
    assert_eq!(report.archive_bytes, archive_len);
    assert_eq!(report.entries, 2);
    assert!(destination.join("widget-main/README.md").is_file());
    assert!(destination.join("widget-main/app.py").is_file());
    assert!(report.environment.is_detected(Ecosystem::Python));

    // The zip is gone once extracted.
    assert!(ws.archive_files().is_empty());

    // No requirements.txt in the archive.
    assert!(report.install.unwrap().nothing_to_install());
    assert!(calls.lock().unwrap().is_empty());

    assert_eq!(
        *github.requests.lock().unwrap(),
        vec!["/acme/widget/archive/refs/heads/main.zip"]
    );
}

#[tokio::test]
async fn falls_back_to_master_when_main_is_missing() {
    let archive = zip_bytes(&[("legacy-master/index.js", "module.exports = 1;")]);
    let (base_url, github) = spawn_github(vec![("acme", "legacy", "master", archive)]).await;
    let ws = Workspace::new();
    let repo = RepoRef::new("acme", "legacy").unwrap();

    let report = ws.pipeline(&base_url).run(&repo).await.unwrap();

    assert_eq!(report.branch, "master");
    assert!(report.environment.is_detected(Ecosystem::Node));
    assert!(!report.environment.is_detected(Ecosystem::Python));
    assert!(report.install.is_none());
    assert_eq!(
        *github.requests.lock().unwrap(),
        vec![
            "/acme/legacy/archive/refs/heads/main.zip",
            "/acme/legacy/archive/refs/heads/master.zip",
        ]
    );
}

#[tokio::test]
async fn missing_branches_abort_without_creating_an_archive() {
    let (base_url, github) = spawn_github(Vec::new()).await;
    let ws = Workspace::new();
    let repo = RepoRef::new("acme", "ghost").unwrap();

    let err = ws.pipeline(&base_url).run(&repo).await.unwrap_err();

    match err {
        FetchError::BranchNotFound { owner, repo, tried } => {
            assert_eq!(owner, "acme");
            assert_eq!(repo, "ghost");
            assert_eq!(tried, vec!["main", "master"]);
        }
        other => panic!("expected BranchNotFound, got {other:?}"),
    }
    assert_eq!(github.requests.lock().unwrap().len(), 2);
    assert!(ws.archive_files().is_empty());
    assert!(!ws.downloads().join("GitDown").join("acme--ghost").exists());
}

#[tokio::test]
async fn transport_failure_stops_before_trying_master() {
    // Grab a free port, then close it so every connection is refused.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let ws = Workspace::new();
    let repo = RepoRef::new("acme", "widget").unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();
    let client = GithubClient::new(&format!("http://{}", addr), None).unwrap();
    let pipeline = Pipeline::new(
        client,
        DestinationLayout::new(ws.downloads()),
        ws.archives(),
        Arc::new(move |e: PipelineEvent| recorded.lock().unwrap().push(e)),
    );

    let err = pipeline.run(&repo).await.unwrap_err();

    match &err {
        FetchError::Transport { url, .. } => assert!(url.ends_with("/main.zip")),
        other => panic!("expected Transport, got {other:?}"),
    }
    let events = events.lock().unwrap();
    assert!(!events.iter().any(|e| matches!(e, PipelineEvent::BranchMissing { .. })));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Failed { kind, .. }) if kind == "transport"
    ));
}

#[tokio::test]
async fn tree_without_markers_has_nothing_to_install() {
    let archive = zip_bytes(&[("empty-main/README.md", "nothing here")]);
    let (base_url, _github) = spawn_github(vec![("acme", "empty", "main", archive)]).await;
    let ws = Workspace::new();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let installer = DependencyInstaller::new(vec![Box::new(RecordingInstaller {
        calls: calls.clone(),
    })]);
    let repo = RepoRef::new("acme", "empty").unwrap();

    let report = ws
        .pipeline(&base_url)
        .with_installer(installer)
        .run(&repo)
        .await
        .unwrap();

    assert!(report.environment.detected.is_empty());
    assert!(report.install.unwrap().nothing_to_install());
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn requirements_are_handed_to_the_installer() {
    let archive = zip_bytes(&[
        ("tool-main/tool.py", "import requests"),
        ("tool-main/requirements.txt", "requests\n"),
    ]);
    let (base_url, _github) = spawn_github(vec![("acme", "tool", "main", archive)]).await;
    let ws = Workspace::new();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let installer = DependencyInstaller::new(vec![Box::new(RecordingInstaller {
        calls: calls.clone(),
    })]);
    let repo = RepoRef::new("acme", "tool").unwrap();

    let report = ws
        .pipeline(&base_url)
        .with_installer(installer)
        .run(&repo)
        .await
        .unwrap();

    let expected = report.destination.join("tool-main").join("requirements.txt");
    assert_eq!(*calls.lock().unwrap(), vec![expected]);
    assert!(report.install.unwrap().all_succeeded());
}

#[tokio::test]
async fn repeated_runs_reuse_the_same_destination() {
    let archive = zip_bytes(&[("widget-main/app.py", "v1")]);
    let (base_url, _github) = spawn_github(vec![("acme", "widget", "main", archive)]).await;
    let ws = Workspace::new();
    let repo = RepoRef::new("acme", "widget").unwrap();

    let first = ws.pipeline(&base_url).run(&repo).await.unwrap();
    std::fs::write(first.destination.join("local-notes.txt"), "keep me").unwrap();
    let second = ws.pipeline(&base_url).run(&repo).await.unwrap();

    assert_eq!(first.destination, second.destination);
    assert!(second.destination.join("local-notes.txt").exists());
}

#[tokio::test]
async fn background_run_streams_events_over_a_channel() {
    let archive = zip_bytes(&[("widget-main/app.py", "print(1)")]);
    let (base_url, _github) = spawn_github(vec![("acme", "widget", "main", archive)]).await;
    let ws = Workspace::new();
    let repo = RepoRef::new("acme", "widget").unwrap();

    let (sink, mut rx) = ChannelSink::new();
    let client = GithubClient::new(&base_url, None).unwrap();
    let pipeline = Pipeline::new(
        client,
        DestinationLayout::new(ws.downloads()),
        ws.archives(),
        Arc::new(sink),
    )
    .with_ecosystems(&[Ecosystem::Python]);

    let handle = pipeline.spawn(repo);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.entries, 1);

    let stages: Vec<Stage> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageStarted { stage } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![Stage::Probe, Stage::Download, Stage::Extract, Stage::Sense]
    );

    let last_download = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Progress { stage: Stage::Download, .. }))
        .last()
        .and_then(PipelineEvent::fraction);
    assert_eq!(last_download, Some(1.0));

    assert!(events.contains(&PipelineEvent::EnvironmentSensed {
        ecosystem: Ecosystem::Python,
        detected: true,
    }));
}

/// Serves the same raw HTTP response to every connection, then closes it.
/// Lets a test control headers and cut the body short, which axum won't.
async fn spawn_raw_responder(head: String, body: Vec<u8>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind raw responder");
    let addr = listener.local_addr().expect("raw responder address");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn download_without_content_length_reports_unknown_total() {
    let archive = zip_bytes(&[("widget-main/app.py", "print('no length')")]);
    let expected_len = archive.len() as u64;
    let base_url = spawn_raw_responder(
        "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nConnection: close\r\n\r\n".into(),
        archive,
    )
    .await;
    let ws = Workspace::new();
    let repo = RepoRef::new("acme", "widget").unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();
    let client = GithubClient::new(&base_url, Some(std::time::Duration::from_secs(10))).unwrap();
    let pipeline = Pipeline::new(
        client,
        DestinationLayout::new(ws.downloads()),
        ws.archives(),
        Arc::new(move |e: PipelineEvent| recorded.lock().unwrap().push(e)),
    );

    let report = pipeline.run(&repo).await.unwrap();

    assert_eq!(report.archive_bytes, expected_len);
    assert!(report.destination.join("widget-main/app.py").is_file());

    let events = events.lock().unwrap();
    let totals: Vec<Option<u64>> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress {
                stage: Stage::Download,
                total,
                ..
            } => Some(*total),
            _ => None,
        })
        .collect();
    assert!(!totals.is_empty());
    assert!(totals.iter().all(Option::is_none));
    assert!(events.contains(&PipelineEvent::ArchiveSaved {
        path: ws.archives().join("widget_main.zip"),
        bytes: expected_len,
    }));
}

#[tokio::test]
async fn interrupted_download_is_a_transport_error_and_keeps_the_partial_file() {
    let archive = zip_bytes(&[("widget-main/app.py", "print('cut short')")]);
    let declared = archive.len();
    let base_url = spawn_raw_responder(
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            declared
        ),
        archive[..20].to_vec(),
    )
    .await;
    let ws = Workspace::new();
    let repo = RepoRef::new("acme", "widget").unwrap();

    let err = ws.pipeline(&base_url).run(&repo).await.unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }), "got {err:?}");
    let partial = ws.archives().join("widget_main.zip");
    assert!(partial.is_file());
    assert!(std::fs::metadata(&partial).unwrap().len() < declared as u64);
    assert!(!ws.downloads().join("GitDown").join("acme--widget").exists());
}
