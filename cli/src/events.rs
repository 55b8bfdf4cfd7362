//! Progress events emitted by the fetch pipeline.
//!
//! The pipeline never prints anything itself. Each stage reports what it is
//! doing through an [`EventSink`], and whatever front end is attached (the
//! terminal renderer, a JSON line stream, a channel feeding a UI thread)
//! decides how to present it.

use crate::sensor::Ecosystem;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Probe,
    Download,
    Extract,
    Sense,
    Install,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Probe => "Resolving branch",
            Self::Download => "Downloading",
            Self::Extract => "Extracting",
            Self::Sense => "Inspecting",
            Self::Install => "Installing dependencies",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: Stage,
    },
    /// A candidate branch answered with a non-success status.
    BranchMissing {
        branch: String,
        status: u16,
    },
    BranchResolved {
        branch: String,
        url: String,
    },
    /// `total` is `None` when the amount of work is unknown up front, e.g. a
    /// download without a `Content-Length`.
    Progress {
        stage: Stage,
        done: u64,
        total: Option<u64>,
    },
    ArchiveSaved {
        path: PathBuf,
        bytes: u64,
    },
    Extracted {
        destination: PathBuf,
        entries: usize,
    },
    EnvironmentSensed {
        ecosystem: Ecosystem,
        detected: bool,
    },
    ManifestFound {
        ecosystem: Ecosystem,
        path: PathBuf,
    },
    InstallFinished {
        ecosystem: Ecosystem,
        success: bool,
        message: Option<String>,
    },
    NothingToInstall,
    StageFinished {
        stage: Stage,
    },
    Failed {
        kind: String,
        message: String,
    },
}

impl PipelineEvent {
    /// Fraction of the current stage completed, if the event carries one.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Progress {
                done,
                total: Some(total),
                ..
            } if *total > 0 => Some((*done as f64 / *total as f64).min(1.0)),
            _ => None,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

impl<F> EventSink for F
where
    F: Fn(PipelineEvent) + Send + Sync,
{
    fn emit(&self, event: PipelineEvent) {
        self(event)
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Forwards events to a channel, for consumers running on another task or
/// thread. Events sent after the receiver is gone are dropped.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes each event as one JSON object per line.
pub struct JsonSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventSink for JsonSink<W> {
    fn emit(&self, event: PipelineEvent) {
        let Ok(line) = serde_json::to_string(&event) else {
            return;
        };
        if let Ok(mut out) = self.out.lock() {
            if let Err(e) = writeln!(out, "{}", line) {
                log::warn!("dropping event, could not write: {}", e);
            }
        }
    }
}
