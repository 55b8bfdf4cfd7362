use crate::events::{EventSink, PipelineEvent, Stage};
use crate::logger::Logger;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const SPINNER_TICK: Duration = Duration::from_millis(120);

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Renders pipeline events on the terminal: colored status lines plus one
/// spinner or progress bar for whichever stage is running.
#[derive(Default)]
pub struct TerminalSink {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(style("{spinner:.green} {msg}"));
        pb.set_message(message);
        pb.enable_steady_tick(SPINNER_TICK);
        pb
    }

    fn progress_bar(stage: Stage, total: Option<u64>) -> ProgressBar {
        match (stage, total) {
            (Stage::Download, Some(total)) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    style("{msg} [{bar:40.green/white}] {bytes}/{total_bytes} ({eta})")
                        .progress_chars("=> "),
                );
                pb.set_message(stage.label());
                pb
            }
            // No Content-Length: count bytes against a spinner.
            (Stage::Download, None) => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(style("{spinner:.green} {msg} {bytes}"));
                pb.set_message(stage.label());
                pb.enable_steady_tick(SPINNER_TICK);
                pb
            }
            (_, total) => {
                let pb = ProgressBar::new(total.unwrap_or(0));
                pb.set_style(style("{msg} [{bar:40.green/white}] {pos}/{len}").progress_chars("=> "));
                pb.set_message(stage.label());
                pb
            }
        }
    }

    /// Prints a line without tearing the active bar.
    fn print(&self, f: impl FnOnce()) {
        match self.bar.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }

    fn replace_bar(&self, next: Option<ProgressBar>) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(old) = bar.take() {
                old.finish_and_clear();
            }
            *bar = next;
        }
    }

    fn update_progress(&self, stage: Stage, done: u64, total: Option<u64>) {
        let Ok(mut bar) = self.bar.lock() else {
            return;
        };
        // The probe spinner is still up when the first download chunk lands.
        let needs_new = bar
            .as_ref()
            .is_none_or(|pb| pb.message() != stage.label());
        if needs_new {
            if let Some(old) = bar.take() {
                old.finish_and_clear();
            }
            *bar = Some(Self::progress_bar(stage, total));
        }
        if let Some(pb) = bar.as_ref() {
            pb.set_position(done);
        }
    }
}

impl EventSink for TerminalSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => match stage {
                Stage::Probe => {
                    self.replace_bar(Some(Self::spinner("Checking branches (main/master)...".into())))
                }
                Stage::Sense | Stage::Install => {
                    self.replace_bar(Some(Self::spinner(format!("{}...", stage.label()))))
                }
                Stage::Download | Stage::Extract => {}
            },
            PipelineEvent::BranchMissing { branch, status } => self.print(|| {
                Logger::warn(format!(
                    "Branch {} not available ({})",
                    Logger::highlight(&branch),
                    status
                ))
            }),
            PipelineEvent::BranchResolved { branch, url } => self.print(|| {
                Logger::success(format!(
                    "Found branch {} {}",
                    Logger::brand_text(&branch),
                    Logger::dim(&url)
                ))
            }),
            PipelineEvent::Progress { stage, done, total } => {
                self.update_progress(stage, done, total)
            }
            PipelineEvent::ArchiveSaved { path, bytes } => {
                self.replace_bar(None);
                Logger::success(format!(
                    "Downloaded {} to {}",
                    HumanBytes(bytes),
                    Logger::dim(path.display())
                ));
            }
            PipelineEvent::Extracted {
                destination,
                entries,
            } => {
                self.replace_bar(None);
                Logger::success(format!(
                    "Extracted {} entries into {}",
                    entries,
                    Logger::highlight(destination.display())
                ));
            }
            PipelineEvent::EnvironmentSensed {
                ecosystem,
                detected,
            } => self.print(|| {
                if detected {
                    Logger::success(format!(
                        "{} environment detected",
                        Logger::brand_text(ecosystem)
                    ));
                } else {
                    Logger::info(Logger::dim(format!("No {} files found", ecosystem)));
                }
            }),
            PipelineEvent::ManifestFound { ecosystem, path } => self.print(|| {
                Logger::info(format!(
                    "{} dependencies listed in {}",
                    ecosystem,
                    Logger::highlight(path.display())
                ))
            }),
            PipelineEvent::InstallFinished {
                ecosystem,
                success,
                message,
            } => self.print(|| {
                if success {
                    Logger::success(format!("{} dependencies installed", ecosystem));
                } else {
                    Logger::warn(format!(
                        "{} dependencies failed to install: {}",
                        ecosystem,
                        message.unwrap_or_default()
                    ));
                }
            }),
            PipelineEvent::NothingToInstall => {
                self.print(|| Logger::info("No dependencies to install."))
            }
            PipelineEvent::StageFinished { .. } | PipelineEvent::Failed { .. } => {
                self.replace_bar(None)
            }
        }
    }
}
