use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use gitdown::cli::{Cli, OutputFormat};
use gitdown::config::Config;
use gitdown::events::{EventSink, JsonSink};
use gitdown::github::GithubClient;
use gitdown::installer::DependencyInstaller;
use gitdown::layout::{self, DestinationLayout};
use gitdown::logger::Logger;
use gitdown::progress::TerminalSink;
use gitdown::{Pipeline, PipelineReport, RepoRef};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "gitdown=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli).await {
        Logger::error(format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.downloads_dir {
        config.downloads_dir = Some(dir);
    }
    if let Some(dir) = cli.archive_dir {
        config.archive_dir = Some(dir);
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = Some(secs);
    }
    if cli.no_install {
        config.install = false;
    }

    let repo = RepoRef::new(&cli.owner, &cli.repo)?;

    let downloads_root = match config.downloads_dir.clone() {
        Some(dir) => dir,
        None => layout::default_downloads_dir()
            .context("Could not determine your downloads folder; pass --downloads-dir")?,
    };
    let layout = DestinationLayout::new(downloads_root).with_app_dir(&config.app_dir);

    let archive_dir = match config.archive_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let client = GithubClient::new(
        &config.github_url,
        config.timeout_secs.map(Duration::from_secs),
    )?;

    let human = cli.format == OutputFormat::Human;
    let sink: Arc<dyn EventSink> = if human {
        Arc::new(TerminalSink::new())
    } else {
        Arc::new(JsonSink::new(std::io::stdout()))
    };

    let mut pipeline = Pipeline::new(client, layout, archive_dir, sink);
    if config.install {
        pipeline = pipeline.with_installer(DependencyInstaller::with_defaults(&config.python));
    }

    if human {
        Logger::banner();
        Logger::command("[SERVER]", format!("github/{}", repo));
    }

    let report = pipeline.run(&repo).await?;

    if human {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    Logger::header("Download complete");

    let environment = if report.environment.detected.is_empty() {
        "unknown".to_string()
    } else {
        report
            .environment
            .detected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let dependencies = match &report.install {
        None => "skipped".to_string(),
        Some(install) if install.nothing_to_install() => "none found".to_string(),
        Some(install) if install.all_succeeded() => "installed".to_string(),
        Some(_) => "failed (see above)".to_string(),
    };

    let mut table = Table::new();
    table.set_header(vec!["Repository", "Branch", "Entries", "Environment", "Dependencies"]);
    table.add_row(vec![
        report.repo.to_string(),
        report.branch.clone(),
        report.entries.to_string(),
        environment,
        dependencies,
    ]);
    println!("{}", table);

    Logger::success(format!(
        "Files ready in {}",
        Logger::highlight(report.destination.display())
    ));
}
