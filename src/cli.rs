use std::path::PathBuf;

use clap::Parser;

use crate::batch::{BatchEvent, BatchOrchestrator, BatchSettings, StatusMessage};
use crate::config::AppConfig;
use crate::errors::{HighlightError, HighlightResult};
use crate::upload::collect_disk_files;

/// Draw every leaf element of a UI layout dump over its matching screenshot.
#[derive(Debug, Parser)]
#[command(name = "layout-highlighter", version, about)]
pub struct Cli {
    /// Layout dump files or directories (e.g. uiautomator XML).
    #[arg(long = "dumps", required = true, num_args = 1..)]
    pub dumps: Vec<PathBuf>,

    /// Screenshot files or directories.
    #[arg(long = "screenshots", required = true, num_args = 1..)]
    pub screenshots: Vec<PathBuf>,

    /// Output directory; defaults to `export.output_dir` from the config.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Explicit config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Refuse to run when two dumps share a base name.
    #[arg(long)]
    pub strict_names: bool,
}

/// Run one batch from the command line. Returns the final status.
pub async fn execute(cli: Cli, mut config: AppConfig) -> HighlightResult<StatusMessage> {
    if cli.strict_names {
        config.batch.strict_names = true;
    }
    let out_dir = cli.out.clone().unwrap_or_else(|| config.export.output_dir.clone());

    let orchestrator = BatchOrchestrator::new(BatchSettings::from_config(&config)?);
    let mut events = orchestrator.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                BatchEvent::StatusChanged { status } => {
                    tracing::debug!(?status, "status changed");
                }
                BatchEvent::PairStarted { name, .. } => {
                    tracing::info!(name = %name, "generating highlights");
                }
                BatchEvent::PairCompleted { name, width, height, .. } => {
                    tracing::info!(name = %name, width, height, "highlights ready");
                }
                BatchEvent::PairFailed { name, reason, .. } => {
                    tracing::error!(name = %name, reason = %reason, "highlights failed");
                }
                BatchEvent::RunFinished { generation, status } => {
                    tracing::info!(generation, ?status, "run finished");
                }
            }
        }
    });

    let dumps = collect_disk_files(&cli.dumps)?;
    let screenshots = collect_disk_files(&cli.screenshots)?;
    let status = orchestrator.set_uploads(dumps, screenshots).await;
    println!("{status}");

    let final_status = if status.allows_run() {
        let summary = orchestrator.run().await?;
        println!("{}", summary.status);
        for failure in &summary.failed {
            eprintln!("{}: {}", failure.name, failure.reason);
        }
        // Aborted runs leave their placeholders behind.
        for result in orchestrator.results().await {
            if let Some(text) = result.placeholder_text() {
                println!("{text}");
            }
        }
        match orchestrator.export(&out_dir).await {
            Ok(manifest) => {
                println!(
                    "Wrote {} image(s) to {}",
                    manifest.images.len(),
                    out_dir.display()
                );
            }
            Err(HighlightError::NothingToExport) => {
                tracing::warn!("no highlights to export");
            }
            Err(e) => return Err(e),
        }
        summary.status
    } else {
        status
    };

    // Dropping the orchestrator closes the bus; the logger drains what is queued.
    drop(orchestrator);
    if let Err(e) = logger.await {
        tracing::warn!(error = %e, "event logger ended abnormally");
    }
    Ok(final_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn parses_multiple_paths() {
        let cli = Cli::try_parse_from([
            "layout-highlighter",
            "--dumps",
            "a.xml",
            "b.xml",
            "--screenshots",
            "shots/",
            "--strict-names",
        ])
        .unwrap();
        assert_eq!(cli.dumps.len(), 2);
        assert_eq!(cli.screenshots, vec![PathBuf::from("shots/")]);
        assert!(cli.strict_names);
        assert!(cli.out.is_none());
    }

    #[test]
    fn both_groups_are_required() {
        assert!(Cli::try_parse_from(["layout-highlighter", "--dumps", "a.xml"]).is_err());
    }

    #[tokio::test]
    async fn mismatched_counts_stop_before_running() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), "<hierarchy/>").unwrap();
        std::fs::write(dir.path().join("b.xml"), "<hierarchy/>").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();

        let cli = Cli::try_parse_from([
            OsString::from("layout-highlighter"),
            OsString::from("--dumps"),
            dir.path().join("a.xml").into_os_string(),
            dir.path().join("b.xml").into_os_string(),
            OsString::from("--screenshots"),
            dir.path().join("a.png").into_os_string(),
        ])
        .unwrap();
        let status = execute(cli, AppConfig::default()).await.unwrap();
        assert_eq!(status, StatusMessage::FileCountMismatch);
    }

    #[tokio::test]
    async fn completed_run_exports_and_returns_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::write(dir.path().join("a.xml"), r#"<node bounds="[0,0][3,3]"/>"#).unwrap();
        image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]))
            .save(dir.path().join("a.png"))
            .unwrap();

        let cli = Cli::try_parse_from([
            OsString::from("layout-highlighter"),
            OsString::from("--dumps"),
            dir.path().join("a.xml").into_os_string(),
            OsString::from("--screenshots"),
            dir.path().join("a.png").into_os_string(),
            OsString::from("--out"),
            out.clone().into_os_string(),
        ])
        .unwrap();

        // The 2 s status clear must not hold up the event logger.
        let status = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            execute(cli, AppConfig::default()),
        )
        .await
        .expect("execute should not wait for the status clear")
        .unwrap();
        assert_eq!(status, StatusMessage::Done);
        assert!(out.join("a.png").exists());
        assert!(out.join(crate::export::MANIFEST_FILE).exists());
    }
}
