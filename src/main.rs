use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crosscheck::api::{AnalysisService, ApiClient, FileKind, FileUpload};
use crosscheck::cli::{Cli, Command};
use crosscheck::config::CrossCheckConfig;
use crosscheck::orchestrator::JobOrchestrator;
use crosscheck::polling::PollingEngine;
use crosscheck::state_machine::AnalysisStatus;
use crosscheck::{report, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = CrossCheckConfig::load()?;
    if let Some(base) = &cli.api_base {
        config.api_base = base.clone();
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    config.validate()?;

    let client = ApiClient::from_config(&config)?;
    info!(api_base = %client.base_url(), "using analysis service");

    match cli.command {
        Command::Sessions { export } => {
            let sessions = client.list_sessions().await?;
            ui::print_sessions(&sessions);
            if let Some(dir) = export_dir(export, &config) {
                for job in sessions.iter().flat_map(|s| &s.analysis_jobs) {
                    let path = report::export_csv(job, &dir)?;
                    println!("Report written to {}", path.display());
                }
            }
            Ok(())
        }
        Command::Analyze {
            traveler,
            image,
            bom,
            session,
            name,
            export,
        } => {
            let inputs = [
                (FileKind::Traveler, traveler.into_iter().collect::<Vec<_>>()),
                (FileKind::Image, image.into_iter().collect()),
                (FileKind::Bom, bom),
            ];
            let export = export_dir(export, &config);
            analyze(Arc::new(client), &config, inputs, session, name, export).await
        }
        Command::Status { job_id } => {
            let status = client.get_status(&job_id).await?;
            println!("{} {}", status.job_id, status.status);
            Ok(())
        }
        Command::Results { job_id, export } => {
            let result = client.get_results(&job_id).await?;
            ui::print_result(&result);
            if let Some(dir) = export_dir(export, &config) {
                let path = report::export_csv(&result, &dir)?;
                println!("Report written to {}", path.display());
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "crosscheck=debug"
    } else {
        "crosscheck=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// `--export` alone means the configured output directory.
fn export_dir(flag: Option<Option<PathBuf>>, config: &CrossCheckConfig) -> Option<PathBuf> {
    flag.map(|dir| dir.unwrap_or_else(|| PathBuf::from(&config.output_dir)))
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<FileUpload>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = FileUpload::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

async fn analyze(
    client: Arc<ApiClient>,
    config: &CrossCheckConfig,
    inputs: [(FileKind, Vec<PathBuf>); 3],
    session: Option<String>,
    name: Option<String>,
    export: Option<PathBuf>,
) -> Result<()> {
    let mut orch = JobOrchestrator::new(client, PollingEngine::new(config.poll_interval()));
    if let Some(id) = session {
        orch = orch.with_session(id);
    } else if let Some(name) = name {
        orch.create_named_session(&name).await?;
    }

    let progress = ui::AnalysisProgress::start("uploading documents");
    for (kind, paths) in inputs {
        if paths.is_empty() {
            continue;
        }
        let files = read_files(&paths).await?;
        let report = match orch.upload(files, kind).await {
            Ok(report) => report,
            Err(err) => {
                progress.finish(orch.job(), orch.error());
                return Err(err.into());
            }
        };
        for file in &report.added {
            progress.note(&format!("uploaded {kind} {} ({})", file.filename, file.id));
        }
        if report.dropped > 0 {
            progress.warn(&format!("ignored {} extra {kind} file(s)", report.dropped));
        }
        for (filename, err) in &report.failures {
            progress.warn(&format!("{filename}: {err}"));
        }
    }

    let job_id = match orch.start_analysis().await {
        Ok(job_id) => job_id,
        Err(err) => {
            progress.finish(orch.job(), orch.error());
            return Err(err.into());
        }
    };
    progress.note(&format!("job {job_id} started"));

    let mut updates = orch.subscribe();
    let watcher = progress.clone();
    let render = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            watcher.update(&snapshot);
        }
    });

    let settled = tokio::select! {
        status = orch.wait_until_settled() => Some(status),
        _ = tokio::signal::ctrl_c() => None,
    };
    render.abort();

    let Some(status) = settled else {
        orch.detach();
        progress.finish(
            orch.job(),
            Some("interrupted; the job keeps running on the server"),
        );
        println!("Check it later with: crosscheck status {job_id}");
        return Ok(());
    };

    progress.finish(orch.job(), orch.error());
    if let Some(result) = orch.result() {
        ui::print_result(result);
        if let Some(dir) = export {
            let path = write_report(result, &dir)?;
            println!("Report written to {}", path.display());
        }
    }

    if status == AnalysisStatus::Failed {
        bail!("analysis {job_id} failed");
    }
    Ok(())
}

fn write_report(result: &crosscheck::api::AnalysisResult, dir: &Path) -> Result<PathBuf> {
    report::export_csv(result, dir)
        .with_context(|| format!("failed to write report to {}", dir.display()))
}
