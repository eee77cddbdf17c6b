//! Interface de terminal do crosscheck: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`AnalysisProgress`] acompanha visualmente
//! um job de análise no terminal e assina os snapshots do orquestrador.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::{AnalysisResult, CheckStatus, Session};
use crate::orchestrator::Snapshot;
use crate::report::{CheckSummary, format_timestamp};
use crate::state_machine::{AnalysisJob, AnalysisStatus};

/// Indicador visual de progresso para um job de análise.
///
/// Exibe um spinner animado enquanto o job está em processamento e mensagens
/// coloridas para conclusão (verde), falha (vermelho) e avisos (amarelo).
#[derive(Clone)]
pub struct AnalysisProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl AnalysisProgress {
    /// Inicia o spinner com a mensagem inicial.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem do spinner a partir de um snapshot.
    pub fn update(&self, snapshot: &Snapshot) {
        let job = snapshot.job_id.as_deref().unwrap_or("-");
        self.pb
            .set_message(format!("{} (job {job})", snapshot.status));
    }

    /// Exibe uma linha acima do spinner.
    pub fn note(&self, message: &str) {
        self.pb.println(format!("  {message}"));
    }

    /// Exibe um aviso em amarelo acima do spinner.
    pub fn warn(&self, message: &str) {
        self.pb
            .println(format!("  {} {message}", self.yellow.apply_to("!")));
    }

    /// Finaliza o spinner e exibe o status final do job, com a duração
    /// quando o serviço chegou a aceitá-lo.
    pub fn finish(&self, job: &AnalysisJob, error: Option<&str>) {
        self.pb.finish_and_clear();
        let elapsed = job
            .elapsed_ms()
            .map(|ms| format!(" in {:.1}s", ms as f64 / 1000.0))
            .unwrap_or_default();
        match job.status {
            AnalysisStatus::Completed => {
                println!("  {} Analysis completed{elapsed}", self.green.apply_to("✓"));
            }
            AnalysisStatus::Failed => {
                println!("  {} Analysis failed{elapsed}", self.red.apply_to("✗"));
            }
            other => println!("  {} Analysis {other}", self.yellow.apply_to("…")),
        }
        if let Some(err) = error {
            println!("  {} {err}", self.red.apply_to("Error:"));
        }
    }
}

fn status_style(status: CheckStatus) -> Style {
    match status {
        CheckStatus::Pass => Style::new().green(),
        CheckStatus::Warning => Style::new().yellow(),
        CheckStatus::Fail => Style::new().red().bold(),
    }
}

/// Imprime a tabela de verificações de um resultado.
pub fn print_result(result: &AnalysisResult) {
    let summary = CheckSummary::of(result);
    let header = Style::new().bold();
    println!();
    println!(
        "{}",
        header.apply_to(format!(
            "─── Job {} ({}) ───",
            result.job_id, result.overall_status
        ))
    );
    println!(
        "  created {}  coverage: traveler={} image={} boms={}",
        format_timestamp(&result.created_at),
        result.file_coverage.traveler,
        result.file_coverage.image,
        result.file_coverage.boms
    );
    println!(
        "  {} pass, {} warning, {} fail",
        summary.pass, summary.warning, summary.fail
    );

    for check in &result.checks {
        let status = status_style(check.status).apply_to(format!("{:<7}", check.status.as_str().to_uppercase()));
        let sources = check.sources_compared.join(" vs ");
        println!("  {status} {}  [{sources}]", check.check_type);
        println!("          expected: {}  actual: {}", check.expected, check.actual);
        if let Some(details) = &check.expanded_details {
            println!(
                "          full expected: {}  full actual: {}",
                details.expected_value, details.actual_value
            );
        }
        if let Some(notes) = &check.notes {
            println!("          {notes}");
        }
    }
}

/// Imprime o histórico de sessões.
pub fn print_sessions(sessions: &[Session]) {
    if sessions.is_empty() {
        println!("No sessions found");
        return;
    }
    let bold = Style::new().bold();
    for session in sessions {
        println!(
            "{}  {}  {} analysis job(s)",
            bold.apply_to(session.display_name()),
            format_timestamp(&session.created_at),
            session.analysis_jobs.len()
        );
        for job in &session.analysis_jobs {
            let summary = CheckSummary::of(job);
            println!(
                "  {}  {}  {} checks ({} fail)",
                job.job_id,
                job.overall_status,
                summary.total(),
                summary.fail
            );
        }
    }
}
