//! Interface de linha de comando do crosscheck baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (sessions, analyze,
//! status, results) e flags globais (--api-base, --poll-interval-ms, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// crosscheck: validação cruzada de documentos de fabricação.
#[derive(Debug, Parser)]
#[command(name = "crosscheck", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base do serviço de análise (sobrescreve crosscheck.toml e o ambiente).
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Intervalo entre consultas de status, em milissegundos.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lista as sessões e seus jobs de análise.
    Sessions {
        /// Grava um relatório CSV para cada job histórico (padrão: output_dir).
        #[arg(long, value_name = "DIR", num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },

    /// Envia os documentos, inicia a análise e acompanha até o fim.
    Analyze {
        /// Traveler de fabricação (.pdf).
        #[arg(long)]
        traveler: Option<PathBuf>,

        /// Imagem do produto (.jpg, .jpeg, .png).
        #[arg(long)]
        image: Option<PathBuf>,

        /// Planilha BOM (.xlsx, .xlsm); pode ser repetida até quatro vezes.
        #[arg(long)]
        bom: Vec<PathBuf>,

        /// Reutiliza uma sessão existente em vez de criar uma nova.
        #[arg(long)]
        session: Option<String>,

        /// Nome da sessão criada para esta análise.
        #[arg(long, conflicts_with = "session")]
        name: Option<String>,

        /// Grava o relatório CSV ao concluir (padrão: output_dir).
        #[arg(long, value_name = "DIR", num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },

    /// Mostra o status de um job.
    Status {
        /// Identificador do job.
        job_id: String,
    },

    /// Busca os resultados de um job concluído.
    Results {
        /// Identificador do job.
        job_id: String,

        /// Grava o relatório CSV (padrão: output_dir).
        #[arg(long, value_name = "DIR", num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_analyze_subcommand() {
        let cli = Cli::parse_from([
            "crosscheck",
            "analyze",
            "--traveler",
            "t.pdf",
            "--bom",
            "a.xlsx",
            "--bom",
            "b.xlsx",
            "--export",
            "out",
        ]);
        match cli.command {
            Command::Analyze {
                traveler,
                image,
                bom,
                session,
                export,
                ..
            } => {
                assert_eq!(traveler.unwrap(), PathBuf::from("t.pdf"));
                assert!(image.is_none());
                assert_eq!(bom.len(), 2);
                assert!(session.is_none());
                assert_eq!(export, Some(Some(PathBuf::from("out"))));
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "crosscheck",
            "--api-base",
            "https://qc.example.test",
            "--poll-interval-ms",
            "500",
            "--verbose",
            "sessions",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.api_base.as_deref(), Some("https://qc.example.test"));
        assert_eq!(cli.poll_interval_ms, Some(500));
        assert!(matches!(cli.command, Command::Sessions { export: None }));
    }

    #[test]
    fn cli_parses_results_subcommand() {
        let cli = Cli::parse_from(["crosscheck", "results", "job-1", "--export", "."]);
        match cli.command {
            Command::Results { job_id, export } => {
                assert_eq!(job_id, "job-1");
                assert_eq!(export, Some(Some(PathBuf::from("."))));
            }
            _ => panic!("expected Results command"),
        }
    }

    #[test]
    fn export_without_dir_uses_default() {
        let cli = Cli::parse_from(["crosscheck", "sessions", "--export"]);
        assert!(matches!(cli.command, Command::Sessions { export: Some(None) }));
    }

    #[test]
    fn session_and_name_conflict() {
        let parsed = Cli::try_parse_from([
            "crosscheck",
            "analyze",
            "--session",
            "s1",
            "--name",
            "n",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
