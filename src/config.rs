//! Configuração do crosscheck carregada a partir de `crosscheck.toml`.
//!
//! A struct [`CrossCheckConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `CROSSCHECK_API_BASE` tem precedência sobre o arquivo.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::CrossCheckError;

type Result<T> = std::result::Result<T, CrossCheckError>;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "crosscheck.toml";

/// Variável de ambiente que sobrescreve `api_base`.
pub const API_BASE_ENV: &str = "CROSSCHECK_API_BASE";

/// Configuração de nível superior carregada de `crosscheck.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CrossCheckConfig {
    /// URL base do serviço de análise.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Intervalo entre consultas de status, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Prazo de um upload de arquivo, em milissegundos.
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,

    /// Prazo para abrir a conexão TCP, em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Diretório onde os relatórios CSV são gravados.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

// Valor padrão da URL base: servidor local na porta 8000.
fn default_api_base() -> String {
    "http://localhost:8000".to_string()
}

// Valor padrão do intervalo de polling: 2000ms.
fn default_poll_interval_ms() -> u64 {
    2000
}

// Uploads não têm limite de tamanho nesta camada, então o prazo é longo.
fn default_upload_timeout_ms() -> u64 {
    30_000_000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_output_dir() -> String {
    ".".to_string()
}

impl Default for CrossCheckConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            poll_interval_ms: default_poll_interval_ms(),
            upload_timeout_ms: default_upload_timeout_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            output_dir: default_output_dir(),
        }
    }
}

impl CrossCheckConfig {
    /// Carrega a configuração de `crosscheck.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.is_empty() {
                config.api_base = base;
            }
        }

        Ok(config)
    }

    /// Carrega a configuração de um caminho explícito, sem consultar o ambiente.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str::<CrossCheckConfig>(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejeita valores que tornariam o polling ou os uploads inutilizáveis.
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(CrossCheckError::Config("api_base must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(CrossCheckError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.upload_timeout_ms == 0 {
            return Err(CrossCheckError::Config(
                "upload_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
