//! Wire types for the analysis service.
//!
//! All structs derive `Serialize` and `Deserialize` and follow the JSON
//! shapes served by the remote endpoints. Timestamps are kept as the strings
//! the server sent; formatting happens at export time.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upload category of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Manufacturing traveler (PDF).
    Traveler,
    /// Product image.
    Image,
    /// Bill-of-materials spreadsheet.
    Bom,
}

impl FileKind {
    /// Path segment used by `POST /upload/{type}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Traveler => "traveler",
            FileKind::Image => "image",
            FileKind::Bom => "bom",
        }
    }

    /// File extensions this category accepts (lowercase, without the dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileKind::Traveler => &["pdf"],
            FileKind::Image => &["jpg", "jpeg", "png"],
            FileKind::Bom => &["xlsx", "xlsm"],
        }
    }

    /// Whether `filename` has an extension this category accepts.
    pub fn accepts(&self, filename: &str) -> bool {
        match extension(filename) {
            Some(ext) => self.extensions().contains(&ext.as_str()),
            None => false,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "traveler" => Ok(FileKind::Traveler),
            "image" => Ok(FileKind::Image),
            "bom" => Ok(FileKind::Bom),
            other => Err(format!("unknown file type: {other}")),
        }
    }
}

/// Lowercased extension of `filename`, if any.
pub(crate) fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// A local file ready to be sent to `POST /upload/{type}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its final path component as name.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }

    /// MIME type guessed from the extension.
    pub fn mime_type(&self) -> &'static str {
        match extension(&self.filename).as_deref() {
            Some("pdf") => "application/pdf",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("xlsm") => "application/vnd.ms-excel.sheet.macroEnabled.12",
            _ => "application/octet-stream",
        }
    }
}

/// A file the service has acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// Which inputs a completed job saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub traveler: bool,
    pub image: bool,
    pub boms: u32,
}

/// Outcome of a single comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warning => "warning",
            CheckStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full values behind an abbreviated expected/actual pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedDetails {
    pub expected_value: String,
    pub actual_value: String,
}

/// One comparison the service performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub check_type: String,
    pub status: CheckStatus,
    pub expected: String,
    pub actual: String,
    /// Names of the (at most two) sources compared, in service order.
    #[serde(default)]
    pub sources_compared: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expandable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_details: Option<ExpandedDetails>,
}

/// A job's full result as served by `GET /analysis/{id}/results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub job_id: String,
    pub session_id: String,
    pub overall_status: String,
    #[serde(default)]
    pub file_coverage: FileCoverage,
    /// Checks in the order the service produced them. Never re-sorted.
    #[serde(default)]
    pub checks: Vec<ValidationCheck>,
    pub created_at: String,
}

/// A named container of analysis jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub analysis_jobs: Vec<AnalysisResult>,
}

impl Session {
    /// The session's name, or `Session <id prefix>` when unnamed.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let prefix: String = self.id.chars().take(8).collect();
                format!("Session {prefix}")
            }
        }
    }
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response of `POST /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// Response of `POST /upload/{type}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
}

/// Body of `POST /sessions/{id}/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAnalysisRequest {
    pub file_ids: Vec<String>,
}

/// Response of `POST /sessions/{id}/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAnalysisResponse {
    pub job_id: String,
}

/// Response of `GET /analysis/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
}

/// How the poll loop should read a status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemotePhase {
    Completed,
    Failed,
    /// Anything else (`pending`, `processing`, ...): keep polling.
    Running,
}

impl JobStatusResponse {
    pub fn phase(&self) -> RemotePhase {
        match self.status.as_str() {
            "completed" => RemotePhase::Completed,
            "failed" => RemotePhase::Failed,
            _ => RemotePhase::Running,
        }
    }
}
