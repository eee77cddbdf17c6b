//! Working set of uploaded documents.
//!
//! [`UploadCoordinator`] enforces the per-category limits (one traveler, one
//! image, up to [`MAX_BOM_FILES`] BOM spreadsheets) before anything is sent
//! to the service. Uploads are remote plus local; removals are local only,
//! the service keeps whatever was already uploaded.

use tracing::{debug, info, warn};

use crate::api::{AnalysisService, ApiError, FileKind, FileUpload, UploadedFile};
use crate::error::CrossCheckError;

/// Maximum number of BOM spreadsheets per analysis.
pub const MAX_BOM_FILES: usize = 4;

/// What one `submit` call did.
#[derive(Debug, Default)]
pub struct SubmitReport {
    /// Records appended to the working set, in upload order.
    pub added: Vec<UploadedFile>,
    /// Files the service refused, with the classified fault.
    pub failures: Vec<(String, ApiError)>,
    /// Inputs dropped because the category was already full.
    pub dropped: usize,
}

impl SubmitReport {
    /// The last upload fault, which is what the error slot shows.
    pub fn last_error(&self) -> Option<&ApiError> {
        self.failures.last().map(|(_, err)| err)
    }
}

#[derive(Debug, Default, Clone)]
pub struct UploadCoordinator {
    files: Vec<UploadedFile>,
}

impl UploadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn file_ids(&self) -> Vec<String> {
        self.files.iter().map(|f| f.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn by_kind(&self, kind: FileKind) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    pub fn count(&self, kind: FileKind) -> usize {
        self.by_kind(kind).count()
    }

    /// How many more files of `kind` the working set can take.
    pub fn remaining(&self, kind: FileKind) -> usize {
        let cap = match kind {
            FileKind::Bom => MAX_BOM_FILES,
            FileKind::Traveler | FileKind::Image => 1,
        };
        cap.saturating_sub(self.count(kind))
    }

    /// Upload `files` as `kind`, keeping within the category limit.
    ///
    /// Inputs past the limit are dropped without error. Files are uploaded
    /// one at a time; a refused file does not stop the rest. A file with an
    /// extension the category does not accept fails the whole call before
    /// any request is issued.
    pub async fn submit<S: AnalysisService>(
        &mut self,
        service: &S,
        files: Vec<FileUpload>,
        kind: FileKind,
    ) -> Result<SubmitReport, CrossCheckError> {
        let remaining = self.remaining(kind);
        let mut report = SubmitReport {
            dropped: files.len().saturating_sub(remaining),
            ..Default::default()
        };
        if remaining == 0 {
            debug!(%kind, dropped = report.dropped, "category full, ignoring upload");
            return Ok(report);
        }

        let accepted: Vec<FileUpload> = files.into_iter().take(remaining).collect();
        if let Some(bad) = accepted.iter().find(|f| !kind.accepts(&f.filename)) {
            return Err(CrossCheckError::unsupported_file(kind, &bad.filename));
        }

        for file in accepted {
            match service.upload_file(&file, kind).await {
                Ok(response) => {
                    info!(filename = %file.filename, %kind, file_id = %response.file_id, "file uploaded");
                    let record = UploadedFile {
                        id: response.file_id,
                        filename: file.filename,
                        kind,
                    };
                    self.files.push(record.clone());
                    report.added.push(record);
                }
                Err(err) => {
                    warn!(filename = %file.filename, %kind, error = %err, "upload failed");
                    report.failures.push((file.filename, err));
                }
            }
        }

        Ok(report)
    }

    /// Drop the record with `file_id`. Returns whether one was removed.
    pub fn remove(&mut self, file_id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.id != file_id);
        before != self.files.len()
    }
}
