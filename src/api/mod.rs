pub mod client;
pub mod error;
pub mod types;

pub use client::{AnalysisService, ApiClient, GATEWAY_BYPASS_HEADER};
pub use error::{ApiError, Operation, status_message};
pub use types::{
    AnalysisResult, CheckStatus, ExpandedDetails, FileCoverage, FileKind, FileUpload,
    JobStatusResponse, RemotePhase, Session, UploadedFile, ValidationCheck,
};
