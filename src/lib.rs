//! Client for the manufacturing QC cross-check service.
//!
//! Uploads a traveler, a product image and up to four BOM spreadsheets,
//! starts a remote analysis job, polls it to completion and exports the
//! validation checks as CSV.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod polling;
pub mod report;
pub mod state_machine;
pub mod ui;
pub mod upload;

#[cfg(test)]
mod testing;

pub use api::{AnalysisService, ApiClient, ApiError};
pub use config::CrossCheckConfig;
pub use error::CrossCheckError;
pub use orchestrator::{JobOrchestrator, Snapshot};
pub use polling::{PollHandle, PollingEngine};
pub use state_machine::AnalysisStatus;
pub use upload::{MAX_BOM_FILES, UploadCoordinator};
