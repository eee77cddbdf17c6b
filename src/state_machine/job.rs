use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::AnalysisStatus;

/// The client's view of the current analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// Service-assigned id; `None` until the service accepts a start.
    pub job_id: Option<String>,
    pub status: AnalysisStatus,
    /// Statuses the job has left, oldest first.
    pub history: Vec<AnalysisStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Default for AnalysisJob {
    fn default() -> Self {
        Self {
            job_id: None,
            status: AnalysisStatus::Idle,
            history: Vec::new(),
            started_at: None,
            updated_at: Utc::now(),
        }
    }
}

impl AnalysisJob {
    pub(super) fn begin(&mut self, job_id: String) {
        self.job_id = Some(job_id);
        self.started_at = Some(Utc::now());
    }

    pub(super) fn move_to(&mut self, next: AnalysisStatus) {
        self.history.push(self.status);
        self.status = next;
        self.updated_at = Utc::now();
    }

    /// Whether a poll loop should be running for this job.
    pub fn is_pollable(&self) -> bool {
        self.status == AnalysisStatus::Processing && self.job_id.is_some()
    }

    /// Time spent since the service accepted the job.
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.started_at
            .map(|started| (self.updated_at - started).num_milliseconds())
    }
}
