use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{AnalysisResult, AnalysisService, ApiError, FileKind, FileUpload, Session, UploadedFile};
use crate::error::CrossCheckError;
use crate::polling::{PollEvent, PollHandle, PollingEngine};
use crate::state_machine::{AnalysisJob, AnalysisStatus, JobEvent, StateMachine, Transition};
use crate::upload::{SubmitReport, UploadCoordinator};

/// Everything a rendering layer needs, captured after each mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub status: AnalysisStatus,
    pub job_id: Option<String>,
    pub session_id: Option<String>,
    pub files: Vec<UploadedFile>,
    pub result: Option<AnalysisResult>,
    pub sessions: Vec<Session>,
    pub error: Option<String>,
}

/// Owns the client-side state of one working session: the upload set, the
/// current job and its poll loop, the session list and the error slot.
///
/// All mutation goes through `&mut self`, so there is a single writer and no
/// locking. Dropping the orchestrator cancels any running poll loop.
pub struct JobOrchestrator<S: AnalysisService> {
    service: Arc<S>,
    polling: PollingEngine,
    uploads: UploadCoordinator,
    job: AnalysisJob,
    poll: Option<PollHandle>,
    current_session: Option<String>,
    sessions: Vec<Session>,
    result: Option<AnalysisResult>,
    error: Option<String>,
    updates: watch::Sender<Snapshot>,
}

impl<S: AnalysisService> JobOrchestrator<S> {
    pub fn new(service: Arc<S>, polling: PollingEngine) -> Self {
        let (updates, _) = watch::channel(Snapshot::default());
        Self {
            service,
            polling,
            uploads: UploadCoordinator::new(),
            job: AnalysisJob::default(),
            poll: None,
            current_session: None,
            sessions: Vec::new(),
            result: None,
            error: None,
            updates,
        }
    }

    /// Attach to an existing session instead of creating one on first start.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.current_session = Some(session_id.into());
        self.publish();
        self
    }

    pub fn status(&self) -> AnalysisStatus {
        self.job.status
    }

    pub fn job(&self) -> &AnalysisJob {
        &self.job
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job.job_id.as_deref()
    }

    pub fn current_session(&self) -> Option<&str> {
        self.current_session.as_deref()
    }

    pub fn files(&self) -> &[UploadedFile] {
        self.uploads.files()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| !p.is_cancelled())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.job.status,
            job_id: self.job.job_id.clone(),
            session_id: self.current_session.clone(),
            files: self.uploads.files().to_vec(),
            result: self.result.clone(),
            sessions: self.sessions.clone(),
            error: self.error.clone(),
        }
    }

    /// Receive a fresh [`Snapshot`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    fn set_error(&mut self, err: &ApiError) {
        self.error = Some(err.to_string());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.publish();
    }

    /// Refresh the session list.
    pub async fn load_sessions(&mut self) -> Result<&[Session], CrossCheckError> {
        self.error = None;
        match self.service.list_sessions().await {
            Ok(sessions) => {
                debug!(count = sessions.len(), "sessions loaded");
                self.sessions = sessions;
                self.publish();
                Ok(&self.sessions)
            }
            Err(err) => {
                error!(error = %err, "failed to load sessions");
                self.set_error(&err);
                self.publish();
                Err(err.into())
            }
        }
    }

    /// Create a session named after the current time and make it current.
    pub async fn create_session(&mut self) -> Result<String, CrossCheckError> {
        let name = format!("Session {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        self.create_named_session(&name).await
    }

    pub async fn create_named_session(&mut self, name: &str) -> Result<String, CrossCheckError> {
        self.error = None;
        match self.service.create_session(Some(name)).await {
            Ok(response) => {
                info!(session_id = %response.session_id, %name, "session created");
                self.current_session = Some(response.session_id.clone());
                self.publish();
                // A failed refresh lands in the error slot but the session exists.
                let _ = self.load_sessions().await;
                Ok(response.session_id)
            }
            Err(err) => {
                error!(error = %err, "failed to create session");
                self.set_error(&err);
                self.publish();
                Err(err.into())
            }
        }
    }

    /// Upload `files` as `kind` within the category limits.
    pub async fn upload(
        &mut self,
        files: Vec<FileUpload>,
        kind: FileKind,
    ) -> Result<SubmitReport, CrossCheckError> {
        self.error = None;
        let outcome = self
            .uploads
            .submit(self.service.as_ref(), files, kind)
            .await;
        match &outcome {
            Ok(report) => {
                if let Some(err) = report.last_error() {
                    self.error = Some(err.to_string());
                }
            }
            Err(err) => self.error = Some(err.to_string()),
        }
        self.publish();
        outcome
    }

    /// Forget an uploaded file locally.
    pub fn remove_file(&mut self, file_id: &str) -> bool {
        let removed = self.uploads.remove(file_id);
        if removed {
            self.publish();
        }
        removed
    }

    /// Submit the current upload set for analysis and start polling.
    ///
    /// With no files this returns [`CrossCheckError::NoFiles`] without
    /// touching any state. A session is created first if none is current;
    /// if that fails nothing else happens. A refused start moves the job to
    /// `Failed`.
    pub async fn start_analysis(&mut self) -> Result<String, CrossCheckError> {
        if self.uploads.is_empty() {
            warn!("no files uploaded for analysis");
            return Err(CrossCheckError::NoFiles);
        }
        self.error = None;

        let session_id = match self.current_session.clone() {
            Some(id) => id,
            None => self.create_session().await?,
        };

        self.stop_polling();
        self.result = None;

        let file_ids = self.uploads.file_ids();
        info!(%session_id, files = file_ids.len(), "starting analysis");
        match self.service.start_analysis(&session_id, &file_ids).await {
            Ok(response) => {
                let job_id = response.job_id;
                let transition = StateMachine::apply(
                    &mut self.job,
                    JobEvent::Started {
                        job_id: job_id.clone(),
                    },
                );
                if transition != Transition::Next(AnalysisStatus::Processing) {
                    warn!(%job_id, ?transition, "service reused a job id");
                }
                if self.job.is_pollable() {
                    self.poll = Some(self.polling.start(self.service.clone(), job_id.clone()));
                }
                self.publish();
                Ok(job_id)
            }
            Err(err) => {
                error!(error = %err, "failed to start analysis");
                StateMachine::apply(&mut self.job, JobEvent::StartRejected);
                self.set_error(&err);
                self.publish();
                Err(err.into())
            }
        }
    }

    /// Wait for the running poll loop to report and apply the outcome.
    ///
    /// Returns the new status, or `None` when there is no active poll loop.
    pub async fn next_update(&mut self) -> Option<AnalysisStatus> {
        let event = match self.poll.as_mut() {
            Some(handle) => handle.next_event().await,
            None => return None,
        };
        let Some(event) = event else {
            self.poll = None;
            return None;
        };

        if Some(event.job_id()) != self.job.job_id.as_deref() {
            debug!(job_id = %event.job_id(), "discarding update for previous job");
            return Some(self.job.status);
        }

        let (job_event, fault) = match event {
            PollEvent::Completed { job_id } => (JobEvent::RemoteCompleted { job_id }, None),
            PollEvent::Failed { job_id } => (JobEvent::RemoteFailed { job_id }, None),
            PollEvent::Fault { job_id, error } => (JobEvent::PollFault { job_id }, Some(error)),
        };

        let transition = StateMachine::apply(&mut self.job, job_event);
        if !self.job.is_pollable() {
            self.stop_polling();
        }
        if let Some(err) = &fault {
            self.set_error(err);
        }
        self.publish();

        match transition {
            Transition::Next(AnalysisStatus::Completed) => {
                info!(job_id = ?self.job.job_id, "analysis completed");
                // The job did complete; a failed fetch only leaves the error set.
                let _ = self.load_results().await;
            }
            Transition::Next(AnalysisStatus::Failed) => {
                warn!(job_id = ?self.job.job_id, "analysis failed");
            }
            other => debug!(?other, "poll outcome did not change the job"),
        }

        Some(self.job.status)
    }

    /// Drive the poll loop until the job settles. Returns early, with the
    /// current status, when no poll loop is running.
    pub async fn wait_until_settled(&mut self) -> AnalysisStatus {
        while !self.job.status.is_terminal() {
            if self.next_update().await.is_none() {
                break;
            }
        }
        self.job.status
    }

    /// Fetch the full results of the current job. The job status is never
    /// changed by this call.
    pub async fn load_results(&mut self) -> Result<&AnalysisResult, CrossCheckError> {
        let Some(job_id) = self.job.job_id.clone() else {
            return Err(CrossCheckError::NoActiveJob);
        };

        self.error = None;
        match self.service.get_results(&job_id).await {
            Ok(result) => {
                info!(%job_id, checks = result.checks.len(), overall = %result.overall_status, "results loaded");
                self.result = Some(result);
                self.publish();
                let _ = self.load_sessions().await;
                self.result.as_ref().ok_or(CrossCheckError::NoActiveJob)
            }
            Err(err) => {
                error!(%job_id, error = %err, "failed to load analysis results");
                self.set_error(&err);
                self.publish();
                Err(err.into())
            }
        }
    }

    /// Stop any running poll loop, e.g. when the view goes away. The job keeps
    /// its status.
    pub fn detach(&mut self) {
        self.stop_polling();
        self.publish();
    }

    fn stop_polling(&mut self) {
        if let Some(mut handle) = self.poll.take() {
            handle.cancel();
        }
    }
}
