//! Status polling for a running analysis job.
//!
//! [`PollingEngine::start`] spawns one loop per job and returns the
//! [`PollHandle`] that owns it. The loop sleeps for the interval, issues a
//! single status request, awaits it, and only then decides whether to go
//! around again, so two status checks for the same job never overlap. It
//! reports exactly one terminal [`PollEvent`] and exits.
//!
//! Cancelling the handle (explicitly or by dropping it) stops the loop and
//! closes its channel, so nothing a stale loop observed can reach the
//! caller afterwards. Cancelling twice is a no-op.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{AnalysisService, ApiError, RemotePhase};

/// Default time between two status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// The terminal outcome a poll loop observed for its job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Completed { job_id: String },
    Failed { job_id: String },
    /// The status request itself failed; the loop does not retry.
    Fault { job_id: String, error: ApiError },
}

impl PollEvent {
    pub fn job_id(&self) -> &str {
        match self {
            PollEvent::Completed { job_id }
            | PollEvent::Failed { job_id }
            | PollEvent::Fault { job_id, .. } => job_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollingEngine {
    interval: Duration,
}

impl Default for PollingEngine {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl PollingEngine {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `job_id`. The returned handle must be kept; dropping it
    /// stops the loop.
    pub fn start<S: AnalysisService>(&self, service: Arc<S>, job_id: String) -> PollHandle {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);

        info!(%job_id, interval_ms = self.interval.as_millis() as u64, "polling started");
        let task = tokio::spawn(poll_loop(
            service,
            job_id.clone(),
            self.interval,
            token.clone(),
            tx,
        ));

        PollHandle {
            job_id,
            token,
            task: Some(task),
            events: rx,
        }
    }
}

async fn poll_loop<S: AnalysisService>(
    service: Arc<S>,
    job_id: String,
    interval: Duration,
    token: CancellationToken,
    tx: mpsc::Sender<PollEvent>,
) {
    let event = loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let response = tokio::select! {
            _ = token.cancelled() => return,
            response = service.get_status(&job_id) => response,
        };

        match response {
            Ok(status) => match status.phase() {
                RemotePhase::Completed => break PollEvent::Completed { job_id },
                RemotePhase::Failed => break PollEvent::Failed { job_id },
                RemotePhase::Running => {
                    debug!(%job_id, status = %status.status, "job still running");
                }
            },
            Err(error) => {
                warn!(%job_id, %error, "status check failed, stopping poll loop");
                break PollEvent::Fault { job_id, error };
            }
        }
    };

    if token.is_cancelled() {
        return;
    }
    // The receiver is gone only if the handle was dropped; nothing to report to.
    let _ = tx.send(event).await;
}

/// Owner of one running poll loop.
#[derive(Debug)]
pub struct PollHandle {
    job_id: String,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    events: mpsc::Receiver<PollEvent>,
}

impl PollHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the loop. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        debug!(job_id = %self.job_id, "polling cancelled");
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.events.close();
    }

    /// Wait for the loop's terminal event. Returns `None` once the handle is
    /// cancelled or the loop ended without reporting.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        if self.token.is_cancelled() {
            return None;
        }
        let event = self.events.recv().await;
        if event.is_some() {
            // One terminal event per loop; the loop has already exited.
            self.token.cancel();
            self.task.take();
        }
        event
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
