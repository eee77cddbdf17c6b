use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::AnalysisJob;

/// The four states of an analysis job as seen by the client.
///
/// Each job flows through: IDLE → PROCESSING → COMPLETED | FAILED
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStatus::Idle => write!(f, "idle"),
            AnalysisStatus::Processing => write!(f, "processing"),
            AnalysisStatus::Completed => write!(f, "completed"),
            AnalysisStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Something that happened to the current job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The service accepted a new analysis and assigned it `job_id`.
    Started { job_id: String },
    /// The service refused to start an analysis.
    StartRejected,
    /// A status poll reported `completed`.
    RemoteCompleted { job_id: String },
    /// A status poll reported `failed`.
    RemoteFailed { job_id: String },
    /// A status poll itself faulted.
    PollFault { job_id: String },
}

impl JobEvent {
    fn job_id(&self) -> Option<&str> {
        match self {
            JobEvent::Started { job_id }
            | JobEvent::RemoteCompleted { job_id }
            | JobEvent::RemoteFailed { job_id }
            | JobEvent::PollFault { job_id } => Some(job_id),
            JobEvent::StartRejected => None,
        }
    }
}

/// The result of evaluating a job event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The job moved to a new status.
    Next(AnalysisStatus),
    /// The event belongs to a job that is no longer current; nothing changed.
    Stale,
    /// The event does not apply in the current status; nothing changed.
    Invalid { from: AnalysisStatus },
}

/// Drives an [`AnalysisJob`] through its lifecycle.
pub struct StateMachine;

impl StateMachine {
    /// Apply `event` to `job` and return what happened.
    ///
    /// - `Started` enters `Processing` from any status, but only with a job id
    ///   different from the current one.
    /// - `StartRejected` enters `Failed` and clears the job id.
    /// - Remote outcomes only apply to the current job while `Processing`.
    pub fn apply(job: &mut AnalysisJob, event: JobEvent) -> Transition {
        let current = job.status;

        let transition = match &event {
            JobEvent::Started { job_id } => {
                if job.job_id.as_deref() == Some(job_id.as_str()) {
                    Transition::Invalid { from: current }
                } else {
                    Transition::Next(AnalysisStatus::Processing)
                }
            }
            JobEvent::StartRejected => Transition::Next(AnalysisStatus::Failed),
            JobEvent::RemoteCompleted { .. }
            | JobEvent::RemoteFailed { .. }
            | JobEvent::PollFault { .. } => {
                if job.job_id.as_deref() != event.job_id() {
                    Transition::Stale
                } else if current != AnalysisStatus::Processing {
                    Transition::Invalid { from: current }
                } else if matches!(event, JobEvent::RemoteCompleted { .. }) {
                    Transition::Next(AnalysisStatus::Completed)
                } else {
                    Transition::Next(AnalysisStatus::Failed)
                }
            }
        };

        if let Transition::Next(next) = &transition {
            match event {
                JobEvent::Started { job_id } => job.begin(job_id),
                JobEvent::StartRejected => job.job_id = None,
                _ => {}
            }
            job.move_to(*next);
        }

        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> JobEvent {
        JobEvent::Started { job_id: id.into() }
    }

    #[test]
    fn happy_path_walks_all_states() {
        let mut job = AnalysisJob::default();
        assert_eq!(job.status, AnalysisStatus::Idle);

        let t = StateMachine::apply(&mut job, started("job-1"));
        assert_eq!(t, Transition::Next(AnalysisStatus::Processing));
        assert_eq!(job.job_id.as_deref(), Some("job-1"));

        let t = StateMachine::apply(
            &mut job,
            JobEvent::RemoteCompleted {
                job_id: "job-1".into(),
            },
        );
        assert_eq!(t, Transition::Next(AnalysisStatus::Completed));
        assert_eq!(job.status, AnalysisStatus::Completed);
        assert_eq!(
            job.history,
            vec![AnalysisStatus::Idle, AnalysisStatus::Processing]
        );
    }

    #[test]
    fn start_rejected_fails_directly() {
        let mut job = AnalysisJob::default();
        let t = StateMachine::apply(&mut job, JobEvent::StartRejected);
        assert_eq!(t, Transition::Next(AnalysisStatus::Failed));
        assert!(job.job_id.is_none());
    }

    #[test]
    fn remote_failure_and_poll_fault_both_fail() {
        let mut job = AnalysisJob::default();
        StateMachine::apply(&mut job, started("a"));
        let t = StateMachine::apply(&mut job, JobEvent::RemoteFailed { job_id: "a".into() });
        assert_eq!(t, Transition::Next(AnalysisStatus::Failed));

        let mut job = AnalysisJob::default();
        StateMachine::apply(&mut job, started("b"));
        let t = StateMachine::apply(&mut job, JobEvent::PollFault { job_id: "b".into() });
        assert_eq!(t, Transition::Next(AnalysisStatus::Failed));
    }

    #[test]
    fn events_for_other_jobs_are_stale() {
        let mut job = AnalysisJob::default();
        StateMachine::apply(&mut job, started("a"));
        StateMachine::apply(&mut job, started("b"));

        let t = StateMachine::apply(
            &mut job,
            JobEvent::RemoteCompleted {
                job_id: "a".into(),
            },
        );
        assert_eq!(t, Transition::Stale);
        assert_eq!(job.status, AnalysisStatus::Processing);
        assert_eq!(job.job_id.as_deref(), Some("b"));
    }

    #[test]
    fn terminal_status_never_reverts_to_processing() {
        let mut job = AnalysisJob::default();
        StateMachine::apply(&mut job, started("a"));
        StateMachine::apply(&mut job, JobEvent::RemoteCompleted { job_id: "a".into() });

        // Same id cannot restart the job.
        let t = StateMachine::apply(&mut job, started("a"));
        assert_eq!(
            t,
            Transition::Invalid {
                from: AnalysisStatus::Completed
            }
        );

        // A late outcome for the same job does not move it either.
        let t = StateMachine::apply(&mut job, JobEvent::RemoteFailed { job_id: "a".into() });
        assert_eq!(
            t,
            Transition::Invalid {
                from: AnalysisStatus::Completed
            }
        );
        assert_eq!(job.status, AnalysisStatus::Completed);

        // A brand-new job id can.
        let t = StateMachine::apply(&mut job, started("b"));
        assert_eq!(t, Transition::Next(AnalysisStatus::Processing));
    }

    #[test]
    fn remote_outcome_while_idle_is_stale() {
        let mut job = AnalysisJob::default();
        let t = StateMachine::apply(&mut job, JobEvent::RemoteCompleted { job_id: "x".into() });
        assert_eq!(t, Transition::Stale);
        assert_eq!(job.status, AnalysisStatus::Idle);
    }

    #[test]
    fn status_display() {
        assert_eq!(AnalysisStatus::Idle.to_string(), "idle");
        assert_eq!(AnalysisStatus::Processing.to_string(), "processing");
        assert_eq!(AnalysisStatus::Completed.to_string(), "completed");
        assert_eq!(AnalysisStatus::Failed.to_string(), "failed");
        assert!(AnalysisStatus::Failed.is_terminal());
        assert!(!AnalysisStatus::Processing.is_terminal());
    }
}
