//! Scripted [`AnalysisService`] used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::api::types::{CreateSessionResponse, StartAnalysisResponse, UploadResponse};
use crate::api::{
    AnalysisResult, AnalysisService, ApiError, CheckStatus, FileCoverage, FileKind, FileUpload,
    JobStatusResponse, Session, ValidationCheck,
};

/// A recorded call to the fake service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListSessions,
    CreateSession(Option<String>),
    Upload(FileKind, String),
    StartAnalysis(String, Vec<String>),
    GetStatus(String),
    GetResults(String),
}

pub struct MockService {
    calls: Mutex<Vec<Call>>,
    sessions: Mutex<Result<Vec<Session>, ApiError>>,
    create_session: Mutex<Option<ApiError>>,
    failing_uploads: Mutex<Vec<String>>,
    starts: Mutex<VecDeque<Result<String, ApiError>>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<String, ApiError>>>>,
    results: Mutex<Option<ApiError>>,
    status_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    counter: AtomicUsize,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sessions: Mutex::new(Ok(Vec::new())),
            create_session: Mutex::new(None),
            failing_uploads: Mutex::new(Vec::new()),
            starts: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(HashMap::new()),
            results: Mutex::new(None),
            status_delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_list_sessions(&self, err: ApiError) {
        *self.sessions.lock().unwrap() = Err(err);
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        *self.sessions.lock().unwrap() = Ok(sessions);
    }

    pub fn fail_create_session(&self, err: ApiError) {
        *self.create_session.lock().unwrap() = Some(err);
    }

    pub fn fail_upload_of(&self, filename: &str) {
        self.failing_uploads.lock().unwrap().push(filename.to_string());
    }

    pub fn push_start(&self, outcome: Result<&str, ApiError>) {
        self.starts
            .lock()
            .unwrap()
            .push_back(outcome.map(str::to_string));
    }

    /// Queue status responses for `job_id`. Once drained the job reports
    /// `processing` forever.
    pub fn script_status(&self, job_id: &str, outcomes: Vec<Result<&str, ApiError>>) {
        let mut statuses = self.statuses.lock().unwrap();
        let queue = statuses.entry(job_id.to_string()).or_default();
        for outcome in outcomes {
            queue.push_back(outcome.map(str::to_string));
        }
    }

    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    pub fn fail_results(&self, err: ApiError) {
        *self.results.lock().unwrap() = Some(err);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }
}

impl AnalysisService for MockService {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.record(Call::ListSessions);
        self.sessions.lock().unwrap().clone()
    }

    async fn create_session(&self, name: Option<&str>) -> Result<CreateSessionResponse, ApiError> {
        self.record(Call::CreateSession(name.map(str::to_string)));
        if let Some(err) = self.create_session.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(CreateSessionResponse {
            session_id: self.next_id("sess"),
        })
    }

    async fn upload_file(&self, file: &FileUpload, kind: FileKind) -> Result<UploadResponse, ApiError> {
        self.record(Call::Upload(kind, file.filename.clone()));
        if self.failing_uploads.lock().unwrap().contains(&file.filename) {
            return Err(ApiError::Http { status: 500 });
        }
        Ok(UploadResponse {
            file_id: self.next_id("file"),
        })
    }

    async fn start_analysis(
        &self,
        session_id: &str,
        file_ids: &[String],
    ) -> Result<StartAnalysisResponse, ApiError> {
        self.record(Call::StartAnalysis(session_id.to_string(), file_ids.to_vec()));
        let scripted = self.starts.lock().unwrap().pop_front();
        let job_id = match scripted {
            Some(outcome) => outcome?,
            None => self.next_id("job"),
        };
        Ok(StartAnalysisResponse { job_id })
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError> {
        self.record(Call::GetStatus(job_id.to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front);

        let status = next.unwrap_or_else(|| Ok("processing".to_string()))?;
        Ok(JobStatusResponse {
            job_id: job_id.to_string(),
            status,
        })
    }

    async fn get_results(&self, job_id: &str) -> Result<AnalysisResult, ApiError> {
        self.record(Call::GetResults(job_id.to_string()));
        if let Some(err) = self.results.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(sample_result(job_id))
    }
}

// Decrements the in-flight counter even when the request future is aborted.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn sample_result(job_id: &str) -> AnalysisResult {
    AnalysisResult {
        job_id: job_id.to_string(),
        session_id: "sess-1".into(),
        overall_status: "warning".into(),
        file_coverage: FileCoverage {
            traveler: true,
            image: true,
            boms: 2,
        },
        checks: vec![
            ValidationCheck {
                check_type: "Part Number".into(),
                status: CheckStatus::Pass,
                expected: "PN-100".into(),
                actual: "PN-100".into(),
                sources_compared: vec!["traveler".into(), "bom_1".into()],
                notes: None,
                is_expandable: None,
                expanded_details: None,
            },
            ValidationCheck {
                check_type: "Quantity".into(),
                status: CheckStatus::Warning,
                expected: "12".into(),
                actual: "10".into(),
                sources_compared: vec!["bom_1".into(), "bom_2".into()],
                notes: Some("Quantity differs between BOMs".into()),
                is_expandable: None,
                expanded_details: None,
            },
        ],
        created_at: "2024-03-05T14:07:09.123456Z".into(),
    }
}

pub fn upload(name: &str) -> FileUpload {
    FileUpload::new(name, name.as_bytes().to_vec())
}
