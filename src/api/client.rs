use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{ApiError, Operation};
use super::types::{
    AnalysisResult, CreateSessionRequest, CreateSessionResponse, FileKind, FileUpload,
    JobStatusResponse, Session, StartAnalysisRequest, StartAnalysisResponse, UploadResponse,
};
use crate::config::CrossCheckConfig;

/// Header that makes the tunnel gateway skip its browser interstitial.
pub const GATEWAY_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_millis(30_000_000);

/// The remote operations the orchestrator depends on.
///
/// Each call issues exactly one request and never retries. Failures come
/// back already classified.
pub trait AnalysisService: Send + Sync + 'static {
    fn list_sessions(&self) -> impl Future<Output = Result<Vec<Session>, ApiError>> + Send;

    fn create_session(
        &self,
        name: Option<&str>,
    ) -> impl Future<Output = Result<CreateSessionResponse, ApiError>> + Send;

    fn upload_file(
        &self,
        file: &FileUpload,
        kind: FileKind,
    ) -> impl Future<Output = Result<UploadResponse, ApiError>> + Send;

    fn start_analysis(
        &self,
        session_id: &str,
        file_ids: &[String],
    ) -> impl Future<Output = Result<StartAnalysisResponse, ApiError>> + Send;

    fn get_status(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<JobStatusResponse, ApiError>> + Send;

    fn get_results(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<AnalysisResult, ApiError>> + Send;
}

/// HTTP client for the analysis service.
pub struct ApiClient {
    client: Client,
    base_url: String,
    upload_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::build(base_url.into(), DEFAULT_CONNECT_TIMEOUT, DEFAULT_UPLOAD_TIMEOUT)
    }

    pub fn from_config(config: &CrossCheckConfig) -> Result<Self, ApiError> {
        Self::build(
            config.api_base.clone(),
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_millis(config.upload_timeout_ms),
        )
    }

    fn build(
        base_url: String,
        connect_timeout: Duration,
        upload_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(GATEWAY_BYPASS_HEADER, HeaderValue::from_static("true"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ApiError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: Operation,
    ) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| log_fault(ApiError::from_reqwest(e, operation), operation))?;

        let status = response.status();
        debug!(%operation, status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(log_fault(
                ApiError::Http {
                    status: status.as_u16(),
                },
                operation,
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| log_fault(ApiError::from_reqwest(e, operation), operation))
    }
}

fn log_fault(err: ApiError, operation: Operation) -> ApiError {
    match &err {
        ApiError::Transport { detail } => warn!(%operation, %detail, "transport fault"),
        other => warn!(%operation, error = %other, "request failed"),
    }
    err
}

impl AnalysisService for ApiClient {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let request = self.client.get(self.url("/sessions"));
        self.send(request, Operation::ListSessions).await
    }

    async fn create_session(&self, name: Option<&str>) -> Result<CreateSessionResponse, ApiError> {
        let body = CreateSessionRequest {
            name: name.map(str::to_string),
        };
        let request = self.client.post(self.url("/sessions")).json(&body);
        self.send(request, Operation::CreateSession).await
    }

    async fn upload_file(&self, file: &FileUpload, kind: FileKind) -> Result<UploadResponse, ApiError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(file.mime_type())
            .map_err(|e| ApiError::Other(e.to_string()))?;
        let form = Form::new().part("file", part);

        debug!(filename = %file.filename, %kind, size = file.bytes.len(), "uploading file");
        let request = self
            .client
            .post(self.url(&format!("/upload/{}", kind.as_str())))
            .multipart(form)
            .timeout(self.upload_timeout);
        self.send(request, Operation::UploadFile).await
    }

    async fn start_analysis(
        &self,
        session_id: &str,
        file_ids: &[String],
    ) -> Result<StartAnalysisResponse, ApiError> {
        let body = StartAnalysisRequest {
            file_ids: file_ids.to_vec(),
        };
        let request = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/analyze")))
            .json(&body);
        self.send(request, Operation::StartAnalysis).await
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError> {
        let request = self.client.get(self.url(&format!("/analysis/{job_id}/status")));
        self.send(request, Operation::GetStatus).await
    }

    async fn get_results(&self, job_id: &str) -> Result<AnalysisResult, ApiError> {
        let request = self.client.get(self.url(&format!("/analysis/{job_id}/results")));
        self.send(request, Operation::GetResults).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/sessions"), "http://localhost:8000/sessions");
    }

    #[test]
    fn from_config_uses_configured_base() {
        let config = CrossCheckConfig {
            api_base: "https://qc.example.test".into(),
            ..Default::default()
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://qc.example.test");
        assert_eq!(client.upload_timeout, Duration::from_millis(30_000_000));
    }
}
