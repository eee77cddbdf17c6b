//! Error taxonomy for the analysis service client.
//!
//! Every fault raised while talking to the remote service is normalized into
//! [`ApiError`], whose `Display` output is the single user-presentable
//! message for that fault. The variants map onto three fault families:
//! - [`Transport`](ApiError::Transport): the request never reached the server
//! - [`Timeout`](ApiError::Timeout): the request exceeded its own deadline
//! - [`Http`](ApiError::Http): the server answered with a non-2xx status
//!
//! Anything else (an undecodable body, a malformed request) keeps its raw
//! message in [`Other`](ApiError::Other).

use std::fmt;

use thiserror::Error;

/// The remote operation a fault was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListSessions,
    CreateSession,
    UploadFile,
    StartAnalysis,
    GetStatus,
    GetResults,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ListSessions => write!(f, "list sessions"),
            Operation::CreateSession => write!(f, "create session"),
            Operation::UploadFile => write!(f, "upload file"),
            Operation::StartAnalysis => write!(f, "start analysis"),
            Operation::GetStatus => write!(f, "get status"),
            Operation::GetResults => write!(f, "get results"),
        }
    }
}

/// A classified fault from the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response reached the server (offline, DNS, connection refused or
    /// reset, socket connect timeout). `detail` is kept for logs only.
    #[error("Unable to connect to server. Please check your internet connection and try again.")]
    Transport { detail: String },

    /// The request exceeded its own deadline.
    #[error("{}", timeout_message(.operation))]
    Timeout { operation: Operation },

    /// The server answered with a non-2xx status.
    #[error("{}", http_message(.status))]
    Http { status: u16 },

    /// Any other fault, reported with its raw message.
    #[error("{}", raw_message(.0))]
    Other(String),
}

impl ApiError {
    /// Classify a `reqwest` fault raised while performing `operation`.
    ///
    /// Connection failures are checked before deadlines so that a socket
    /// connect timeout is reported as a connectivity problem. A request
    /// deadline also surfaces as a request error, so it is checked before
    /// the remaining request faults.
    pub fn from_reqwest(err: reqwest::Error, operation: Operation) -> Self {
        if err.is_connect() {
            ApiError::Transport {
                detail: err.to_string(),
            }
        } else if err.is_timeout() {
            ApiError::Timeout { operation }
        } else if err.is_request() {
            ApiError::Transport {
                detail: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
            }
        } else {
            ApiError::Other(err.to_string())
        }
    }

    /// Whether the fault means the server was never reached.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

/// Fixed human-readable message for an HTTP status code.
pub fn status_message(status: u16) -> String {
    let fixed = match status {
        0 => "Network error: Unable to connect to server",
        400 => "Bad request: Invalid data sent to server",
        401 => "Unauthorized: Please check your credentials",
        403 => "Forbidden: Access denied",
        404 => "Not found: The requested resource was not found",
        408 => "Request timeout: Server took too long to respond",
        429 => "Too many requests: Please try again later",
        500 => "Server error: Internal server error occurred",
        502 => "Bad gateway: Server is temporarily unavailable",
        503 => "Service unavailable: Server is under maintenance",
        504 => "Gateway timeout: Server took too long to respond",
        _ => return format!("HTTP error: {status}"),
    };
    fixed.to_string()
}

fn http_message(status: &u16) -> String {
    status_message(*status)
}

fn timeout_message(operation: &Operation) -> &'static str {
    match operation {
        Operation::UploadFile => "File upload timed out. Please try again.",
        _ => "Request timed out. Please try again.",
    }
}

fn raw_message(message: &str) -> &str {
    if message.trim().is_empty() {
        "Unknown error"
    } else {
        message
    }
}
