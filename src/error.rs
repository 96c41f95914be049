//! Error types for retrieval.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::models::Method;
use crate::quality::Rejection;

/// Why a single strategy failed to produce a usable body.
///
/// These never reach the caller directly; the orchestrator records them and
/// moves on to the next strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("timed out after {}s", .after.as_secs_f32())]
    Timeout { after: Duration },
    #[error("blocked by bot wall (HTTP {status})")]
    Blocked { status: u16 },
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),
    #[error("soft failure: {0}")]
    SoftFailure(String),
    #[error("no archived snapshot available")]
    NoSnapshot,
    #[error("challenge page not cleared: {0}")]
    Challenge(String),
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),
    #[error("internal fault: {0}")]
    Internal(String),
}

impl AcquisitionError {
    /// Classify a reqwest error, keeping timeouts distinct from other failures.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { after: timeout }
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Map a non-success HTTP status to a failure reason.
    pub fn from_status(status: u16) -> Self {
        if is_bot_wall(status) {
            Self::Blocked { status }
        } else {
            Self::Status { status }
        }
    }
}

/// Statuses that anti-automation layers answer with.
pub fn is_bot_wall(status: u16) -> bool {
    matches!(status, 403 | 429 | 503)
}

/// Why one step of the escalation did not produce the final result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Acquisition(AcquisitionError),
    Rejected(Rejection),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquisition(e) => write!(f, "{}", e),
            Self::Rejected(r) => write!(f, "rejected: {}", r),
        }
    }
}

/// Diagnostic record of one attempted strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub method: Method,
    pub failure: AttemptFailure,
}

impl fmt::Display for AttemptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.method, self.failure)
    }
}

/// Terminal outcomes surfaced to callers of `Retriever::retrieve`.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("all retrieval strategies exhausted for {url} ({})", summarize(.attempts))]
    Exhausted {
        url: String,
        attempts: Vec<AttemptReport>,
    },
}

impl RetrieveError {
    /// Whether every attempt that failed did so by timing out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Exhausted { attempts, .. } => {
                !attempts.is_empty()
                    && attempts.iter().all(|a| {
                        matches!(
                            a.failure,
                            AttemptFailure::Acquisition(AcquisitionError::Timeout { .. })
                        )
                    })
            }
            Self::InvalidInput(_) => false,
        }
    }
}

/// Failure to assemble a retriever from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("no retrieval steps configured")]
    NoSteps,
}

fn summarize(attempts: &[AttemptReport]) -> String {
    if attempts.is_empty() {
        return "no strategies configured".to_string();
    }
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
