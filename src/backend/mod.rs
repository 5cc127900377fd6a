//! Boundary to the external analysis service.
//!
//! The intake never classifies anything itself. It starts a session, sends one
//! chat turn at a time, asks for an analysis, and consumes whatever comes back.
//! `AnalysisBackend` is the seam; `HttpAnalysisClient` talks to the real service
//! and `MockBackend` scripts it for tests.

pub mod http;
pub mod mock;
pub mod types;

pub use http::*;
pub use mock::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Analysis service is not reachable at {0}")]
    Connection(String),

    #[error("Analysis service returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed analysis service response: {0}")]
    ResponseParsing(String),
}

/// Session identifier issued by `start-session`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations the analysis service exposes.
///
/// Implementations block until the service answers; callers must not hold
/// conversation locks across these calls.
pub trait AnalysisBackend: Send + Sync {
    /// `start-session(type)`: create a backend-side intake context.
    fn start_session(&self, intake_type: &str) -> Result<StartSessionResponse, BackendError>;

    /// `chat-turn(session_id, message)`: one conversational exchange.
    fn chat_turn(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<ChatTurnResponse, BackendError>;

    /// `analyze(session_id)`: full assessment of the session so far.
    fn analyze(&self, session_id: &SessionId) -> Result<AnalyzeResponse, BackendError>;

    /// `get-conditions()`: reference list, off the conversation's critical path.
    fn conditions(&self) -> Result<Vec<ConditionInfo>, BackendError>;

    /// `health()`: liveness probe. Never errors.
    fn health(&self) -> bool;

    /// Base URL shown in remediation hints.
    fn base_url(&self) -> &str;
}
