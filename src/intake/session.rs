use super::IntakeError;
use crate::backend::{AnalysisBackend, SessionId};
use crate::config::INTAKE_MODE;

/// Lazily-created backend session for one conversation.
///
/// Nothing is cached unless `start-session` succeeds, so a failed attempt
/// leaves the handle exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHandle {
    id: Option<SessionId>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached id, or create one through `backend` (intake mode "chat").
    pub fn ensure(&mut self, backend: &dyn AnalysisBackend) -> Result<SessionId, IntakeError> {
        if let Some(id) = &self.id {
            return Ok(id.clone());
        }

        let response = backend
            .start_session(INTAKE_MODE)
            .map_err(|e| IntakeError::SessionUnavailable(e.to_string()))?;
        let session_id = response.session_id.trim();
        if session_id.is_empty() {
            return Err(IntakeError::SessionUnavailable(
                "service returned an empty session id".into(),
            ));
        }

        let id = SessionId::new(session_id);
        tracing::info!(session_id = %id, "Intake session started");
        self.id = Some(id.clone());
        Ok(id)
    }

    pub fn current(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    pub fn reset(&mut self) {
        self.id = None;
    }
}
