//! Conversational intake: session, symptom aggregation, progression, assessment.
//!
//! `IntakeService` is the entry point. It owns one `Conversation` at a time and
//! serialises access to it; everything below it is plain single-owner state.

pub mod conversation;
pub mod orchestrator;
pub mod prompts;
pub mod service;
pub mod session;
pub mod state;
pub mod symptoms;

pub use conversation::*;
pub use orchestrator::*;
pub use service::*;
pub use session::*;
pub use state::*;
pub use symptoms::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Could not start an intake session: {0}")]
    SessionUnavailable(String),

    #[error("Chat turn failed: {0}")]
    TurnFailed(String),

    #[error("Assessment is unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("Message is empty")]
    InvalidInput,

    #[error("Another request is still in progress")]
    Busy,

    #[error("Intake is complete; start a new conversation to continue")]
    IntakeClosed,

    #[error("Assessment cannot be requested yet: {0}")]
    AssessmentNotReady(&'static str),

    #[error("Internal lock error")]
    LockPoisoned,
}
