use serde::Serialize;

use super::prompts;
use crate::config::{ProgressionThreshold, MAX_LEVEL};

/// Externally visible intake phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IntakeState {
    Intake { level: u8 },
    ReadyForAssessment { level: u8 },
    AssessmentRendered { level: u8 },
}

impl IntakeState {
    pub fn level(self) -> u8 {
        match self {
            Self::Intake { level }
            | Self::ReadyForAssessment { level }
            | Self::AssessmentRendered { level } => level,
        }
    }
}

/// Result of [`ConversationStateMachine::complete_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnProgress {
    pub level: u8,
    /// The assessment trigger was not available before this turn and is now.
    pub became_ready: bool,
}

/// Tracks intake progress and decides when the assessment becomes available.
///
/// Level starts at 1, advances by one per completed user turn and clamps at
/// [`MAX_LEVEL`]. It never decreases except through [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct ConversationStateMachine {
    level: u8,
    threshold: u8,
    rendered: bool,
}

impl ConversationStateMachine {
    pub fn new(threshold: ProgressionThreshold) -> Self {
        Self {
            level: 1,
            threshold: threshold.level(),
            rendered: false,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn state(&self) -> IntakeState {
        let level = self.level;
        if self.rendered {
            IntakeState::AssessmentRendered { level }
        } else if level >= self.threshold {
            IntakeState::ReadyForAssessment { level }
        } else {
            IntakeState::Intake { level }
        }
    }

    /// Whether the orchestrator trigger is available. Stays available after
    /// rendering so a later request can supersede the assessment.
    pub fn assessment_available(&self) -> bool {
        self.level >= self.threshold
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Advance after a completed (non-crisis) user turn.
    pub fn complete_turn(&mut self) -> TurnProgress {
        let was_ready = self.assessment_available();
        self.level = (self.level + 1).min(MAX_LEVEL);
        let progress = TurnProgress {
            level: self.level,
            became_ready: !was_ready && self.assessment_available(),
        };
        tracing::debug!(
            level = progress.level,
            ready = self.assessment_available(),
            "Intake level advanced"
        );
        progress
    }

    /// Text to surface for the turn that just completed.
    ///
    /// A message supplied by the service wins verbatim; otherwise the canned
    /// prompt for the current level, fed with the symptom snapshot.
    pub fn select_reply(&self, external: Option<&str>, symptoms: &[String]) -> String {
        match external {
            Some(message) => message.to_string(),
            None => prompts::level_prompt(self.level, symptoms),
        }
    }

    pub fn mark_rendered(&mut self) {
        self.rendered = true;
    }

    pub fn reset(&mut self) {
        self.level = 1;
        self.rendered = false;
    }
}
