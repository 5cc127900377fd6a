//! One intake conversation: transcript, progress, symptoms, session, assessment.
//!
//! All mutation happens in short synchronous steps. An external call is
//! bracketed by a `begin_*` step that hands out a ticket and a matching
//! `complete_*`/`finish_*` step that applies the result. Only one ticket may be
//! outstanding at a time.

use serde::Serialize;
use uuid::Uuid;

use super::orchestrator::{crisis_payload, turn_payload};
use super::prompts;
use super::{ConversationStateMachine, IntakeError, IntakeState, SessionHandle, SymptomAggregator};
use crate::backend::{ChatTurnResponse, SessionId};
use crate::config::ProgressionThreshold;
use crate::models::{Assessment, Attachment, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    Turn,
    Analysis,
}

/// Handed out when a chat turn is dispatched.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    pub generation: u64,
    pub session: SessionHandle,
    pub text: String,
}

/// Handed out when an analysis request is dispatched.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub generation: u64,
    pub session_id: SessionId,
    pub session_symptoms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Normal reply; `assessment_available` says whether the trigger is offered.
    Replied {
        message: Message,
        level: u8,
        assessment_available: bool,
    },
    Crisis {
        message: Message,
    },
    /// The call failed; `message` is the synthetic notice that was appended.
    Failed {
        error: IntakeError,
        message: Message,
    },
    /// The text was an alternate results trigger and ran the assessment.
    AssessmentRequested(AssessmentOutcome),
    /// The conversation was reset while the call was outstanding.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentOutcome {
    Rendered {
        assessment: Box<Assessment>,
        message: Message,
    },
    Failed {
        error: IntakeError,
        message: Message,
    },
    Discarded,
}

/// Read-only snapshot for display.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub id: Uuid,
    pub state: IntakeState,
    pub messages: Vec<Message>,
    pub symptoms: Vec<String>,
    pub assessment_available: bool,
    pub in_flight: Option<DispatchKind>,
    pub has_assessment: bool,
}

#[derive(Debug)]
pub struct Conversation {
    id: Uuid,
    generation: u64,
    session: SessionHandle,
    symptoms: SymptomAggregator,
    machine: ConversationStateMachine,
    messages: Vec<Message>,
    next_id: u64,
    completed_turns: usize,
    assessment: Option<Assessment>,
    placeholder: Option<Message>,
    in_flight: Option<DispatchKind>,
}

impl Conversation {
    /// Fresh conversation opening with the greeting.
    pub fn new(generation: u64, threshold: ProgressionThreshold) -> Self {
        let mut conversation = Self {
            id: Uuid::new_v4(),
            generation,
            session: SessionHandle::new(),
            symptoms: SymptomAggregator::new(),
            machine: ConversationStateMachine::new(threshold),
            messages: Vec::new(),
            next_id: 1,
            completed_turns: 0,
            assessment: None,
            placeholder: None,
            in_flight: None,
        };
        conversation.push_assistant(prompts::GREETING, None);
        conversation
    }

    /// Conversation continuing a persisted transcript.
    ///
    /// Only the messages come back; progress, symptoms, session and
    /// assessment start fresh. An empty transcript yields [`Conversation::new`].
    pub fn restore(generation: u64, threshold: ProgressionThreshold, messages: Vec<Message>) -> Self {
        if messages.is_empty() {
            return Self::new(generation, threshold);
        }
        let next_id = messages.iter().map(Message::id).max().unwrap_or(0) + 1;
        Self {
            id: Uuid::new_v4(),
            generation,
            session: SessionHandle::new(),
            symptoms: SymptomAggregator::new(),
            machine: ConversationStateMachine::new(threshold),
            messages,
            next_id,
            completed_turns: 0,
            assessment: None,
            placeholder: None,
            in_flight: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a ticket from `generation` still belongs to this conversation.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> IntakeState {
        self.machine.state()
    }

    pub fn level(&self) -> u8 {
        self.machine.level()
    }

    pub fn symptoms(&self) -> &[String] {
        self.symptoms.as_slice()
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.current()
    }

    pub fn assessment_available(&self) -> bool {
        self.machine.assessment_available()
    }

    pub fn in_flight(&self) -> Option<DispatchKind> {
        self.in_flight
    }

    pub fn view(&self) -> ConversationView {
        let mut messages = self.messages.clone();
        if let Some(placeholder) = &self.placeholder {
            messages.push(placeholder.clone());
        }
        ConversationView {
            id: self.id,
            state: self.machine.state(),
            messages,
            symptoms: self.symptoms.snapshot(),
            assessment_available: self.machine.assessment_available(),
            in_flight: self.in_flight,
            has_assessment: self.assessment.is_some(),
        }
    }

    fn push_user(&mut self, text: &str) -> Message {
        let message = Message::user(self.next_id, text);
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }

    fn push_assistant(&mut self, text: &str, attachment: Option<Attachment>) -> Message {
        let message = Message::assistant(self.next_id, text, attachment);
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }

    // ═══════════════════════════════════════════
    // Chat turns
    // ═══════════════════════════════════════════

    /// Record the user's message and reserve the in-flight slot.
    ///
    /// Rejections leave the conversation untouched.
    pub fn begin_turn(&mut self, text: &str) -> Result<TurnTicket, IntakeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(IntakeError::InvalidInput);
        }
        if self.in_flight.is_some() {
            return Err(IntakeError::Busy);
        }
        if self.machine.is_rendered() {
            return Err(IntakeError::IntakeClosed);
        }

        self.push_user(text);
        self.in_flight = Some(DispatchKind::Turn);
        Ok(TurnTicket {
            generation: self.generation,
            session: self.session.clone(),
            text: text.to_string(),
        })
    }

    /// Apply the result of a dispatched chat turn.
    ///
    /// `session` is the handle as it stands after the call, so a session
    /// created during dispatch is kept.
    pub fn complete_turn(
        &mut self,
        session: SessionHandle,
        result: Result<ChatTurnResponse, IntakeError>,
        base_url: &str,
    ) -> TurnOutcome {
        self.in_flight = None;
        self.session = session;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    conversation_id = %self.id,
                    level = self.machine.level(),
                    error = %error,
                    "Chat turn failed"
                );
                let message = self.push_assistant(&prompts::turn_failed_notice(base_url), None);
                return TurnOutcome::Failed { error, message };
            }
        };

        self.completed_turns += 1;

        // Crisis replies bypass progression and symptom merging
        if response.is_crisis() {
            let payload = crisis_payload(&response);
            tracing::warn!(conversation_id = %self.id, "Crisis response received");
            let text = payload.message.clone();
            let message = self.push_assistant(&text, Some(Attachment::Turn(payload)));
            return TurnOutcome::Crisis { message };
        }

        self.symptoms.merge(response.symptoms());
        let progress = self.machine.complete_turn();
        if progress.became_ready {
            tracing::info!(conversation_id = %self.id, level = progress.level, "Assessment now available");
        }
        let reply = self
            .machine
            .select_reply(response.reply_message(), self.symptoms.as_slice());
        let payload = turn_payload(&response, &reply);

        let available = self.machine.assessment_available();
        let text = if available {
            format!("{reply}\n\n{}", prompts::READY_NOTE)
        } else {
            reply
        };

        tracing::info!(
            conversation_id = %self.id,
            level = progress.level,
            symptoms = self.symptoms.len(),
            ready = available,
            "Chat turn completed"
        );
        let message = self.push_assistant(&text, Some(Attachment::Turn(payload)));
        TurnOutcome::Replied {
            message,
            level: progress.level,
            assessment_available: available,
        }
    }

    // ═══════════════════════════════════════════
    // Assessment
    // ═══════════════════════════════════════════

    fn check_analysis_allowed(&self) -> Result<SessionId, IntakeError> {
        if self.in_flight.is_some() {
            return Err(IntakeError::Busy);
        }
        if !self.machine.assessment_available() {
            return Err(IntakeError::AssessmentNotReady("intake is not complete yet"));
        }
        if self.completed_turns == 0 {
            return Err(IntakeError::AssessmentNotReady("no user turn has been answered"));
        }
        self.session
            .current()
            .cloned()
            .ok_or(IntakeError::AssessmentNotReady("no active session"))
    }

    /// Reserve the slot for an analysis call and show the placeholder.
    pub fn begin_analysis(&mut self) -> Result<AnalysisTicket, IntakeError> {
        let session_id = self.check_analysis_allowed()?;
        self.placeholder = Some(Message::assistant(
            self.next_id,
            prompts::ANALYZING_PLACEHOLDER,
            None,
        ));
        self.in_flight = Some(DispatchKind::Analysis);
        tracing::info!(conversation_id = %self.id, "Assessment dispatched");
        Ok(AnalysisTicket {
            generation: self.generation,
            session_id,
            session_symptoms: self.symptoms.snapshot(),
        })
    }

    /// Record a results-trigger phrase as a user message, then dispatch analysis.
    pub fn begin_results_request(&mut self, text: &str) -> Result<AnalysisTicket, IntakeError> {
        self.check_analysis_allowed()?;
        self.push_user(text.trim());
        self.begin_analysis()
    }

    /// Apply the result of a dispatched analysis call.
    ///
    /// The placeholder is removed either way. On failure the prior
    /// assessment and intake state are untouched.
    pub fn finish_analysis(
        &mut self,
        result: Result<Assessment, IntakeError>,
        base_url: &str,
    ) -> AssessmentOutcome {
        self.in_flight = None;
        self.placeholder = None;

        match result {
            Ok(assessment) => {
                self.assessment = Some(assessment.clone());
                self.machine.mark_rendered();
                let message = self.push_assistant(
                    prompts::ASSESSMENT_READY,
                    Some(Attachment::Assessment(Box::new(assessment.clone()))),
                );
                tracing::info!(
                    conversation_id = %self.id,
                    conditions = assessment.conditions.len(),
                    "Assessment rendered"
                );
                AssessmentOutcome::Rendered {
                    assessment: Box::new(assessment),
                    message,
                }
            }
            Err(error) => {
                tracing::warn!(conversation_id = %self.id, error = %error, "Assessment failed");
                let message =
                    self.push_assistant(&prompts::analysis_failed_notice(base_url), None);
                AssessmentOutcome::Failed { error, message }
            }
        }
    }
}
