//! Thread-safe owner of the active conversation.
//!
//! Each operation takes the lock only for its synchronous steps. External calls
//! run with the lock released; their results are applied only if the
//! conversation that dispatched them is still the active one.

use std::sync::{Arc, Mutex, MutexGuard};

use super::orchestrator::AssessmentOrchestrator;
use super::prompts;
use super::{
    AnalysisTicket, AssessmentOutcome, Conversation, ConversationView, IntakeError, TurnOutcome,
};
use crate::backend::{AnalysisBackend, ConditionInfo};
use crate::config::{IntakeConfig, IntakeSettings, TRANSCRIPT_STORAGE_KEY};
use crate::db::{DatabaseError, TranscriptStore};
use crate::models::{Assessment, Message};
use crate::report::{self, Downloadable, Report, ReportError, ReportFormat};

struct Inner {
    conversation: Conversation,
    /// Present only when the transcript is persisted.
    store: Option<TranscriptStore>,
    next_generation: u64,
}

impl Inner {
    fn persist(&mut self) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.save(TRANSCRIPT_STORAGE_KEY, self.conversation.messages()) {
                tracing::warn!(error = %e, "Failed to save transcript");
            }
        }
    }
}

pub struct IntakeService {
    backend: Arc<dyn AnalysisBackend>,
    settings: IntakeSettings,
    inner: Mutex<Inner>,
}

impl IntakeService {
    /// In-memory service without transcript persistence.
    pub fn new(settings: IntakeSettings, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self::build(settings, backend, None, Vec::new())
    }

    /// Service with the given store. The stored transcript is resumed when
    /// persistence is on and cleared otherwise.
    pub fn with_store(
        settings: IntakeSettings,
        backend: Arc<dyn AnalysisBackend>,
        store: TranscriptStore,
    ) -> Result<Self, DatabaseError> {
        if settings.persist_transcript {
            let messages = store.load(TRANSCRIPT_STORAGE_KEY)?;
            tracing::info!(messages = messages.len(), "Transcript restored");
            Ok(Self::build(settings, backend, Some(store), messages))
        } else {
            store.clear(TRANSCRIPT_STORAGE_KEY)?;
            Ok(Self::build(settings, backend, None, Vec::new()))
        }
    }

    /// Open the transcript database under the configured data directory.
    pub fn open(
        config: &IntakeConfig,
        backend: Arc<dyn AnalysisBackend>,
    ) -> Result<Self, DatabaseError> {
        let store = TranscriptStore::open(&config.storage.transcript_db_path())?;
        Self::with_store(config.intake.clone(), backend, store)
    }

    fn build(
        settings: IntakeSettings,
        backend: Arc<dyn AnalysisBackend>,
        store: Option<TranscriptStore>,
        messages: Vec<Message>,
    ) -> Self {
        let conversation =
            Conversation::restore(1, settings.progression_threshold, messages);
        let mut inner = Inner {
            conversation,
            store,
            next_generation: 2,
        };
        inner.persist();
        Self {
            backend,
            settings,
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, IntakeError> {
        self.inner.lock().map_err(|_| IntakeError::LockPoisoned)
    }

    pub fn backend_url(&self) -> &str {
        self.backend.base_url()
    }

    // ═══════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════

    /// Submit one user turn.
    ///
    /// Rejections (`InvalidInput`, `Busy`, `IntakeClosed`) come back as `Err`
    /// with nothing changed. Call failures are recorded in the transcript and
    /// returned as [`TurnOutcome::Failed`].
    pub fn submit_turn(&self, text: &str) -> Result<TurnOutcome, IntakeError> {
        let ticket = {
            let mut inner = self.lock()?;

            if self.settings.results_trigger
                && prompts::is_results_trigger(text)
                && inner.conversation.assessment_available()
            {
                let ticket = inner.conversation.begin_results_request(text)?;
                inner.persist();
                drop(inner);
                return Ok(TurnOutcome::AssessmentRequested(self.run_analysis(ticket)?));
            }

            let ticket = inner.conversation.begin_turn(text)?;
            inner.persist();
            ticket
        };

        let mut session = ticket.session.clone();
        let result = session.ensure(self.backend.as_ref()).and_then(|session_id| {
            self.backend
                .chat_turn(&session_id, &ticket.text)
                .map_err(|e| IntakeError::TurnFailed(e.to_string()))
        });

        let mut inner = self.lock()?;
        if !inner.conversation.is_current(ticket.generation) {
            tracing::debug!(
                generation = ticket.generation,
                current = inner.conversation.generation(),
                "Dropping stale chat turn response"
            );
            return Ok(TurnOutcome::Discarded);
        }
        let outcome = inner
            .conversation
            .complete_turn(session, result, self.backend.base_url());
        inner.persist();
        Ok(outcome)
    }

    /// Request the assessment for the active conversation.
    pub fn request_assessment(&self) -> Result<AssessmentOutcome, IntakeError> {
        let ticket = self.lock()?.conversation.begin_analysis()?;
        self.run_analysis(ticket)
    }

    fn run_analysis(&self, ticket: AnalysisTicket) -> Result<AssessmentOutcome, IntakeError> {
        let result = AssessmentOrchestrator::new(self.backend.as_ref())
            .request_assessment(&ticket.session_id, ticket.session_symptoms);

        let mut inner = self.lock()?;
        if !inner.conversation.is_current(ticket.generation) {
            tracing::debug!(
                generation = ticket.generation,
                current = inner.conversation.generation(),
                "Dropping stale assessment"
            );
            return Ok(AssessmentOutcome::Discarded);
        }
        let outcome = inner
            .conversation
            .finish_analysis(result, self.backend.base_url());
        inner.persist();
        Ok(outcome)
    }

    /// Start a new conversation. Outstanding calls are not aborted; their
    /// results are dropped when they arrive.
    pub fn reset(&self) -> Result<ConversationView, IntakeError> {
        let mut inner = self.lock()?;
        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.conversation = Conversation::new(generation, self.settings.progression_threshold);

        if let Some(store) = inner.store.as_ref() {
            if let Err(e) = store.clear(TRANSCRIPT_STORAGE_KEY) {
                tracing::warn!(error = %e, "Failed to clear transcript");
            }
        }
        inner.persist();
        tracing::info!(
            conversation_id = %inner.conversation.id(),
            generation,
            "Conversation reset"
        );
        Ok(inner.conversation.view())
    }

    pub fn view(&self) -> Result<ConversationView, IntakeError> {
        Ok(self.lock()?.conversation.view())
    }

    pub fn assessment(&self) -> Result<Option<Assessment>, IntakeError> {
        Ok(self.lock()?.conversation.assessment().cloned())
    }

    /// Rendered report for the current assessment, if there is one.
    pub fn report(&self) -> Result<Option<Report>, IntakeError> {
        Ok(self.assessment()?.as_ref().map(report::render))
    }

    /// Downloadable artifact for the current assessment.
    pub fn download(&self, format: ReportFormat) -> Result<Downloadable, ServiceReportError> {
        let report = self.report()?.ok_or(ServiceReportError::NoAssessment)?;
        Ok(report::to_downloadable(&report, format)?)
    }

    /// `get-conditions` pass-through.
    pub fn conditions(&self) -> Result<Vec<ConditionInfo>, crate::backend::BackendError> {
        self.backend.conditions()
    }

    /// `health` pass-through.
    pub fn health(&self) -> bool {
        self.backend.health()
    }
}

/// Failure to produce a downloadable report.
#[derive(Debug, thiserror::Error)]
pub enum ServiceReportError {
    #[error("No assessment has been generated yet")]
    NoAssessment,

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AnalyzeResponse, BackendError, ChatTurnResponse, MockBackend, RawCondition, SessionId,
        StartSessionResponse,
    };
    use crate::config::ProgressionThreshold;
    use crate::intake::IntakeState;
    use std::sync::mpsc;
    use std::thread;

    fn settings(threshold: ProgressionThreshold) -> IntakeSettings {
        IntakeSettings {
            progression_threshold: threshold,
            persist_transcript: false,
            results_trigger: false,
        }
    }

    fn service_with(mock: Arc<MockBackend>) -> IntakeService {
        IntakeService::new(settings(ProgressionThreshold::Five), mock)
    }

    fn gad() -> RawCondition {
        RawCondition {
            condition: "Generalized Anxiety Disorder".into(),
            confidence: 82.4,
            description: Some("Persistent and excessive worry".into()),
            matched_symptoms: Some(vec!["worry".into(), "restlessness".into()]),
            severity: Some("moderate".into()),
        }
    }

    fn drive_to_ready(service: &IntakeService) {
        for i in 0..4 {
            service.submit_turn(&format!("turn {i}")).unwrap();
        }
        assert!(service.view().unwrap().assessment_available);
    }

    #[test]
    fn first_turn_creates_session_and_advances() {
        let mock = Arc::new(MockBackend::new());
        mock.push_turn(Ok(MockBackend::reply(None, &["anxiety", "worry"])));
        let service = service_with(mock.clone());

        let outcome = service
            .submit_turn("I feel anxious and worried all the time")
            .unwrap();

        assert!(matches!(outcome, TurnOutcome::Replied { level: 2, .. }));
        let view = service.view().unwrap();
        assert_eq!(view.state, IntakeState::Intake { level: 2 });
        assert_eq!(view.symptoms, vec!["anxiety", "worry"]);
        assert_eq!(mock.session_calls(), 1);
        assert_eq!(mock.sent_messages(), vec!["I feel anxious and worried all the time"]);
    }

    #[test]
    fn session_is_reused_across_turns() {
        let mock = Arc::new(MockBackend::new());
        let service = service_with(mock.clone());
        service.submit_turn("one").unwrap();
        service.submit_turn("two").unwrap();
        assert_eq!(mock.session_calls(), 1);
        assert_eq!(mock.turn_calls(), 2);
    }

    #[test]
    fn session_failure_is_recorded_and_retried() {
        let mock = Arc::new(MockBackend::new());
        mock.push_session(Err(BackendError::Connection("http://mock.invalid".into())));
        let service = service_with(mock.clone());

        let outcome = service.submit_turn("hello").unwrap();
        match outcome {
            TurnOutcome::Failed { error, message } => {
                assert!(matches!(error, IntakeError::SessionUnavailable(_)));
                assert!(message.text().contains("http://mock.invalid"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(mock.turn_calls(), 0);
        assert_eq!(service.view().unwrap().state.level(), 1);

        service.submit_turn("hello again").unwrap();
        assert_eq!(mock.session_calls(), 2);
        assert_eq!(service.view().unwrap().state.level(), 2);
    }

    #[test]
    fn empty_input_is_rejected_without_dispatch() {
        let mock = Arc::new(MockBackend::new());
        let service = service_with(mock.clone());
        assert_eq!(service.submit_turn(" \n ").unwrap_err(), IntakeError::InvalidInput);
        assert_eq!(mock.session_calls(), 0);
        assert_eq!(service.view().unwrap().messages.len(), 1);
    }

    #[test]
    fn four_silent_turns_make_assessment_available() {
        let mock = Arc::new(MockBackend::new());
        let service = service_with(mock);
        drive_to_ready(&service);
        let view = service.view().unwrap();
        assert_eq!(view.state, IntakeState::ReadyForAssessment { level: 5 });
        assert!(view.symptoms.is_empty());
    }

    #[test]
    fn threshold_four_is_configurable() {
        let mock = Arc::new(MockBackend::new());
        let service = IntakeService::new(settings(ProgressionThreshold::Four), mock);
        for i in 0..3 {
            service.submit_turn(&format!("turn {i}")).unwrap();
        }
        assert_eq!(
            service.view().unwrap().state,
            IntakeState::ReadyForAssessment { level: 4 }
        );
    }

    #[test]
    fn assessment_before_ready_is_rejected() {
        let mock = Arc::new(MockBackend::new());
        let service = service_with(mock.clone());
        service.submit_turn("hi").unwrap();
        assert!(matches!(
            service.request_assessment(),
            Err(IntakeError::AssessmentNotReady(_))
        ));
        assert_eq!(mock.analyze_calls(), 0);
    }

    #[test]
    fn assessment_maps_and_renders() {
        let mock = Arc::new(MockBackend::new());
        mock.push_analysis(Ok(MockBackend::analysis(vec![gad()], &["Practice relaxation"])));
        let service = service_with(mock.clone());
        drive_to_ready(&service);

        let outcome = service.request_assessment().unwrap();
        let assessment = match outcome {
            AssessmentOutcome::Rendered { assessment, .. } => assessment,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(assessment.conditions[0].match_percentage, 82);
        assert_eq!(assessment.confidence, 0.82);
        assert_eq!(assessment.detected_symptoms, vec!["worry", "restlessness"]);
        assert_eq!(
            service.view().unwrap().state,
            IntakeState::AssessmentRendered { level: 5 }
        );
        assert!(service.report().unwrap().is_some());
        assert_eq!(
            service.submit_turn("more").unwrap_err(),
            IntakeError::IntakeClosed
        );
    }

    #[test]
    fn failed_assessment_allows_retry() {
        let mock = Arc::new(MockBackend::new());
        mock.push_analysis(Err(BackendError::Connection("http://mock.invalid".into())));
        mock.push_analysis(Ok(MockBackend::analysis(vec![gad()], &[])));
        let service = service_with(mock.clone());
        drive_to_ready(&service);

        let first = service.request_assessment().unwrap();
        assert!(matches!(first, AssessmentOutcome::Failed { .. }));
        assert!(service.assessment().unwrap().is_none());
        assert_eq!(
            service.view().unwrap().state,
            IntakeState::ReadyForAssessment { level: 5 }
        );

        let second = service.request_assessment().unwrap();
        assert!(matches!(second, AssessmentOutcome::Rendered { .. }));
        assert_eq!(mock.analyze_calls(), 2);
    }

    #[test]
    fn results_trigger_runs_assessment_when_enabled() {
        let mock = Arc::new(MockBackend::new());
        let mut s = settings(ProgressionThreshold::Five);
        s.results_trigger = true;
        let service = IntakeService::new(s, mock.clone());
        drive_to_ready(&service);

        let outcome = service.submit_turn("Show my results").unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::AssessmentRequested(AssessmentOutcome::Rendered { .. })
        ));
        assert_eq!(mock.turn_calls(), 4);
        assert_eq!(mock.analyze_calls(), 1);
    }

    #[test]
    fn results_phrase_is_a_normal_turn_when_disabled() {
        let mock = Arc::new(MockBackend::new());
        let service = service_with(mock.clone());
        drive_to_ready(&service);
        let outcome = service.submit_turn("show my results").unwrap();
        assert!(matches!(outcome, TurnOutcome::Replied { .. }));
        assert_eq!(mock.analyze_calls(), 0);
    }

    #[test]
    fn reset_starts_fresh() {
        let mock = Arc::new(MockBackend::new());
        let service = service_with(mock.clone());
        service.submit_turn("hello").unwrap();
        let before = service.view().unwrap().id;

        let view = service.reset().unwrap();
        assert_ne!(view.id, before);
        assert_eq!(view.state, IntakeState::Intake { level: 1 });
        assert_eq!(view.messages.len(), 1);

        service.submit_turn("new start").unwrap();
        assert_eq!(mock.session_calls(), 2);
    }

    #[test]
    fn persisted_transcript_is_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.db");
        let mut s = settings(ProgressionThreshold::Five);
        s.persist_transcript = true;

        let first = IntakeService::with_store(
            s.clone(),
            Arc::new(MockBackend::new()),
            TranscriptStore::open(&path).unwrap(),
        )
        .unwrap();
        first.submit_turn("I can't sleep").unwrap();
        let saved = first.view().unwrap().messages;
        drop(first);

        let second = IntakeService::with_store(
            s,
            Arc::new(MockBackend::new()),
            TranscriptStore::open(&path).unwrap(),
        )
        .unwrap();
        let view = second.view().unwrap();
        assert_eq!(view.messages, saved);
        assert_eq!(view.state.level(), 1);
    }

    #[test]
    fn transcript_is_cleared_when_persistence_is_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.db");
        {
            let mut store = TranscriptStore::open(&path).unwrap();
            store
                .save(TRANSCRIPT_STORAGE_KEY, &[Message::user(2, "old")])
                .unwrap();
        }

        let service = IntakeService::with_store(
            settings(ProgressionThreshold::Five),
            Arc::new(MockBackend::new()),
            TranscriptStore::open(&path).unwrap(),
        )
        .unwrap();
        assert_eq!(service.view().unwrap().messages.len(), 1);

        let store = TranscriptStore::open(&path).unwrap();
        assert!(store.load(TRANSCRIPT_STORAGE_KEY).unwrap().is_empty());
    }

    #[test]
    fn pass_throughs() {
        let service = service_with(Arc::new(MockBackend::new().unhealthy()));
        assert!(!service.health());
        assert_eq!(service.conditions().unwrap().len(), 2);
        assert_eq!(service.backend_url(), "http://mock.invalid");
    }

    // ── Reset during an outstanding call ─────────────────

    /// Blocks `analyze` and `chat_turn` until released, signalling on entry.
    struct GatedBackend {
        inner: MockBackend,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl GatedBackend {
        fn new() -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            let backend = Arc::new(Self {
                inner: MockBackend::new(),
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            });
            (backend, entered_rx, release_tx)
        }

        fn wait(&self) {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
    }

    impl AnalysisBackend for GatedBackend {
        fn start_session(&self, intake_type: &str) -> Result<StartSessionResponse, BackendError> {
            self.inner.start_session(intake_type)
        }

        fn chat_turn(
            &self,
            session_id: &SessionId,
            message: &str,
        ) -> Result<ChatTurnResponse, BackendError> {
            if message == "gated" {
                self.wait();
            }
            self.inner.chat_turn(session_id, message)
        }

        fn analyze(&self, session_id: &SessionId) -> Result<AnalyzeResponse, BackendError> {
            self.wait();
            self.inner.analyze(session_id)
        }

        fn conditions(&self) -> Result<Vec<ConditionInfo>, BackendError> {
            self.inner.conditions()
        }

        fn health(&self) -> bool {
            true
        }

        fn base_url(&self) -> &str {
            self.inner.base_url()
        }
    }

    #[test]
    fn reset_during_analysis_drops_late_result() {
        let (backend, entered, release) = GatedBackend::new();
        backend
            .inner
            .push_analysis(Ok(MockBackend::analysis(vec![gad()], &[])));
        let service = Arc::new(IntakeService::new(
            settings(ProgressionThreshold::Five),
            backend.clone(),
        ));
        drive_to_ready(&service);

        let worker = {
            let service = Arc::clone(&service);
            thread::spawn(move || service.request_assessment())
        };
        entered.recv().unwrap();

        // Outstanding call: second submission is rejected, placeholder visible
        assert_eq!(service.submit_turn("anything").unwrap_err(), IntakeError::Busy);
        assert_eq!(
            service.view().unwrap().messages.last().map(|m| m.text().to_string()),
            Some(prompts::ANALYZING_PLACEHOLDER.to_string())
        );

        service.reset().unwrap();
        release.send(()).unwrap();

        let outcome = worker.join().unwrap().unwrap();
        assert_eq!(outcome, AssessmentOutcome::Discarded);
        assert!(service.assessment().unwrap().is_none());
        let view = service.view().unwrap();
        assert_eq!(view.state, IntakeState::Intake { level: 1 });
        assert_eq!(view.messages.len(), 1);
    }

    #[test]
    fn reset_during_turn_drops_late_reply() {
        let (backend, entered, release) = GatedBackend::new();
        backend
            .inner
            .push_turn(Ok(MockBackend::reply(Some("late"), &["panic"])));
        let service = Arc::new(IntakeService::new(
            settings(ProgressionThreshold::Five),
            backend.clone(),
        ));

        let worker = {
            let service = Arc::clone(&service);
            thread::spawn(move || service.submit_turn("gated"))
        };
        entered.recv().unwrap();
        service.reset().unwrap();
        release.send(()).unwrap();

        assert_eq!(worker.join().unwrap().unwrap(), TurnOutcome::Discarded);
        let view = service.view().unwrap();
        assert!(view.symptoms.is_empty());
        assert!(view.messages.iter().all(|m| m.text() != "late"));
    }
}
