use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::types::*;
use super::{AnalysisBackend, BackendError, SessionId};
use crate::models::TurnKind;

/// Scripted analysis service for tests and offline runs.
///
/// Each call pops the next scripted result for its endpoint. When a queue is
/// empty a benign default is returned: a fresh session id, a reply without a
/// message, or an analysis with no conditions.
pub struct MockBackend {
    sessions: Mutex<VecDeque<Result<StartSessionResponse, BackendError>>>,
    turns: Mutex<VecDeque<Result<ChatTurnResponse, BackendError>>>,
    analyses: Mutex<VecDeque<Result<AnalyzeResponse, BackendError>>>,
    sent_messages: Mutex<Vec<String>>,
    session_calls: AtomicUsize,
    turn_calls: AtomicUsize,
    analyze_calls: AtomicUsize,
    healthy: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(VecDeque::new()),
            turns: Mutex::new(VecDeque::new()),
            analyses: Mutex::new(VecDeque::new()),
            sent_messages: Mutex::new(Vec::new()),
            session_calls: AtomicUsize::new(0),
            turn_calls: AtomicUsize::new(0),
            analyze_calls: AtomicUsize::new(0),
            healthy: true,
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn push_session(&self, result: Result<StartSessionResponse, BackendError>) {
        if let Ok(mut q) = self.sessions.lock() {
            q.push_back(result);
        }
    }

    pub fn push_turn(&self, result: Result<ChatTurnResponse, BackendError>) {
        if let Ok(mut q) = self.turns.lock() {
            q.push_back(result);
        }
    }

    pub fn push_analysis(&self, result: Result<AnalyzeResponse, BackendError>) {
        if let Ok(mut q) = self.analyses.lock() {
            q.push_back(result);
        }
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn turn_calls(&self) -> usize {
        self.turn_calls.load(Ordering::SeqCst)
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    /// Messages received by `chat_turn`, in order.
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent_messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    // ── Response builders ──────────────────────────────────

    /// A structured follow-up reply.
    pub fn reply(message: Option<&str>, symptoms: &[&str]) -> ChatTurnResponse {
        ChatTurnResponse {
            response: Some(TurnReply::Structured(ChatReply {
                message: message.map(String::from),
                kind: Some(TurnKind::FollowUp),
                level: None,
                crisis_resources: None,
            })),
            symptoms_detected: Some(symptoms.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// A crisis-tagged reply with the given resources.
    pub fn crisis_reply(message: &str, resources: Vec<crate::models::CrisisResource>) -> ChatTurnResponse {
        ChatTurnResponse {
            response: Some(TurnReply::Structured(ChatReply {
                message: Some(message.to_string()),
                kind: Some(TurnKind::Crisis),
                level: None,
                crisis_resources: Some(resources),
            })),
            symptoms_detected: Some(vec!["suicidal".into()]),
        }
    }

    /// An analysis result with the given conditions and recommendation texts.
    pub fn analysis(conditions: Vec<RawCondition>, recommendations: &[&str]) -> AnalyzeResponse {
        AnalyzeResponse {
            results: AnalysisResults {
                conditions_identified: Some(conditions),
                recommendations: Some(
                    recommendations
                        .iter()
                        .map(|m| RawRecommendation {
                            message: m.to_string(),
                            kind: None,
                        })
                        .collect(),
                ),
                assessment_date: Some("2026-01-10T12:00:00".into()),
                ml_powered: Some(false),
                total_symptoms_detected: None,
            },
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisBackend for MockBackend {
    fn start_session(&self, intake_type: &str) -> Result<StartSessionResponse, BackendError> {
        let n = self.session_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self.sessions.lock().ok().and_then(|mut q| q.pop_front());
        scripted.unwrap_or_else(|| {
            Ok(StartSessionResponse {
                session_id: format!("mock-session-{n}"),
                intake_type: Some(intake_type.to_string()),
                message: None,
            })
        })
    }

    fn chat_turn(
        &self,
        _session_id: &SessionId,
        message: &str,
    ) -> Result<ChatTurnResponse, BackendError> {
        self.turn_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sent) = self.sent_messages.lock() {
            sent.push(message.to_string());
        }
        let scripted = self.turns.lock().ok().and_then(|mut q| q.pop_front());
        scripted.unwrap_or_else(|| Ok(Self::reply(None, &[])))
    }

    fn analyze(&self, _session_id: &SessionId) -> Result<AnalyzeResponse, BackendError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.analyses.lock().ok().and_then(|mut q| q.pop_front());
        scripted.unwrap_or_else(|| Ok(Self::analysis(vec![], &[])))
    }

    fn conditions(&self) -> Result<Vec<ConditionInfo>, BackendError> {
        Ok(vec![
            ConditionInfo {
                name: "Generalized Anxiety Disorder".into(),
                description: "Persistent and excessive worry".into(),
            },
            ConditionInfo {
                name: "Major Depressive Disorder".into(),
                description: "Persistent low mood and loss of interest".into(),
            },
        ])
    }

    fn health(&self) -> bool {
        self.healthy
    }

    fn base_url(&self) -> &str {
        "http://mock.invalid"
    }
}
