//! Assessment requests and per-turn payload mapping, including the crisis branch.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::prompts::{ASSESSMENT_HEADLINE, EMERGENCY_INSTRUCTION};
use super::IntakeError;
use crate::backend::{AnalysisBackend, AnalysisResults, ChatTurnResponse, RawCondition, SessionId};
use crate::models::{Assessment, Condition, CrisisResource, TurnKind, TurnPayload};

/// Confidence attached to ordinary per-turn replies.
pub const TURN_CONFIDENCE: f64 = 0.8;

/// Confidence attached to crisis replies.
pub const CRISIS_CONFIDENCE: f64 = 1.0;

const CRISIS_FALLBACK_TEXT: &str = "I'm very concerned about what you've shared. Your safety is most important right now. Please reach out immediately:";

/// Contacts used when a crisis reply arrives without any resources.
pub fn default_crisis_resources() -> Vec<CrisisResource> {
    vec![
        CrisisResource {
            name: "National Suicide Prevention Lifeline".into(),
            phone: Some("1-800-273-8255".into()),
            text: None,
        },
        CrisisResource {
            name: "Crisis Text Line".into(),
            phone: None,
            text: Some("Text HOME to 741741".into()),
        },
        CrisisResource {
            name: "Emergency".into(),
            phone: Some("911".into()),
            text: None,
        },
    ]
}

/// Issues analysis requests and maps the service's results into an [`Assessment`].
pub struct AssessmentOrchestrator<'a> {
    backend: &'a dyn AnalysisBackend,
}

impl<'a> AssessmentOrchestrator<'a> {
    pub fn new(backend: &'a dyn AnalysisBackend) -> Self {
        Self { backend }
    }

    /// Perform exactly one analysis call for `session`.
    ///
    /// Any transport, status or decoding failure becomes
    /// `AnalysisUnavailable`; nothing is produced in that case.
    pub fn request_assessment(
        &self,
        session: &SessionId,
        session_symptoms: Vec<String>,
    ) -> Result<Assessment, IntakeError> {
        tracing::info!(session_id = %session, "Requesting assessment");
        let response = self.backend.analyze(session).map_err(|e| {
            tracing::warn!(session_id = %session, error = %e, "Analysis request failed");
            IntakeError::AnalysisUnavailable(e.to_string())
        })?;

        let assessment = map_analysis(&response.results, session_symptoms, Utc::now());
        tracing::info!(
            session_id = %session,
            conditions = assessment.conditions.len(),
            confidence = assessment.confidence,
            "Assessment received"
        );
        Ok(assessment)
    }
}

/// Map raw analysis results into the canonical assessment.
///
/// Condition order is kept as supplied. Confidence values are rounded to whole
/// percentages. Detected symptoms are the case-insensitive union of every
/// condition's matched symptoms in first-seen order.
pub fn map_analysis(
    results: &AnalysisResults,
    session_symptoms: Vec<String>,
    created_at: DateTime<Utc>,
) -> Assessment {
    let raw_conditions = results.conditions_identified.as_deref().unwrap_or_default();
    let conditions: Vec<Condition> = raw_conditions.iter().map(map_condition).collect();

    let mut seen = HashSet::new();
    let mut detected_symptoms = Vec::new();
    for symptom in conditions.iter().flat_map(|c| c.matched_symptoms.iter()) {
        if seen.insert(symptom.to_lowercase()) {
            detected_symptoms.push(symptom.clone());
        }
    }

    let confidence = conditions
        .first()
        .map(|c| f64::from(c.match_percentage) / 100.0)
        .unwrap_or(0.0);

    let recommendations = results
        .recommendations
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|r| r.message.clone())
        .collect();

    Assessment {
        headline: ASSESSMENT_HEADLINE.to_string(),
        detected_symptoms,
        session_symptoms,
        conditions,
        recommendations,
        confidence,
        created_at,
        assessment_date: results.assessment_date.clone(),
        ml_powered: results.ml_powered,
    }
}

fn map_condition(raw: &RawCondition) -> Condition {
    Condition {
        name: raw.condition.clone(),
        match_percentage: round_percentage(raw.confidence),
        description: raw.description.clone().unwrap_or_default(),
        severity: raw.severity.clone(),
        matched_symptoms: raw.matched_symptoms.clone().unwrap_or_default(),
    }
}

/// Nearest whole percentage, clamped to 0..=100. Non-finite input maps to 0.
fn round_percentage(confidence: f64) -> u8 {
    if !confidence.is_finite() {
        return 0;
    }
    confidence.round().clamp(0.0, 100.0) as u8
}

/// Payload for an ordinary (non-crisis) turn.
pub fn turn_payload(response: &ChatTurnResponse, message: &str) -> TurnPayload {
    TurnPayload {
        message: message.to_string(),
        detected_symptoms: response.symptoms().to_vec(),
        conditions: Vec::new(),
        recommendations: Vec::new(),
        confidence: TURN_CONFIDENCE,
        level: response.level(),
        kind: response.kind(),
        crisis_resources: Vec::new(),
    }
}

/// Payload for a crisis-tagged turn.
///
/// The message is the crisis text followed by every contact line it does not
/// already mention. The only recommendation is the emergency instruction.
pub fn crisis_payload(response: &ChatTurnResponse) -> TurnPayload {
    let mut resources = response.crisis_resources().to_vec();
    if resources.is_empty() {
        resources = default_crisis_resources();
    }

    let mut message = response
        .reply_message()
        .unwrap_or(CRISIS_FALLBACK_TEXT)
        .to_string();
    let missing: Vec<String> = resources
        .iter()
        .map(CrisisResource::contact_line)
        .filter(|line| !message.contains(line.as_str()))
        .collect();
    if !missing.is_empty() {
        message.push_str("\n\n");
        message.push_str(&missing.join("\n"));
    }

    TurnPayload {
        message,
        detected_symptoms: response.symptoms().to_vec(),
        conditions: Vec::new(),
        recommendations: vec![EMERGENCY_INSTRUCTION.to_string()],
        confidence: CRISIS_CONFIDENCE,
        level: response.level(),
        kind: TurnKind::Crisis,
        crisis_resources: resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};

    fn gad(confidence: f64) -> RawCondition {
        RawCondition {
            condition: "Generalized Anxiety Disorder".into(),
            confidence,
            description: Some("Persistent and excessive worry".into()),
            matched_symptoms: Some(vec!["worry".into(), "restlessness".into()]),
            severity: Some("moderate".into()),
        }
    }

    #[test]
    fn maps_single_condition() {
        let backend = MockBackend::new();
        backend.push_analysis(Ok(MockBackend::analysis(vec![gad(82.4)], &[])));
        let orchestrator = AssessmentOrchestrator::new(&backend);

        let assessment = orchestrator
            .request_assessment(&SessionId::new("s1"), vec!["anxiety".into()])
            .unwrap();

        assert_eq!(assessment.conditions.len(), 1);
        assert_eq!(assessment.conditions[0].match_percentage, 82);
        assert_eq!(assessment.conditions[0].severity.as_deref(), Some("moderate"));
        assert_eq!(assessment.confidence, 0.82);
        assert_eq!(assessment.detected_symptoms, vec!["worry", "restlessness"]);
        assert_eq!(assessment.session_symptoms, vec!["anxiety"]);
        assert_eq!(assessment.headline, ASSESSMENT_HEADLINE);
        assert_eq!(backend.analyze_calls(), 1);
    }

    #[test]
    fn detected_symptoms_union_is_case_insensitive_and_ordered() {
        let mut second = gad(40.0);
        second.condition = "Major Depressive Disorder".into();
        second.matched_symptoms = Some(vec!["Worry".into(), "sadness".into()]);
        let results = AnalysisResults {
            conditions_identified: Some(vec![gad(70.0), second]),
            ..Default::default()
        };

        let assessment = map_analysis(&results, vec![], Utc::now());
        assert_eq!(
            assessment.detected_symptoms,
            vec!["worry", "restlessness", "sadness"]
        );
    }

    #[test]
    fn order_and_recommendations_pass_through() {
        let mut low = gad(30.0);
        low.condition = "Low".into();
        let mut high = gad(90.0);
        high.condition = "High".into();
        let response = MockBackend::analysis(vec![low, high], &["Sleep hygiene", "Talk to someone"]);

        let assessment = map_analysis(&response.results, vec![], Utc::now());
        let names: Vec<&str> = assessment.conditions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Low", "High"]);
        assert_eq!(assessment.recommendations, vec!["Sleep hygiene", "Talk to someone"]);
        // Overall confidence comes from the first (supplied) condition
        assert_eq!(assessment.confidence, 0.3);
        assert_eq!(assessment.assessment_date.as_deref(), Some("2026-01-10T12:00:00"));
        assert_eq!(assessment.ml_powered, Some(false));
    }

    #[test]
    fn no_conditions_means_zero_confidence() {
        let assessment = map_analysis(&AnalysisResults::default(), vec![], Utc::now());
        assert!(assessment.conditions.is_empty());
        assert!(assessment.detected_symptoms.is_empty());
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn percentages_round_and_clamp() {
        assert_eq!(round_percentage(82.5), 83);
        assert_eq!(round_percentage(82.49), 82);
        assert_eq!(round_percentage(140.0), 100);
        assert_eq!(round_percentage(-3.0), 0);
        assert_eq!(round_percentage(f64::NAN), 0);
    }

    #[test]
    fn failed_analysis_is_unavailable() {
        let backend = MockBackend::new();
        backend.push_analysis(Err(BackendError::Status {
            status: 500,
            body: "boom".into(),
        }));
        let err = AssessmentOrchestrator::new(&backend)
            .request_assessment(&SessionId::new("s1"), vec![])
            .unwrap_err();
        assert!(matches!(err, IntakeError::AnalysisUnavailable(_)));
    }

    #[test]
    fn turn_payload_uses_normal_confidence() {
        let response = MockBackend::reply(Some("Tell me more."), &["anxiety"]);
        let payload = turn_payload(&response, "Tell me more.");
        assert_eq!(payload.confidence, TURN_CONFIDENCE);
        assert_eq!(payload.detected_symptoms, vec!["anxiety"]);
        assert!(payload.conditions.is_empty());
        assert!(!payload.is_crisis());
    }

    #[test]
    fn crisis_payload_appends_missing_contacts() {
        let response = MockBackend::crisis_reply(
            "Your safety is most important right now.",
            default_crisis_resources(),
        );
        let payload = crisis_payload(&response);

        assert!(payload.message.starts_with("Your safety is most important right now."));
        for resource in default_crisis_resources() {
            assert!(payload.message.contains(&resource.contact_line()));
        }
        assert!(payload.conditions.is_empty());
        assert_eq!(payload.confidence, 1.0);
        assert_eq!(payload.recommendations, vec![EMERGENCY_INSTRUCTION]);
        assert_eq!(payload.kind, TurnKind::Crisis);
    }

    #[test]
    fn crisis_payload_does_not_repeat_listed_contacts() {
        let text = "Please reach out:\n\nEmergency: 911";
        let response = MockBackend::crisis_reply(
            text,
            vec![CrisisResource {
                name: "Emergency".into(),
                phone: Some("911".into()),
                text: None,
            }],
        );
        assert_eq!(crisis_payload(&response).message, text);
    }
}
