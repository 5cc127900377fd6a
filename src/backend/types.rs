//! Wire types for the analysis service's JSON API.
//!
//! Field names follow the service. Optional collections are `Option` because the
//! service sends `null` as readily as it omits them.

use serde::{Deserialize, Serialize};

use crate::models::{CrisisResource, TurnKind};

/// Request body for `POST /api/start-session`
#[derive(Debug, Serialize)]
pub struct StartSessionRequest<'a> {
    #[serde(rename = "type")]
    pub intake_type: &'a str,
}

/// Response body from `POST /api/start-session`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    #[serde(rename = "type", default)]
    pub intake_type: Option<String>,
    /// Welcome message for chat sessions.
    #[serde(default)]
    pub message: Option<TurnReply>,
}

/// Request body for `POST /api/chat/message`
#[derive(Debug, Serialize)]
pub struct ChatTurnRequest<'a> {
    pub session_id: &'a str,
    pub message: &'a str,
}

/// Response body from `POST /api/chat/message`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatTurnResponse {
    #[serde(default)]
    pub response: Option<TurnReply>,
    #[serde(default)]
    pub symptoms_detected: Option<Vec<String>>,
}

/// The service answers either with a structured reply or a bare string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TurnReply {
    Structured(ChatReply),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<TurnKind>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub crisis_resources: Option<Vec<CrisisResource>>,
}

impl ChatTurnResponse {
    /// Conversational text supplied by the service, if any (blank counts as none).
    pub fn reply_message(&self) -> Option<&str> {
        let text = match self.response.as_ref()? {
            TurnReply::Structured(reply) => reply.message.as_deref()?,
            TurnReply::Text(text) => text.as_str(),
        };
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    }

    pub fn kind(&self) -> TurnKind {
        match &self.response {
            Some(TurnReply::Structured(ChatReply { kind: Some(kind), .. })) => *kind,
            _ => TurnKind::FollowUp,
        }
    }

    pub fn is_crisis(&self) -> bool {
        self.kind().is_crisis()
    }

    pub fn level(&self) -> Option<u8> {
        match &self.response {
            Some(TurnReply::Structured(reply)) => reply.level,
            _ => None,
        }
    }

    pub fn crisis_resources(&self) -> &[CrisisResource] {
        match &self.response {
            Some(TurnReply::Structured(ChatReply {
                crisis_resources: Some(resources),
                ..
            })) => resources,
            _ => &[],
        }
    }

    pub fn symptoms(&self) -> &[String] {
        self.symptoms_detected.as_deref().unwrap_or_default()
    }
}

/// Request body for `POST /api/chat/analyze`
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub session_id: &'a str,
}

/// Response body from `POST /api/chat/analyze`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyzeResponse {
    pub results: AnalysisResults,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AnalysisResults {
    #[serde(default)]
    pub conditions_identified: Option<Vec<RawCondition>>,
    #[serde(default)]
    pub recommendations: Option<Vec<RawRecommendation>>,
    #[serde(default)]
    pub assessment_date: Option<String>,
    #[serde(default)]
    pub ml_powered: Option<bool>,
    #[serde(default)]
    pub total_symptoms_detected: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCondition {
    pub condition: String,
    pub confidence: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub matched_symptoms: Option<Vec<String>>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecommendation {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Reference entry from `GET /api/conditions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConditionsResponse {
    pub conditions: Vec<ConditionInfo>,
}
