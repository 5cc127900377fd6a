use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TurnKind;

/// One candidate condition surfaced by the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    /// Match confidence as an integer percentage (0-100).
    pub match_percentage: u8,
    pub description: String,
    /// Passed through unchanged from the service (e.g. "Moderate").
    pub severity: Option<String>,
    pub matched_symptoms: Vec<String>,
}

/// Canonical result of one completed analysis request.
///
/// Conditions arrive ranked by descending confidence; nothing downstream
/// re-sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub headline: String,
    /// Union of every condition's matched symptoms.
    pub detected_symptoms: Vec<String>,
    /// Running symptom set at analysis time. May differ from `detected_symptoms`.
    pub session_symptoms: Vec<String>,
    pub conditions: Vec<Condition>,
    pub recommendations: Vec<String>,
    /// Top match percentage / 100, or 0 without conditions.
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub assessment_date: Option<String>,
    pub ml_powered: Option<bool>,
}

impl Assessment {
    pub fn top_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }
}

/// A contact the user can reach during a crisis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisResource {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl CrisisResource {
    /// "Name: phone" / "Name: text instruction" for display.
    pub fn contact_line(&self) -> String {
        match (&self.phone, &self.text) {
            (Some(phone), _) => format!("{}: {}", self.name, phone),
            (None, Some(text)) => format!("{}: {}", self.name, text),
            (None, None) => self.name.clone(),
        }
    }
}

/// Raw per-turn result attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnPayload {
    pub message: String,
    pub detected_symptoms: Vec<String>,
    /// Always empty for per-turn replies; conditions only come from analysis.
    pub conditions: Vec<Condition>,
    pub recommendations: Vec<String>,
    pub confidence: f64,
    pub level: Option<u8>,
    pub kind: TurnKind,
    #[serde(default)]
    pub crisis_resources: Vec<CrisisResource>,
}

impl TurnPayload {
    pub fn is_crisis(&self) -> bool {
        self.kind.is_crisis()
    }
}
