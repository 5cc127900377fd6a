use std::collections::HashSet;

/// Normalise a symptom token: trim, lowercase, and collapse runs of
/// whitespace, `_` and `-` into a single `_`.
///
/// Returns `None` for tokens that are empty after normalisation.
pub fn normalize_symptom(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join("_"))
    }
}

/// Deduplicated set of symptom tokens seen across turns.
///
/// Grows by union only; order of first appearance is kept for rendering.
#[derive(Debug, Clone, Default)]
pub struct SymptomAggregator {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl SymptomAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `new_symptoms` into the set and return the resulting snapshot.
    pub fn merge<S: AsRef<str>>(&mut self, new_symptoms: &[S]) -> Vec<String> {
        for raw in new_symptoms {
            if let Some(token) = normalize_symptom(raw.as_ref()) {
                if self.seen.insert(token.clone()) {
                    self.order.push(token);
                }
            }
        }
        self.snapshot()
    }

    /// Tokens in order of first appearance.
    pub fn snapshot(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn reset(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}
