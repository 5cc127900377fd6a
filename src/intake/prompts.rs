//! Fixed assistant texts: greeting, level fallbacks, notices and failure hints.

pub const GREETING: &str = "Hello! I'm MindEase AI, your mental health assistant. Please describe what symptoms or feelings you're experiencing, and I'll help analyze them. What's been troubling you lately?";

/// Appended to the reply of any turn that leaves the assessment available.
pub const READY_NOTE: &str = "I now have enough information to provide your assessment. Request your detailed results whenever you're ready.";

pub const ANALYZING_PLACEHOLDER: &str =
    "Analyzing your symptoms and generating comprehensive assessment...";

pub const ASSESSMENT_READY: &str = "I've generated your detailed assessment below.";

pub const ASSESSMENT_HEADLINE: &str =
    "Based on our conversation, here is your mental health assessment:";

pub const EMERGENCY_INSTRUCTION: &str =
    "Please contact emergency services or a crisis hotline immediately";

/// Phrases accepted as an alternate assessment trigger, compared after
/// [`normalize_command`].
pub const RESULTS_TRIGGERS: [&str; 5] = [
    "show my results",
    "show results",
    "show me my results",
    "get my results",
    "see my results",
];

/// Canned follow-up for `level`, used when the service supplies no message.
///
/// Level 4 echoes the accumulated symptoms. Levels outside 1..=4 get the
/// closing prompt.
pub fn level_prompt(level: u8, symptoms: &[String]) -> String {
    match level {
        1 => "Thank you for sharing. To better understand your situation, could you tell me about any other symptoms? For example, how has your sleep been lately?".to_string(),
        2 => "I appreciate that. Are you experiencing any changes in appetite, energy levels, or difficulty concentrating?".to_string(),
        3 => "Thank you. Have you noticed any changes in your social behavior - like avoiding people or feeling isolated?".to_string(),
        4 => {
            let patterns = if symptoms.is_empty() {
                "emotional changes".to_string()
            } else {
                symptoms.join(", ")
            };
            format!(
                "Based on what you've described, I'm seeing patterns related to: {patterns}. Do you also experience physical symptoms like tension, rapid heartbeat, or fatigue?"
            )
        }
        _ => "I now have a clear picture of your symptoms. I'm ready to provide your comprehensive assessment with personalized recommendations.".to_string(),
    }
}

pub fn turn_failed_notice(base_url: &str) -> String {
    format!("Connection error. Please make sure the backend server is running on {base_url}")
}

pub fn analysis_failed_notice(base_url: &str) -> String {
    format!(
        "Sorry, there was an error generating your assessment. Please ensure the backend server is running on {base_url} and try again."
    )
}

/// Lowercase, trim, drop trailing punctuation, collapse whitespace.
pub fn normalize_command(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?'])
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_results_trigger(text: &str) -> bool {
    let normalized = normalize_command(text);
    RESULTS_TRIGGERS.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_four_echoes_symptoms() {
        let symptoms = vec!["anxiety".to_string(), "insomnia".to_string()];
        let prompt = level_prompt(4, &symptoms);
        assert!(prompt.contains("patterns related to: anxiety, insomnia."));
    }

    #[test]
    fn level_four_without_symptoms_uses_generic_phrase() {
        let prompt = level_prompt(4, &[]);
        assert!(prompt.contains("patterns related to: emotional changes."));
    }

    #[test]
    fn out_of_range_levels_get_closing_prompt() {
        assert_eq!(level_prompt(5, &[]), level_prompt(9, &[]));
        assert!(level_prompt(5, &[]).starts_with("I now have a clear picture"));
    }

    #[test]
    fn results_trigger_tolerates_case_and_punctuation() {
        assert!(is_results_trigger("Show my results"));
        assert!(is_results_trigger("  show   me my results! "));
        assert!(is_results_trigger("GET MY RESULTS."));
        assert!(!is_results_trigger("can you show my results later"));
        assert!(!is_results_trigger("results"));
    }

    #[test]
    fn failure_notices_name_the_service() {
        assert!(turn_failed_notice("http://localhost:5000").ends_with("http://localhost:5000"));
        assert!(analysis_failed_notice("http://x:1").contains("http://x:1"));
    }
}
