//! Conversation State
//!
//! The crop and province a conversation is about, carried explicitly: the
//! caller sends the state with each request and receives the updated state
//! back. Nothing is held in process memory, so concurrent sessions never
//! see each other's context.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
}

/// Fields a query still needs before it can be answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingContext {
    Crop,
    Province,
}

/// Trimmed value, or `None` when absent or blank
fn provided(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ConversationState {
    /// New state with any provided, non-blank values overriding the current ones
    ///
    /// Blank values already in the state are dropped too, so a session sent
    /// back by a client never carries an empty crop or province forward.
    pub fn merge(&self, crop: Option<&str>, province: Option<&str>) -> ConversationState {
        ConversationState {
            crop: provided(crop).or(provided(self.crop.as_deref())).map(str::to_string),
            province: provided(province).or(provided(self.province.as_deref())).map(str::to_string),
        }
    }

    /// Which of crop/province are still unknown; blank counts as unknown
    pub fn missing(&self) -> Vec<MissingContext> {
        let mut missing = Vec::new();
        if provided(self.crop.as_deref()).is_none() {
            missing.push(MissingContext::Crop);
        }
        if provided(self.province.as_deref()).is_none() {
            missing.push(MissingContext::Province);
        }
        missing
    }

    /// Both fields, once known
    pub fn resolved(&self) -> Option<(&str, &str)> {
        match (provided(self.crop.as_deref()), provided(self.province.as_deref())) {
            (Some(crop), Some(province)) => Some((crop, province)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_previous_context() {
        let state = ConversationState::default().merge(Some("Padi"), None);
        assert_eq!(state.missing(), vec![MissingContext::Province]);
        assert!(state.resolved().is_none());

        let state = state.merge(None, Some("Jawa Barat"));
        assert_eq!(state.resolved(), Some(("Padi", "Jawa Barat")));

        // A later turn switches the crop only
        let state = state.merge(Some("Jagung"), Some("   "));
        assert_eq!(state.resolved(), Some(("Jagung", "Jawa Barat")));
    }

    #[test]
    fn test_missing_lists_both() {
        assert_eq!(
            ConversationState::default().missing(),
            vec![MissingContext::Crop, MissingContext::Province]
        );
    }

    #[test]
    fn test_blank_session_fields_are_missing() {
        let state: ConversationState =
            serde_json::from_str(r#"{"crop":"","province":"bali"}"#).unwrap();
        assert_eq!(state.missing(), vec![MissingContext::Crop]);
        assert!(state.resolved().is_none());

        let merged = state.merge(None, None);
        assert_eq!(merged.crop, None);
        assert_eq!(merged.province.as_deref(), Some("bali"));
        assert!(merged.resolved().is_none());

        let whitespace = ConversationState { crop: Some("  ".into()), province: Some("\t".into()) };
        assert_eq!(whitespace.missing(), vec![MissingContext::Crop, MissingContext::Province]);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let state: ConversationState = serde_json::from_str(r#"{"crop":"Padi"}"#).unwrap();
        assert_eq!(state.crop.as_deref(), Some("Padi"));
        assert_eq!(state.province, None);
    }
}
