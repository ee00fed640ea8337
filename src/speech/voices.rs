//! Ranked voice preference policy
//!
//! Picks a voice from whatever list the synthesis capability enumerates,
//! so the choice can be tested without any installed voices.

use serde::{Deserialize, Serialize};

/// A voice offered by a synthesis capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub voice_id: String,
    pub name: String,
}

impl VoiceInfo {
    pub fn new(voice_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            name: name.into(),
        }
    }
}

/// One entry of a ranked preference list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoicePreference {
    /// Exact voice identifier
    Id(String),
    /// Case-insensitive fragment of the voice name
    NameContains(String),
}

impl VoicePreference {
    /// Parse `id:<voice id>` or a plain name fragment
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.strip_prefix("id:") {
            Some(id) if !id.trim().is_empty() => Some(Self::Id(id.trim().to_string())),
            Some(_) => None,
            None => Some(Self::NameContains(raw.to_lowercase())),
        }
    }

    pub fn matches(&self, voice: &VoiceInfo) -> bool {
        match self {
            Self::Id(id) => voice.voice_id == *id,
            Self::NameContains(fragment) => voice.name.to_lowercase().contains(fragment.as_str()),
        }
    }
}

/// Ordered list of preferences; earlier entries win
#[derive(Debug, Clone, Default)]
pub struct VoiceSelector {
    preferences: Vec<VoicePreference>,
}

impl VoiceSelector {
    pub fn new(preferences: Vec<VoicePreference>) -> Self {
        Self { preferences }
    }

    /// Build from raw strings, skipping entries that do not parse
    pub fn from_strings<S: AsRef<str>>(raw: &[S]) -> Self {
        Self::new(
            raw.iter()
                .filter_map(|s| VoicePreference::parse(s.as_ref()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }

    pub fn select<'a>(&self, voices: &'a [VoiceInfo]) -> Option<&'a VoiceInfo> {
        self.preferences
            .iter()
            .find_map(|pref| voices.iter().find(|v| pref.matches(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<VoiceInfo> {
        vec![
            VoiceInfo::new("v1", "Adam"),
            VoiceInfo::new("v2", "Rachel"),
            VoiceInfo::new("v3", "Google UK English Female"),
        ]
    }

    #[test]
    fn test_rank_order_wins_over_list_order() {
        let selector = VoiceSelector::from_strings(&["rachel", "adam"]);
        let list = voices();
        assert_eq!(selector.select(&list).map(|v| v.voice_id.as_str()), Some("v2"));
    }

    #[test]
    fn test_name_fragment_is_case_insensitive() {
        let selector = VoiceSelector::from_strings(&["uk english"]);
        let list = voices();
        assert_eq!(selector.select(&list).map(|v| v.name.as_str()), Some("Google UK English Female"));
    }

    #[test]
    fn test_id_preference() {
        let selector = VoiceSelector::from_strings(&["id:v1"]);
        let list = voices();
        assert_eq!(selector.select(&list).map(|v| v.name.as_str()), Some("Adam"));
    }

    #[test]
    fn test_no_match() {
        let selector = VoiceSelector::from_strings(&["samantha"]);
        assert!(selector.select(&voices()).is_none());
    }

    #[test]
    fn test_parse_skips_blank_entries() {
        let selector = VoiceSelector::from_strings(&["", "  ", "id:"]);
        assert!(selector.is_empty());
        assert!(selector.select(&voices()).is_none());
    }
}
