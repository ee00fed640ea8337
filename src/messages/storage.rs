use super::types::Message;
use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only, ordered record of the messages exchanged in one session.
///
/// Entries are never removed or reordered, so `len()` only ever grows.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_greeting(greeting: &str) -> Self {
        let transcript = Self::new();
        transcript.append(Message::bot(greeting));
        transcript
    }

    pub fn append(&self, message: Message) {
        self.messages.write().push(message);
    }

    pub fn get_all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let transcript = Transcript::with_greeting("hello");
        transcript.append(Message::user("first"));
        transcript.append(Message::bot("second"));

        let texts: Vec<_> = transcript.get_all().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["hello", "first", "second"]);
        assert_eq!(transcript.last().map(|m| m.text), Some("second".to_string()));
    }

    #[test]
    fn test_clones_share_entries() {
        let transcript = Transcript::new();
        let view = transcript.clone();
        transcript.append(Message::user("shared"));
        assert_eq!(view.len(), 1);
        assert!(!view.is_empty());
    }
}
