//! Emoticon recognizer.
//!
//! The schema supplies one alternation regex over the configured emoticon
//! codes; every match becomes a self-closing tag whose body is the emoticon
//! text itself. Rendering decides what each code maps to — the engine only
//! marks the span.

use crate::event::{TagEvent, TagKind};
use crate::plugins::{MatchSet, Recognizer};

pub struct Emoticons {
    tag: String,
}

impl Emoticons {
    pub fn new() -> Self {
        Self {
            tag: "E".to_string(),
        }
    }
}

impl Default for Emoticons {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for Emoticons {
    fn tags(&self, _text: &str, matches: &[MatchSet]) -> Vec<TagEvent> {
        matches
            .iter()
            .map(|m| {
                let full = m.full();
                TagEvent::new(TagKind::SELF_CLOSING, &self.tag, full.start, full.len())
            })
            .collect()
    }
}
