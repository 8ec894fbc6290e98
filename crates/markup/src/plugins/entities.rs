//! HTML-entity recognizer and its decode core.
//!
//! Decoding is a minimal, explicitly limited subset of HTML entities:
//! - Named entities: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`.
//! - Numeric entities only when well-formed and semicolon-terminated:
//!   `&#123;` (decimal) and `&#x1F4A9;` (hex).
//! - Only valid Unicode scalar values decode; everything else stays text.
//! - Digit runs are bounded to avoid quadratic behavior on adversarial input.
//!
//! This is intentionally not HTML5-spec-complete. Keep the behavior narrow
//! and stable.

use std::collections::HashSet;

use crate::event::{TagEvent, TagKind};
use crate::plugins::{MatchSet, Recognizer};

const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
    ("&nbsp;", '\u{00A0}'),
];

/// Decode one complete entity spelling (`&` through `;`), or `None` when it
/// is not in the decodable subset.
pub(crate) fn decode_entity(entity: &str) -> Option<char> {
    if !entity.starts_with('&') || !entity.ends_with(';') || entity.len() < 3 {
        return None;
    }
    for (pat, ch) in NAMED_ENTITIES {
        if entity == *pat {
            return Some(*ch);
        }
    }
    let inner = &entity[1..entity.len() - 1];
    if let Some(hex) = inner.strip_prefix("#x").or_else(|| inner.strip_prefix("#X")) {
        if hex.is_empty() || hex.len() > MAX_HEX_DIGITS || !hex.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return None;
        }
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = inner.strip_prefix('#') {
        if dec.is_empty() || dec.len() > MAX_DEC_DIGITS || !dec.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    None
}

/// Emits one self-closing tag per decodable entity, carrying the decoded
/// character in an attribute. The entity spelling stays in the text as the
/// tag's body, so round-tripping the output reproduces the input.
pub struct HtmlEntities {
    tag: String,
    attr: String,
    disabled: HashSet<String>,
}

impl HtmlEntities {
    pub fn new() -> Self {
        Self {
            tag: "HE".to_string(),
            attr: "char".to_string(),
            disabled: HashSet::new(),
        }
    }

    /// Suppress a specific entity spelling (e.g. `&nbsp;`).
    pub fn disable(mut self, entity: impl Into<String>) -> Self {
        self.disabled.insert(entity.into());
        self
    }
}

impl Default for HtmlEntities {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for HtmlEntities {
    fn tags(&self, text: &str, matches: &[MatchSet]) -> Vec<TagEvent> {
        let mut events = Vec::new();
        for m in matches {
            let full = m.full();
            let spelling = full.text(text);
            if self.disabled.contains(spelling) {
                continue;
            }
            let Some(decoded) = decode_entity(spelling) else {
                continue;
            };
            events.push(
                TagEvent::new(TagKind::SELF_CLOSING, &self.tag, full.start, full.len())
                    .with_attr(&self.attr, decoded.to_string()),
            );
        }
        events
    }
}
