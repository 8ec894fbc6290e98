//! Square-bracket tag recognizer.
//!
//! Accepted forms, scanned from the regex match's own slice:
//! - `[name]`, `[/name]`, `[name/]`
//! - `[name=value]` — the value becomes the tag's default attribute, named
//!   after the (alias-resolved) lowercased tag name. A bare default value
//!   runs to the closing bracket, so `[url=http://x/]` keeps its slash.
//! - `[name key=value key2="two words" key3='it\'s']` — quoted values
//!   accept backslash escapes; bare values stop at whitespace.
//! - `[name:7]...[/name:7]` — an explicit suffix pairs start and end
//!   without interference from other occurrences of the same tag.
//!
//! A slice that does not scan cleanly (unterminated quote, empty name)
//! produces no event; the text simply stays text.

use std::collections::HashMap;

use crate::event::{TagEvent, TagKind};
use crate::plugins::{MatchSet, Recognizer};

pub struct BbCodes {
    /// Source name (lowercase) → canonical tag name, e.g. `*` → `LI`.
    aliases: HashMap<String, String>,
}

impl BbCodes {
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases
            .insert(from.into().to_ascii_lowercase(), to.into());
        self
    }

    fn resolve(&self, name: &str) -> String {
        let lowered = name.to_ascii_lowercase();
        match self.aliases.get(&lowered) {
            Some(canonical) => canonical.clone(),
            None => lowered,
        }
    }
}

impl Default for BbCodes {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for BbCodes {
    fn tags(&self, text: &str, matches: &[MatchSet]) -> Vec<TagEvent> {
        let mut events = Vec::new();
        for m in matches {
            let full = m.full();
            if let Some(event) = self.scan(full.text(text), full.start) {
                events.push(event);
            }
        }
        events
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

impl BbCodes {
    /// Scan one bracketed slice into an event, or `None` when malformed.
    fn scan(&self, slice: &str, pos: usize) -> Option<TagEvent> {
        let inner = slice.strip_prefix('[')?.strip_suffix(']')?;
        let bytes = inner.as_bytes();
        let mut i = 0;

        let end_tag = bytes.first() == Some(&b'/');
        if end_tag {
            i += 1;
        }

        // Tag name: `*` or an ASCII word starting with a letter.
        let name_start = i;
        if bytes.get(i) == Some(&b'*') {
            i += 1;
        } else {
            while i < bytes.len() && is_name_byte(bytes[i]) {
                i += 1;
            }
            if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
                return None;
            }
        }
        let name = self.resolve(&inner[name_start..i]);

        // Optional explicit pairing suffix `:abc123`.
        let mut suffix = None;
        if bytes.get(i) == Some(&b':') {
            let suffix_start = i + 1;
            i = suffix_start;
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            if i == suffix_start {
                return None;
            }
            suffix = Some(format!(":{}", &inner[suffix_start..i]));
        }

        let mut event = TagEvent::new(
            if end_tag { TagKind::END } else { TagKind::START },
            name.clone(),
            pos,
            slice.len(),
        );
        if let Some(suffix) = suffix {
            event = event.with_suffix(suffix);
        }

        if end_tag {
            // Anything besides the closing bracket is malformed.
            return (i == bytes.len()).then_some(event);
        }

        // Default attribute: `=value` immediately after the name/suffix. A
        // bare value consumes the rest of the slice.
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            let value = if matches!(bytes.get(i), Some(b'"') | Some(b'\'')) {
                let (value, next) = scan_quoted(inner, i)?;
                i = next;
                value
            } else {
                let value = inner[i..].to_string();
                i = bytes.len();
                value
            };
            event.attrs.insert(name.to_ascii_lowercase(), value);
        }

        // Named attributes, then an optional trailing `/`.
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i == bytes.len() {
                return Some(event);
            }
            if bytes[i] == b'/' && i + 1 == bytes.len() {
                event.kind = TagKind::SELF_CLOSING;
                return Some(event);
            }
            let key_start = i;
            while i < bytes.len() && is_name_byte(bytes[i]) {
                i += 1;
            }
            if i == key_start || bytes.get(i) != Some(&b'=') {
                return None;
            }
            let key = inner[key_start..i].to_ascii_lowercase();
            i += 1;
            let value = if matches!(bytes.get(i), Some(b'"') | Some(b'\'')) {
                let (value, next) = scan_quoted(inner, i)?;
                i = next;
                value
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                inner[value_start..i].to_string()
            };
            event.attrs.insert(key, value);
        }
    }
}

/// Scan a quoted value starting at the opening quote; returns the unescaped
/// value and the index past the closing quote.
fn scan_quoted(inner: &str, start: usize) -> Option<(String, usize)> {
    let bytes = inner.as_bytes();
    let quote = bytes[start];
    let mut value = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                // Escapes pass the next byte through; multi-byte chars can't
                // start with a backslash so this stays on char boundaries.
                let next = bytes[i + 1];
                if next == quote || next == b'\\' {
                    value.push(next as char);
                    i += 2;
                } else {
                    value.push('\\');
                    i += 1;
                }
            }
            b if b == quote => return Some((value, i + 1)),
            _ => {
                // Copy the full character, not just the byte.
                let rest = &inner[i..];
                let ch = rest.chars().next()?;
                value.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    None
}
