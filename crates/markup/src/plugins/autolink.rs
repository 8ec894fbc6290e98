//! Bare-URL recognizer.
//!
//! Wraps each matched URL in a zero-length start/end pair so the link text
//! itself stays in the document as the tag's content. Trailing punctuation
//! that belongs to the surrounding sentence is stripped before the pair is
//! emitted; a closing parenthesis is kept when the URL contains a matching
//! opening one (Wikipedia-style disambiguation links).

use crate::event::{TagEvent, TagKind};
use crate::plugins::{MatchSet, Recognizer};

pub struct Autolink {
    tag: String,
    attr: String,
}

impl Autolink {
    pub fn new() -> Self {
        Self {
            tag: "URL".to_string(),
            attr: "url".to_string(),
        }
    }
}

impl Default for Autolink {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte length of `url` after stripping trailing sentence punctuation and
/// unbalanced closing parentheses.
fn trimmed_len(url: &str) -> usize {
    let bytes = url.as_bytes();
    let mut end = bytes.len();
    loop {
        let Some(&last) = bytes[..end].last() else {
            break;
        };
        match last {
            b'.' | b',' | b'!' | b'?' | b';' | b':' | b'\'' | b'"' => end -= 1,
            b')' => {
                let kept = &bytes[..end];
                let opens = kept.iter().filter(|&&b| b == b'(').count();
                let closes = kept.iter().filter(|&&b| b == b')').count();
                if closes > opens {
                    end -= 1;
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
    end
}

impl Recognizer for Autolink {
    fn tags(&self, text: &str, matches: &[MatchSet]) -> Vec<TagEvent> {
        let mut events = Vec::new();
        for m in matches {
            let full = m.full();
            let url = full.text(text);
            let len = trimmed_len(url);
            // A bare scheme with nothing after it is not a link.
            let Some(rest) = url[..len].split_once("://").map(|(_, rest)| rest) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            events.push(
                TagEvent::new(TagKind::START, &self.tag, full.start, 0)
                    .with_attr(&self.attr, &url[..len]),
            );
            events.push(TagEvent::new(TagKind::END, &self.tag, full.start + len, 0));
        }
        events
    }
}
