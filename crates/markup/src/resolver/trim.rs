//! Whitespace absorption around accepted tags.
//!
//! The whitespace set is fixed and counted in bytes. The left boundary is
//! the right edge of the previously appended tag, so two adjacent tags can
//! never absorb the same whitespace.

use crate::event::TagEvent;
use crate::schema::TagConfig;

pub(crate) fn is_trim_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t' | b'\0' | 0x0B)
}

/// Grow `event` over the whitespace its trim directives claim. Start-side
/// directives apply through the START bit, content/after directives through
/// the END bit; a self-closing tag carries both bits and participates in
/// both checks.
pub(crate) fn absorb(event: &mut TagEvent, cfg: &TagConfig, text: &str, left_boundary: usize) {
    let bytes = text.as_bytes();

    if (event.kind.is_start() && cfg.trim_before) || (event.kind.is_end() && cfg.rtrim_content) {
        let mut start = event.pos;
        while start > left_boundary && is_trim_byte(bytes[start - 1]) {
            start -= 1;
        }
        let absorbed = event.pos - start;
        event.pos = start;
        event.len += absorbed;
        event.trim_before += absorbed;
    }

    if (event.kind.is_start() && cfg.ltrim_content) || (event.kind.is_end() && cfg.trim_after) {
        let mut end = event.pos + event.len;
        while end < bytes.len() && is_trim_byte(bytes[end]) {
            end += 1;
        }
        let absorbed = end - (event.pos + event.len);
        event.len += absorbed;
        event.trim_after += absorbed;
    }
}
