//! Tree emission.
//!
//! The resolved tag list plus the raw text serialize into a small XML
//! vocabulary: `<pt>` wraps plain text (no tag survived), `<rt>` wraps rich
//! text, `<i>` wraps absorbed whitespace, `<st>`/`<et>` wrap the textual
//! form of a start/end tag. Concatenating every text node of the output
//! reproduces the input byte-for-byte.
//!
//! Emission is a swap-point: alternative output formats implement
//! [`Emitter`] without touching resolution semantics.

use std::fmt::Write;

use memchr::memchr3;

use crate::event::TagEvent;

/// Serialization capability over the resolved tag list.
pub trait Emitter: Send + Sync {
    fn emit(&self, text: &str, tags: &[TagEvent]) -> String;
}

/// Escape `&`, `<`, `>` for a text node. The common no-escape case returns
/// without allocating a scratch buffer pass.
pub fn escape_text(out: &mut String, text: &str) {
    if memchr3(b'&', b'<', b'>', text.as_bytes()).is_none() {
        out.push_str(text);
        return;
    }
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Escape an attribute value for double-quoted emission.
pub fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// The default XML emitter.
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlEmitter;

impl Emitter for XmlEmitter {
    fn emit(&self, text: &str, tags: &[TagEvent]) -> String {
        if tags.is_empty() {
            let mut out = String::with_capacity(text.len() + 9);
            out.push_str("<pt>");
            escape_text(&mut out, text);
            out.push_str("</pt>");
            return out;
        }

        let mut out = String::with_capacity(text.len() + 64);
        out.push_str("<rt>");
        let mut open: Vec<&str> = Vec::new();
        let mut cursor = 0usize;
        for tag in tags {
            debug_assert!(tag.pos >= cursor, "tags must be emitted in document order");
            escape_text(&mut out, &text[cursor..tag.pos]);
            cursor = tag.pos + tag.len;

            let slice = &text[tag.pos..cursor];
            let (ws_before, rest) = slice.split_at(tag.trim_before.min(slice.len()));
            let (body, ws_after) = rest.split_at(rest.len() - tag.trim_after.min(rest.len()));

            if !ws_before.is_empty() {
                out.push_str("<i>");
                escape_text(&mut out, ws_before);
                out.push_str("</i>");
            }

            if tag.kind.is_start() {
                out.push('<');
                out.push_str(&tag.name);
                for (key, value) in &tag.attrs {
                    let _ = write!(&mut out, " {key}=\"");
                    escape_attr(&mut out, value);
                    out.push('"');
                }
                if tag.kind.is_end() {
                    if body.is_empty() {
                        out.push_str("/>");
                    } else {
                        out.push('>');
                        escape_text(&mut out, body);
                        out.push_str("</");
                        out.push_str(&tag.name);
                        out.push('>');
                    }
                } else {
                    out.push('>');
                    if !body.is_empty() {
                        out.push_str("<st>");
                        escape_text(&mut out, body);
                        out.push_str("</st>");
                    }
                    open.push(&tag.name);
                }
            } else {
                if !body.is_empty() {
                    out.push_str("<et>");
                    escape_text(&mut out, body);
                    out.push_str("</et>");
                }
                let closed = open.pop();
                debug_assert_eq!(closed, Some(tag.name.as_str()), "end tag must match");
                out.push_str("</");
                out.push_str(&tag.name);
                out.push('>');
            }

            if !ws_after.is_empty() {
                out.push_str("<i>");
                escape_text(&mut out, ws_after);
                out.push_str("</i>");
            }
        }
        escape_text(&mut out, &text[cursor..]);

        // Anything left open at document end closes here so the tree is
        // always well-formed.
        while let Some(name) = open.pop() {
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        out.push_str("</rt>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{TagEvent, TagKind};

    fn emit(text: &str, tags: Vec<TagEvent>) -> String {
        XmlEmitter.emit(text, &tags)
    }

    #[test]
    fn no_tags_emits_plain_text() {
        assert_eq!(emit("a & b", Vec::new()), "<pt>a &amp; b</pt>");
        assert_eq!(emit("", Vec::new()), "<pt></pt>");
    }

    #[test]
    fn pair_with_bodies_and_attributes() {
        let text = "[b]x[/b]";
        let mut start = TagEvent::new(TagKind::START, "B", 0, 3);
        start.attrs.insert("z".to_string(), "3".to_string());
        start.attrs.insert("a".to_string(), "1<2".to_string());
        let end = TagEvent::new(TagKind::END, "B", 4, 4);
        assert_eq!(
            emit(text, vec![start, end]),
            "<rt><B a=\"1&lt;2\" z=\"3\"><st>[b]</st>x<et>[/b]</et></B></rt>"
        );
    }

    #[test]
    fn self_closing_with_body_and_without() {
        let text = "a :) b";
        let smile = TagEvent::new(TagKind::SELF_CLOSING, "E", 2, 2);
        assert_eq!(emit(text, vec![smile]), "<rt>a <E>:)</E> b</rt>");

        let text = "ab";
        let marker = TagEvent::new(TagKind::SELF_CLOSING, "HR", 1, 0);
        assert_eq!(emit(text, vec![marker]), "<rt>a<HR/>b</rt>");
    }

    #[test]
    fn zero_length_pair_wraps_content_as_element_text() {
        let text = "go http://x.example/a now";
        let start =
            TagEvent::new(TagKind::START, "URL", 3, 0).with_attr("url", "http://x.example/a");
        let end = TagEvent::new(TagKind::END, "URL", 21, 0);
        assert_eq!(
            emit(text, vec![start, end]),
            "<rt>go <URL url=\"http://x.example/a\">http://x.example/a</URL> now</rt>"
        );
    }

    #[test]
    fn absorbed_whitespace_is_wrapped_in_i() {
        let text = "x  [q]y[/q]";
        let mut start = TagEvent::new(TagKind::START, "Q", 1, 5);
        start.trim_before = 2;
        let end = TagEvent::new(TagKind::END, "Q", 7, 4);
        assert_eq!(
            emit(text, vec![start, end]),
            "<rt>x<i>  </i><Q><st>[q]</st>y<et>[/q]</et></Q></rt>"
        );
    }

    #[test]
    fn open_tags_auto_close_at_document_end() {
        let text = "[b]x";
        let start = TagEvent::new(TagKind::START, "B", 0, 3);
        assert_eq!(emit(text, vec![start]), "<rt><B><st>[b]</st>x</B></rt>");
    }

    #[test]
    fn text_concatenation_reproduces_input() {
        let text = "a  [b] x [/b]&amp;";
        let mut start = TagEvent::new(TagKind::START, "B", 1, 5);
        start.trim_before = 2;
        let mut end = TagEvent::new(TagKind::END, "B", 9, 4);
        end.pos = 8;
        end.len = 5;
        end.trim_before = 1;
        let entity = TagEvent::new(TagKind::SELF_CLOSING, "HE", 13, 5).with_attr("char", "&");
        let xml = emit(text, vec![start, end, entity]);
        let mut recovered = String::new();
        let mut in_tag = false;
        for ch in xml.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => recovered.push(ch),
                _ => {}
            }
        }
        let recovered = recovered
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
        assert_eq!(recovered, text);
    }
}
