//! Shared fixtures and output helpers for markup tests and benches.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use markup::plugins::{Autolink, BbCodes, Emoticons, HtmlEntities};
use markup::schema::{
    AttrConfig, FilterType, PluginConfig, Schema, TagConfig, TagRules,
};

const ALL_TAGS: &[&str] = &["B", "I", "URL", "QUOTE", "LIST", "LI", "SIZE", "E", "HE"];

/// Every tag except the given ones — the usual shape for flow containers.
fn allow_except(excluded: &[&str]) -> HashSet<String> {
    ALL_TAGS
        .iter()
        .filter(|n| !excluded.contains(n))
        .map(|n| n.to_string())
        .collect()
}

fn fixture_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("fixture regex")
}

/// The canonical forum-flavored schema used across integration tests:
/// bold/italic, links, quotes, lists with `[*]` items, font size, emoticons
/// and HTML entities.
pub fn forum_schema() -> Schema {
    let mut schema = Schema::default();

    schema.tags.insert(
        "B".to_string(),
        TagConfig {
            allow: allow_except(&["LI"]),
            ..TagConfig::default()
        },
    );
    schema.tags.insert(
        "I".to_string(),
        TagConfig {
            allow: allow_except(&["LI"]),
            ..TagConfig::default()
        },
    );

    let mut url = TagConfig {
        allow: allow_except(&["LI", "URL"]),
        ..TagConfig::default()
    };
    url.attrs
        .insert("url".to_string(), AttrConfig::new(FilterType::Url).required());
    schema.tags.insert("URL".to_string(), url);

    let mut quote = TagConfig {
        allow: allow_except(&["LI"]),
        ..TagConfig::default()
    };
    quote
        .attrs
        .insert("quote".to_string(), AttrConfig::new(FilterType::Text));
    schema.tags.insert("QUOTE".to_string(), quote);

    // The allow-set is intersected down the stack, so LIST must keep the
    // full set or nothing could nest inside its items; item discipline
    // comes from LI's require_parent/close_parent rules instead.
    schema.tags.insert(
        "LIST".to_string(),
        TagConfig {
            allow: allow_except(&[]),
            ..TagConfig::default()
        },
    );
    schema.tags.insert(
        "LI".to_string(),
        TagConfig {
            allow: allow_except(&["LI"]),
            rules: TagRules {
                close_parent: HashSet::from(["LI".to_string()]),
                require_parent: Some("LIST".to_string()),
                require_ascendant: Vec::new(),
            },
            ..TagConfig::default()
        },
    );

    let mut size = TagConfig {
        allow: allow_except(&["LI"]),
        ..TagConfig::default()
    };
    size.attrs.insert(
        "size".to_string(),
        AttrConfig::new(FilterType::Range { min: 8, max: 20 }).required(),
    );
    schema.tags.insert("SIZE".to_string(), size);

    schema.tags.insert("E".to_string(), TagConfig::default());
    schema.tags.insert("HE".to_string(), TagConfig::default());

    schema.plugins.insert(
        "Autolink".to_string(),
        PluginConfig::new(
            fixture_regex(r#"https?://[^\s\[\]<>"]+"#),
            Arc::new(Autolink::new()),
        ),
    );
    schema.plugins.insert(
        "BbCodes".to_string(),
        PluginConfig::new(
            fixture_regex(r"(?i)\[/?[a-z*][^\[\]]*\]"),
            Arc::new(BbCodes::new().with_alias("*", "LI")),
        ),
    );
    schema.plugins.insert(
        "Emoticons".to_string(),
        PluginConfig::new(
            fixture_regex(r":\)|:\(|;\)|:D|:P"),
            Arc::new(Emoticons::new()),
        ),
    );
    schema.plugins.insert(
        "HtmlEntities".to_string(),
        PluginConfig::new(
            fixture_regex(r"&(?:[a-zA-Z]+|#[0-9]+|#[xX][0-9a-fA-F]+);"),
            Arc::new(HtmlEntities::new()),
        ),
    );

    schema
}

/// Concatenate every text node of the serialized tree and undo text
/// escaping. For any parse, this must reproduce the input byte-for-byte.
pub fn extract_source(xml: &str) -> String {
    let mut text = String::with_capacity(xml.len());
    let mut in_tag = false;
    for ch in xml.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    unescape_text(&text)
}

fn unescape_text(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let mut replaced = false;
        for (entity, ch) in [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"')] {
            if let Some(tail) = rest.strip_prefix(entity) {
                out.push(ch);
                rest = tail;
                replaced = true;
                break;
            }
        }
        if !replaced {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Line-oriented diff summary for readable assertion failures on multi-line
/// output.
pub fn diff_lines(expected: &str, actual: &str) -> String {
    use std::fmt::Write;
    let expected: Vec<&str> = expected.lines().collect();
    let actual: Vec<&str> = actual.lines().collect();
    let max = expected.len().max(actual.len());
    let missing = "<missing>";
    let mut out = String::new();
    let mut mismatch = None;
    for i in 0..max {
        let left = expected.get(i).copied().unwrap_or(missing);
        let right = actual.get(i).copied().unwrap_or(missing);
        if left != right {
            mismatch = Some(i);
            break;
        }
    }
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(&mut out, "first mismatch at line {}:", i + 1);
        for line_idx in start..end {
            let left = expected.get(line_idx).copied().unwrap_or(missing);
            let right = actual.get(line_idx).copied().unwrap_or(missing);
            let marker = if line_idx == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {left}", line_idx + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {right}", line_idx + 1);
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}
