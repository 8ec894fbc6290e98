//! Plugin contract and the tag-discovery stage.
//!
//! Each configured plugin owns one or more pre-compiled regexes. Dispatch
//! runs them against the whole input, enforces the per-plugin match budget,
//! and hands the surviving matches to the plugin's recognizer, which turns
//! them into candidate tag events. Recognizers are constructed once when the
//! schema is built and must be pure functions of `(text, matches)`; the
//! engine tolerates duplicate and overlapping events, which the resolver
//! reconciles later.

mod autolink;
mod bbcodes;
mod emoticons;
mod entities;

pub use autolink::Autolink;
pub use bbcodes::BbCodes;
pub use emoticons::Emoticons;
pub use entities::HtmlEntities;

use crate::event::TagEvent;
use crate::logger::{LogEntry, ParseLog, Severity};
use crate::parser::ParseError;
use crate::schema::{RegexpLimitAction, Schema};

/// One capture group of one match: a byte span into the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchGroup {
    pub start: usize,
    pub end: usize,
}

impl MatchGroup {
    pub fn text<'t>(&self, input: &'t str) -> &'t str {
        &input[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One regex match: capture groups in declaration order. Group 0 is the
/// whole match and is always present; groups that did not participate are
/// `None`.
#[derive(Clone, Debug)]
pub struct MatchSet {
    groups: Vec<Option<MatchGroup>>,
}

impl MatchSet {
    /// The whole-match span (group 0).
    pub fn full(&self) -> MatchGroup {
        // Group 0 always participates; the fallback keeps this total.
        self.groups
            .first()
            .copied()
            .flatten()
            .unwrap_or(MatchGroup { start: 0, end: 0 })
    }

    pub fn group(&self, index: usize) -> Option<MatchGroup> {
        self.groups.get(index).copied().flatten()
    }
}

impl From<&regex::Captures<'_>> for MatchSet {
    fn from(caps: &regex::Captures<'_>) -> Self {
        let groups = caps
            .iter()
            .map(|m| {
                m.map(|m| MatchGroup {
                    start: m.start(),
                    end: m.end(),
                })
            })
            .collect();
        Self { groups }
    }
}

/// A plugin's recognizer: turns the match list into candidate tag events.
///
/// Recognizers own any pattern-specific post-processing (stripping trailing
/// punctuation, skipping disabled entities) before emitting events.
pub trait Recognizer: Send + Sync {
    fn tags(&self, text: &str, matches: &[MatchSet]) -> Vec<TagEvent>;
}

/// Run every configured plugin and collect candidate events.
///
/// The only fatal outcome is a match-budget overrun under
/// [`RegexpLimitAction::Abort`]; every other anomaly is logged and recovered.
pub(crate) fn dispatch(
    text: &str,
    schema: &Schema,
    log: &mut ParseLog,
) -> Result<Vec<TagEvent>, ParseError> {
    let mut events = Vec::new();
    for (name, plugin) in &schema.plugins {
        let mut matches: Vec<MatchSet> = Vec::new();
        let mut overflowed = false;
        'patterns: for regexp in &plugin.regexps {
            for caps in regexp.captures_iter(text) {
                if matches.len() >= plugin.regexp_limit {
                    // Truncation is per-pattern: drop the rest of this
                    // pattern's matches and skip the remaining patterns.
                    overflowed = true;
                    break 'patterns;
                }
                matches.push(MatchSet::from(&caps));
            }
        }
        if overflowed {
            let entry = LogEntry::new("Regexp limit exceeded. Only the first {} matches will be processed")
                .param(plugin.regexp_limit);
            match plugin.limit_action {
                RegexpLimitAction::Abort => {
                    return Err(ParseError::RegexpLimitExceeded {
                        plugin: name.clone(),
                    });
                }
                RegexpLimitAction::Ignore => log.push(Severity::Debug, entry),
                RegexpLimitAction::Warn => log.push(Severity::Warning, entry),
            }
        }
        if matches.is_empty() {
            continue;
        }
        let plugin_events = plugin.recognizer.tags(text, &matches);
        log::debug!(
            target: "markup",
            "plugin {name}: {} matches, {} events",
            matches.len(),
            plugin_events.len()
        );
        for mut event in plugin_events {
            if event.suffix.is_none() {
                event.suffix = Some(format!("-{name}"));
            }
            event.plugin = name.clone();
            events.push(event);
        }
    }
    Ok(events)
}

/// Canonicalize names and drop events unknown to the schema.
pub(crate) fn normalize(events: &mut Vec<TagEvent>, schema: &Schema, log: &mut ParseLog) {
    events.retain_mut(|event| {
        event.name = event.name.to_ascii_uppercase();
        if schema.tags.contains_key(&event.name) {
            return true;
        }
        log.push(
            Severity::Debug,
            LogEntry::new("Unknown tag")
                .at(event.pos)
                .for_tag(&event.name)
                .param(&event.plugin),
        );
        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TagKind;
    use crate::schema::{PluginConfig, TagConfig};
    use regex::Regex;
    use std::sync::Arc;

    /// Emits one self-closing tag per whole match.
    struct PerMatch(&'static str);

    impl Recognizer for PerMatch {
        fn tags(&self, _text: &str, matches: &[MatchSet]) -> Vec<TagEvent> {
            matches
                .iter()
                .map(|m| {
                    let full = m.full();
                    TagEvent::new(TagKind::SELF_CLOSING, self.0, full.start, full.len())
                })
                .collect()
        }
    }

    fn schema_with(name: &str, config: PluginConfig) -> Schema {
        let mut schema = Schema::default();
        schema.tags.insert("X".to_string(), TagConfig::default());
        schema.plugins.insert(name.to_string(), config);
        schema
    }

    #[test]
    fn dispatch_stamps_plugin_and_default_suffix() {
        let plugin = PluginConfig::new(
            Regex::new("x").expect("test regex"),
            Arc::new(PerMatch("X")),
        );
        let schema = schema_with("Marker", plugin);
        let mut log = ParseLog::default();
        let events = dispatch("a x b x", &schema, &mut log).expect("no fatal");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].plugin, "Marker");
        assert_eq!(events[0].suffix.as_deref(), Some("-Marker"));
        assert_eq!(events[0].pos, 2);
        assert_eq!(events[1].pos, 6);
    }

    #[test]
    fn dispatch_skips_plugins_with_no_match() {
        struct Panics;
        impl Recognizer for Panics {
            fn tags(&self, _text: &str, _matches: &[MatchSet]) -> Vec<TagEvent> {
                panic!("recognizer must not run without matches");
            }
        }
        let plugin = PluginConfig::new(Regex::new("zzz").expect("test regex"), Arc::new(Panics));
        let schema = schema_with("Quiet", plugin);
        let mut log = ParseLog::default();
        let events = dispatch("nothing here", &schema, &mut log).expect("no fatal");
        assert!(events.is_empty());
    }

    #[test]
    fn limit_abort_is_fatal_and_names_the_plugin() {
        let plugin = PluginConfig::new(
            Regex::new("x").expect("test regex"),
            Arc::new(PerMatch("X")),
        )
        .with_limit(1, RegexpLimitAction::Abort);
        let schema = schema_with("Greedy", plugin);
        let mut log = ParseLog::default();
        let err = dispatch("x x", &schema, &mut log).expect_err("must abort");
        let ParseError::RegexpLimitExceeded { plugin } = err;
        assert_eq!(plugin, "Greedy");
    }

    #[test]
    fn limit_ignore_truncates_and_logs_debug() {
        let plugin = PluginConfig::new(
            Regex::new("x").expect("test regex"),
            Arc::new(PerMatch("X")),
        )
        .with_limit(2, RegexpLimitAction::Ignore);
        let schema = schema_with("Chatty", plugin);
        let mut log = ParseLog::default();
        let events = dispatch("x x x x", &schema, &mut log).expect("no fatal");
        assert_eq!(events.len(), 2);
        assert!(log.contains(
            Severity::Debug,
            "Regexp limit exceeded. Only the first 2 matches will be processed"
        ));
    }

    #[test]
    fn limit_warn_truncates_and_logs_warning() {
        let plugin = PluginConfig::new(
            Regex::new("x").expect("test regex"),
            Arc::new(PerMatch("X")),
        )
        .with_limit(1, RegexpLimitAction::Warn);
        let schema = schema_with("Loud", plugin);
        let mut log = ParseLog::default();
        let events = dispatch("x x x", &schema, &mut log).expect("no fatal");
        assert_eq!(events.len(), 1);
        assert_eq!(log.entries(Severity::Warning).len(), 1);
    }

    #[test]
    fn multiple_patterns_merge_their_matches() {
        let plugin = PluginConfig::new(
            Regex::new("x").expect("test regex"),
            Arc::new(PerMatch("X")),
        )
        .with_regexp(Regex::new("y").expect("test regex"));
        let schema = schema_with("Both", plugin);
        let mut log = ParseLog::default();
        let events = dispatch("y x", &schema, &mut log).expect("no fatal");
        // Pattern order, then text order within each pattern.
        assert_eq!(events.iter().map(|e| e.pos).collect::<Vec<_>>(), vec![2, 0]);
    }

    #[test]
    fn overflowing_pattern_truncates_and_skips_the_rest() {
        let plugin = PluginConfig::new(
            Regex::new("x").expect("test regex"),
            Arc::new(PerMatch("X")),
        )
        .with_regexp(Regex::new("y").expect("test regex"))
        .with_limit(2, RegexpLimitAction::Ignore);
        let schema = schema_with("Both", plugin);
        let mut log = ParseLog::default();
        let events = dispatch("x x x y", &schema, &mut log).expect("no fatal");
        // The first pattern overflows at its third match; the second pattern
        // never runs.
        assert_eq!(events.iter().map(|e| e.pos).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn normalize_uppercases_and_drops_unknown() {
        let mut schema = Schema::default();
        schema.tags.insert("B".to_string(), TagConfig::default());
        let mut events = vec![
            TagEvent::new(TagKind::START, "b", 0, 3),
            TagEvent::new(TagKind::START, "nosuch", 5, 8),
        ];
        let mut log = ParseLog::default();
        normalize(&mut events, &schema, &mut log);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "B");
        assert!(log.contains(Severity::Debug, "Unknown tag"));
    }
}
