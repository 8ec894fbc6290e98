//! Typed attribute-filter library and the per-tag attribute pipeline.
//!
//! Every filter is total: it returns the canonical value or `None` for
//! invalid, and records diagnostics through [`FilterContext`] instead of
//! failing the parse. Context (current tag, current attribute, position) is
//! threaded explicitly so log entries stay enriched without engine-wide
//! mutable state.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::event::TagEvent;
use crate::logger::{LogEntry, ParseLog, Severity};
use crate::schema::{FilterConfig, FilterType, TagConfig};

/// Log-enrichment context for one attribute (or tag-level) filter run.
pub struct FilterContext<'a> {
    log: &'a mut ParseLog,
    tag_name: &'a str,
    attr_name: Option<&'a str>,
    pos: usize,
}

impl<'a> FilterContext<'a> {
    pub fn new(log: &'a mut ParseLog, tag_name: &'a str, pos: usize) -> Self {
        Self {
            log,
            tag_name,
            attr_name: None,
            pos,
        }
    }

    pub fn with_attr(mut self, attr_name: &'a str) -> Self {
        self.attr_name = Some(attr_name);
        self
    }

    /// Entry pre-filled with the current tag/attribute/position.
    pub fn entry(&self, msg: &'static str) -> LogEntry {
        let mut entry = LogEntry::new(msg).at(self.pos).for_tag(self.tag_name);
        if let Some(attr) = self.attr_name {
            entry = entry.for_attr(attr);
        }
        entry
    }

    pub fn debug(&mut self, entry: LogEntry) {
        self.log.push(Severity::Debug, entry);
    }

    pub fn warning(&mut self, entry: LogEntry) {
        self.log.push(Severity::Warning, entry);
    }

    pub fn error(&mut self, entry: LogEntry) {
        self.log.push(Severity::Error, entry);
    }
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9_-]+$").expect("static regex"));
static SIMPLETEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-+.,_ ]+$").expect("static regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("static regex")
});
static COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:#[0-9a-f]{3,6}|[a-z]+)$").expect("static regex"));

/// Apply one typed filter. A configured override callback for the type name
/// wins over the built-in behavior.
pub fn apply(
    filter: &FilterType,
    value: &str,
    config: &FilterConfig,
    ctx: &mut FilterContext<'_>,
) -> Option<String> {
    if let Some(callback) = config.overrides.get(filter.name()) {
        return callback(value, ctx);
    }
    match filter {
        FilterType::Url => filter_url(value, config, ctx),
        FilterType::Identifier => IDENTIFIER.is_match(value).then(|| value.to_string()),
        FilterType::Simpletext => SIMPLETEXT.is_match(value).then(|| value.to_string()),
        FilterType::Text => Some(value.to_string()),
        FilterType::Email => EMAIL.is_match(value).then(|| value.to_string()),
        FilterType::Int => value.parse::<i64>().ok().map(|v| v.to_string()),
        FilterType::Float => filter_float(value),
        FilterType::Number => filter_number(value),
        FilterType::Range { min, max } => filter_range(value, *min, *max, ctx),
        FilterType::Color => COLOR.is_match(value).then(|| value.to_string()),
        FilterType::Regexp { regexp, replace } => filter_regexp(value, regexp, replace.as_deref()),
        FilterType::Custom(_) => {
            ctx.debug(ctx.entry("Unknown filter"));
            None
        }
    }
}

/// Absolute URL with an allowed scheme and a non-disallowed host. The
/// original spelling is preserved; only quotes are percent-encoded so the
/// value can be embedded in either attribute quoting style downstream.
fn filter_url(value: &str, config: &FilterConfig, ctx: &mut FilterContext<'_>) -> Option<String> {
    let parsed = Url::parse(value).ok()?;
    if !config.url.allowed_schemes.is_match(parsed.scheme()) {
        ctx.error(
            ctx.entry("URL scheme {} is not allowed")
                .param(parsed.scheme()),
        );
        return None;
    }
    if let Some(disallowed) = &config.url.disallowed_hosts
        && let Some(host) = parsed.host_str()
        && disallowed.is_match(host)
    {
        ctx.error(ctx.entry("URL host {} is not allowed").param(host));
        return None;
    }
    Some(value.replace('\'', "%27").replace('"', "%22"))
}

fn filter_float(value: &str) -> Option<String> {
    let parsed = value.parse::<f64>().ok()?;
    parsed.is_finite().then(|| parsed.to_string())
}

/// Non-negative decimal integer of any length; canonical form strips
/// leading zeros.
fn filter_number(value: &str) -> Option<String> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let stripped = value.trim_start_matches('0');
    Some(if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    })
}

fn filter_range(value: &str, min: i64, max: i64, ctx: &mut FilterContext<'_>) -> Option<String> {
    let parsed = value.parse::<i64>().ok()?;
    if parsed < min {
        ctx.warning(ctx.entry("Minimum range value adjusted to {}").param(min));
        return Some(min.to_string());
    }
    if parsed > max {
        ctx.warning(ctx.entry("Maximum range value adjusted to {}").param(max));
        return Some(max.to_string());
    }
    Some(parsed.to_string())
}

fn filter_regexp(value: &str, regexp: &Regex, replace: Option<&str>) -> Option<String> {
    let caps = regexp.captures(value)?;
    match replace {
        None => Some(value.to_string()),
        Some(template) => Some(expand_replacement(&caps, template)),
    }
}

/// `$N` inserts capture N (empty when absent), `\$` is a literal dollar,
/// `\\` halves to a single backslash.
fn expand_replacement(caps: &regex::Captures<'_>, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
            continue;
        }
        if c != '$' {
            out.push(c);
            continue;
        }
        let mut digits = String::new();
        while digits.len() < 2 {
            match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    digits.push(*d);
                    chars.next();
                }
                _ => break,
            }
        }
        if digits.is_empty() {
            out.push('$');
        } else if let Ok(n) = digits.parse::<usize>()
            && let Some(group) = caps.get(n)
        {
            out.push_str(group.as_str());
        }
    }
    out
}

/// The per-tag attribute pipeline: tag-level pre-filters, per-attribute
/// filter chains, undeclared-attribute removal, tag-level post-filters, and
/// the final required check. Returns `false` when the tag must be dropped
/// (a required attribute ended up absent).
pub(crate) fn filter_event_attributes(
    event: &mut TagEvent,
    cfg: &TagConfig,
    filters: &FilterConfig,
    log: &mut ParseLog,
) -> bool {
    for transform in &cfg.pre_filter {
        transform(&mut event.attrs);
    }

    for (attr_name, attr_cfg) in &cfg.attrs {
        let Some(raw) = event.attrs.get(attr_name).cloned() else {
            continue;
        };
        let mut value = raw.clone();
        for pre in &attr_cfg.pre_filters {
            value = pre(&value);
        }
        let mut ctx = FilterContext::new(log, &event.name, event.pos).with_attr(attr_name);
        match apply(&attr_cfg.filter, &value, filters, &mut ctx) {
            Some(mut filtered) => {
                for post in &attr_cfg.post_filters {
                    filtered = post(&filtered);
                }
                if filtered != raw {
                    ctx.debug(ctx.entry("Attribute value was altered by the filter"));
                }
                event.attrs.insert(attr_name.clone(), filtered);
            }
            None => {
                ctx.error(ctx.entry("Invalid attribute value"));
                match &attr_cfg.default {
                    Some(default) => {
                        ctx.debug(ctx.entry("Default value substituted"));
                        event.attrs.insert(attr_name.clone(), default.clone());
                    }
                    None => {
                        event.attrs.remove(attr_name);
                    }
                }
            }
        }
    }

    let undeclared: Vec<String> = event
        .attrs
        .keys()
        .filter(|k| !cfg.attrs.contains_key(*k))
        .cloned()
        .collect();
    for name in undeclared {
        event.attrs.remove(&name);
        log.push(
            Severity::Debug,
            LogEntry::new("Unknown attribute removed")
                .at(event.pos)
                .for_tag(&event.name)
                .for_attr(name),
        );
    }

    for transform in &cfg.post_filter {
        transform(&mut event.attrs);
    }

    for (attr_name, attr_cfg) in &cfg.attrs {
        if attr_cfg.required && !event.attrs.contains_key(attr_name) {
            log.push(
                Severity::Error,
                LogEntry::new("Missing required attribute")
                    .at(event.pos)
                    .for_tag(&event.name)
                    .for_attr(attr_name),
            );
            return false;
        }
    }
    true
}
