//! Tag resolution: the stage that turns sorted candidate events into a
//! single consistent, well-nested tag sequence.
//!
//! The resolver pops candidates in document order, maintains the open-tag
//! stack and the active allow-set, enforces the schema's structural rules,
//! heals mis-nesting by synthesizing zero-length end tags, runs the
//! attribute pipeline, and applies whitespace trimming the moment a tag is
//! appended. Every anomaly is recovered locally: an invalid event is
//! dropped and logged, never re-raised.

mod stack;
mod trim;

use std::collections::{HashMap, HashSet};

use crate::event::{TagEvent, TagKind};
use crate::filters::filter_event_attributes;
use crate::logger::{LogEntry, ParseLog, Severity};
use crate::schema::Schema;
use stack::{OpenStack, OpenTag};

/// Bound on `closeParent` synthesis per processed start tag. Cascades are
/// structurally bounded by the stack depth; this guard caps pathological
/// schemas outright.
const CLOSE_PARENT_GUARD: usize = 32;

/// Resolve sorted candidates (`pending` is a pop-stack: earliest event on
/// top) into processed tags in document order.
pub(crate) fn resolve(
    schema: &Schema,
    text: &str,
    pending: Vec<TagEvent>,
    log: &mut ParseLog,
) -> Vec<TagEvent> {
    Resolver {
        schema,
        text,
        log,
        stack: OpenStack::default(),
        allowed: schema.initial_allow(),
        total: HashMap::new(),
        cursor: 0,
        output: Vec::new(),
        guard: CLOSE_PARENT_GUARD,
    }
    .run(pending)
}

struct Resolver<'a> {
    schema: &'a Schema,
    text: &'a str,
    log: &'a mut ParseLog,
    stack: OpenStack,
    /// Names permitted in the current context; intersected on open,
    /// restored from the stack snapshot on close.
    allowed: HashSet<String>,
    /// Total occurrences accepted per name (tag-limit accounting).
    total: HashMap<String, usize>,
    /// Right edge of the last appended tag; events starting before it were
    /// overwritten by trimming or healing and are skipped.
    cursor: usize,
    output: Vec<TagEvent>,
    guard: usize,
}

impl Resolver<'_> {
    fn run(mut self, mut pending: Vec<TagEvent>) -> Vec<TagEvent> {
        while let Some(event) = pending.pop() {
            if self.cursor > event.pos {
                self.log.push(
                    Severity::Debug,
                    LogEntry::new("Tag skipped").at(event.pos).for_tag(&event.name),
                );
                continue;
            }
            if event.kind.is_start() {
                self.process_start(event, &mut pending);
            } else {
                self.process_end(event);
            }
        }
        log::debug!(
            target: "markup",
            "resolution done: {} tags, max depth {}",
            self.output.len(),
            self.stack.max_depth()
        );
        self.output
    }

    fn process_start(&mut self, mut event: TagEvent, pending: &mut Vec<TagEvent>) {
        let schema = self.schema;
        let Some(cfg) = schema.tags.get(&event.name) else {
            return;
        };

        // Sibling healing: close the parent this tag wants gone, then come
        // back to this event. The loop restarts, so closes can cascade.
        let closing = self
            .stack
            .top()
            .filter(|top| cfg.rules.close_parent.contains(&top.name))
            .map(|top| (top.name.clone(), top.suffix.clone()));
        if let Some((parent_name, parent_suffix)) = closing {
            if self.guard == 0 {
                self.log.push(
                    Severity::Error,
                    LogEntry::new("Auto-close cascade exceeded depth limit")
                        .at(event.pos)
                        .for_tag(&event.name),
                );
                return;
            }
            self.guard -= 1;
            let parent_end =
                TagEvent::new(TagKind::END, parent_name, event.pos, 0).with_suffix(parent_suffix);
            pending.push(event);
            pending.push(parent_end);
            return;
        }
        self.guard = CLOSE_PARENT_GUARD;

        // Limits drop silently.
        if self.stack.open_count(&event.name) >= cfg.nesting_limit {
            return;
        }
        if self.total.get(&event.name).copied().unwrap_or(0) >= cfg.tag_limit {
            return;
        }

        if !self.allowed.contains(&event.name) {
            self.log.push(
                Severity::Debug,
                LogEntry::new("Tag is not allowed in this context")
                    .at(event.pos)
                    .for_tag(&event.name),
            );
            return;
        }

        if let Some(required) = &cfg.rules.require_parent
            && self.stack.top().map(|t| t.name.as_str()) != Some(required.as_str())
        {
            self.log.push(
                Severity::Error,
                LogEntry::new("Tag requires {} as parent")
                    .param(required)
                    .at(event.pos)
                    .for_tag(&event.name),
            );
            return;
        }

        for ancestor in &cfg.rules.require_ascendant {
            if self.stack.open_count(ancestor) == 0 {
                self.log.push(
                    Severity::Debug,
                    LogEntry::new("Tag requires {} as ascendant")
                        .param(ancestor)
                        .at(event.pos)
                        .for_tag(&event.name),
                );
                return;
            }
        }

        for (attr_name, attr_cfg) in &cfg.attrs {
            if let Some(default) = &attr_cfg.default
                && !event.attrs.contains_key(attr_name)
            {
                event.attrs.insert(attr_name.clone(), default.clone());
            }
        }
        if !filter_event_attributes(&mut event, cfg, &schema.filters, self.log) {
            return;
        }

        *self.total.entry(event.name.clone()).or_insert(0) += 1;
        let kind = event.kind;
        let name = event.name.clone();
        let suffix = event.pair_suffix().to_string();
        self.append(event);

        if !kind.is_end() {
            let next: HashSet<String> = self.allowed.intersection(&cfg.allow).cloned().collect();
            let previous = std::mem::replace(&mut self.allowed, next);
            self.stack.push(OpenTag {
                name,
                suffix,
                allowed: previous,
            });
        }
    }

    fn process_end(&mut self, event: TagEvent) {
        let suffix = event.pair_suffix().to_string();
        if self.stack.open_pairs(&event.name, &suffix) == 0 {
            self.log.push(
                Severity::Debug,
                LogEntry::new("Unmatched end tag").at(event.pos).for_tag(&event.name),
            );
            return;
        }
        loop {
            let Some(top) = self.stack.pop() else {
                break;
            };
            self.allowed = top.allowed;
            if top.name == event.name && top.suffix == suffix {
                break;
            }
            // Whatever was left open above the match closes here with a
            // zero-length end tag.
            let synth =
                TagEvent::new(TagKind::END, top.name, event.pos, 0).with_suffix(top.suffix);
            self.append(synth);
        }
        self.append(event);
    }

    /// Apply trim directives against the current output cursor, then commit
    /// the tag and advance the cursor past it.
    fn append(&mut self, mut event: TagEvent) {
        if let Some(cfg) = self.schema.tags.get(&event.name) {
            trim::absorb(&mut event, cfg, self.text, self.cursor);
        }
        debug_assert!(
            event.pos >= self.cursor,
            "appended tag must not precede the output cursor"
        );
        self.cursor = event.pos + event.len;
        self.output.push(event);
    }
}
