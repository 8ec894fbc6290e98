//! Tag-event model shared by every pipeline stage.
//!
//! Invariant: `pos` and `len` are **byte** offsets/lengths into the input
//! buffer, never code-point counts. Plugin regexes already report byte
//! offsets; whitespace trimming counts bytes. Downstream stages rely on this
//! to slice the input without re-scanning.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map. Lexicographic key order is the serialization order, so the
/// map is ordered rather than hashed.
pub type AttrMap = BTreeMap<String, String>;

/// Bitwise occurrence kind. `SELF_CLOSING` is the union of both bits, so
/// `is_start()`/`is_end()` are the meaningful predicates, not equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagKind(u8);

impl TagKind {
    pub const START: TagKind = TagKind(1);
    pub const END: TagKind = TagKind(2);
    pub const SELF_CLOSING: TagKind = TagKind(1 | 2);

    pub fn is_start(self) -> bool {
        self.0 & TagKind::START.0 != 0
    }

    pub fn is_end(self) -> bool {
        self.0 & TagKind::END.0 != 0
    }

    /// Sort rank: START (1) < END (2) < SELF_CLOSING (3). An end tag that
    /// abuts a start tag at the same position belongs to the earlier block,
    /// so it must sort after the start; self-closing arrives last.
    pub(crate) fn rank(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TagKind::START => f.write_str("START"),
            TagKind::END => f.write_str("END"),
            TagKind::SELF_CLOSING => f.write_str("SELF_CLOSING"),
            TagKind(other) => write!(f, "TagKind({other})"),
        }
    }
}

/// One start, end, or self-closing occurrence of a named tag in the input.
///
/// Recognizers construct events with [`TagEvent::new`]; dispatch stamps the
/// origin plugin and the default suffix. `trim_before`/`trim_after` are
/// byte counts of absorbed whitespace, written by the resolver only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagEvent {
    pub pos: usize,
    pub len: usize,
    pub name: String,
    pub kind: TagKind,
    pub attrs: AttrMap,
    /// Pairing identifier. `None` until dispatch assigns `-<pluginName>`;
    /// explicit suffixes (user-supplied pairing) survive as-is.
    pub suffix: Option<String>,
    /// Origin plugin. Empty for events synthesized by the resolver.
    pub plugin: String,
    pub trim_before: usize,
    pub trim_after: usize,
}

impl TagEvent {
    pub fn new(kind: TagKind, name: impl Into<String>, pos: usize, len: usize) -> Self {
        Self {
            pos,
            len,
            name: name.into(),
            kind,
            attrs: AttrMap::new(),
            suffix: None,
            plugin: String::new(),
            trim_before: 0,
            trim_after: 0,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Exclusive end offset of the event's textual span.
    pub fn end(&self) -> usize {
        self.pos + self.len
    }

    /// Suffix as used for start/end pairing. Dispatch guarantees `Some` for
    /// every plugin-emitted event; synthesized events carry their source's.
    pub(crate) fn pair_suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or("")
    }
}

/// Document-order comparator: position, then kind rank, then origin plugin.
pub(crate) fn document_order(a: &TagEvent, b: &TagEvent) -> Ordering {
    a.pos
        .cmp(&b.pos)
        .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
        .then_with(|| a.plugin.cmp(&b.plugin))
}

/// Sort candidates into a pop-stack: descending document order, so `pop()`
/// hands the resolver the earliest event first.
pub(crate) fn sort_into_stack(events: &mut [TagEvent]) {
    events.sort_by(|a, b| document_order(b, a));
}
