//! Two-stage text-markup parse engine.
//!
//! Untrusted text (forum posts, comments, wiki input) goes through a
//! pipeline of five stages:
//!
//! 1. **Plugin dispatch** — every configured plugin scans the text by regex
//!    and its recognizer emits candidate tag events.
//! 2. **Normalization** — names are canonicalized, events for unknown tags
//!    are dropped.
//! 3. **Sort** — candidates are ordered into a pop-stack by position, kind
//!    and origin plugin.
//! 4. **Resolution** — the candidates are reconciled into one well-nested
//!    tag sequence under the schema's rules (allow-sets, limits, required
//!    parents, auto-closing, attribute filtering, whitespace trimming).
//! 5. **Serialization** — the tags plus the intervening raw text become a
//!    well-formed XML tree (`<pt>`/`<rt>`); other formats plug in through
//!    [`Emitter`].
//!
//! Parsing is total: malformed input degrades to text, never to a malformed
//! tree. The one fatal outcome is a plugin overrunning its match budget
//! under the abort policy. Offsets are bytes throughout.

pub mod filters;
pub mod plugins;
pub mod schema;
pub mod serializer;

mod event;
mod logger;
mod parser;
mod resolver;

pub use crate::event::{AttrMap, TagEvent, TagKind};
pub use crate::logger::{LogEntry, ParseLog, Severity};
pub use crate::parser::{ParseError, Parsed, Parser};
pub use crate::serializer::{Emitter, XmlEmitter};
