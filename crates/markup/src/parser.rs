//! Parse session orchestration.
//!
//! One `Parser` owns the schema (with its eagerly constructed recognizers)
//! and the emitter, and drives the five stages per parse: plugin dispatch,
//! normalization, sort, resolution, serialization. All per-parse state lives
//! on the stack of `parse`, so a parser can be shared and reused; the schema
//! is never written after construction.

use crate::event::{TagEvent, sort_into_stack};
use crate::logger::ParseLog;
use crate::plugins;
use crate::resolver;
use crate::schema::Schema;
use crate::serializer::{Emitter, XmlEmitter};

/// The only fatal parse outcome. Every other anomaly is recovered locally
/// and recorded in the parse log.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("regexp limit exceeded by plugin {plugin}")]
    RegexpLimitExceeded { plugin: String },
}

/// Result of one parse: the serialized tree, the processed tags in document
/// order, and the structured log.
#[derive(Clone, Debug)]
pub struct Parsed {
    pub xml: String,
    pub tags: Vec<TagEvent>,
    pub log: ParseLog,
}

pub struct Parser {
    schema: Schema,
    emitter: Box<dyn Emitter>,
}

impl Parser {
    pub fn new(schema: Schema) -> Self {
        Self::with_emitter(schema, Box::new(XmlEmitter))
    }

    /// Swap the serialization format without changing resolution semantics.
    pub fn with_emitter(schema: Schema, emitter: Box<dyn Emitter>) -> Self {
        Self { schema, emitter }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parse `text` into a well-formed tree.
    ///
    /// Total over valid schemas: any input produces a tree (possibly just
    /// `<pt>`), unless a plugin overruns its match budget under the abort
    /// policy.
    pub fn parse(&self, text: &str) -> Result<Parsed, ParseError> {
        let mut log = ParseLog::default();
        let mut events = plugins::dispatch(text, &self.schema, &mut log)?;
        plugins::normalize(&mut events, &self.schema, &mut log);
        sort_into_stack(&mut events);
        let tags = resolver::resolve(&self.schema, text, events, &mut log);
        let xml = self.emitter.emit(text, &tags);
        Ok(Parsed { xml, tags, log })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TagKind;
    use crate::plugins::Emoticons;
    use crate::schema::{PluginConfig, TagConfig};
    use regex::Regex;
    use std::sync::Arc;

    fn smiley_schema() -> Schema {
        let mut schema = Schema::default();
        schema.tags.insert("E".to_string(), TagConfig::default());
        schema.plugins.insert(
            "Emoticons".to_string(),
            PluginConfig::new(Regex::new(r":\)").expect("test regex"), Arc::new(Emoticons::new())),
        );
        schema
    }

    #[test]
    fn no_match_yields_plain_text() {
        let parser = Parser::new(smiley_schema());
        let parsed = parser.parse("hello").expect("total parse");
        assert_eq!(parsed.xml, "<pt>hello</pt>");
        assert!(parsed.tags.is_empty());
        assert!(parsed.log.is_empty());
    }

    #[test]
    fn parser_is_reusable_and_deterministic() {
        let parser = Parser::new(smiley_schema());
        let first = parser.parse("a :) b").expect("total parse");
        let second = parser.parse("a :) b").expect("total parse");
        assert_eq!(first.xml, second.xml);
        assert_eq!(first.tags, second.tags);
        assert_eq!(first.log, second.log);
        assert_eq!(first.xml, "<rt>a <E>:)</E> b</rt>");
    }

    #[test]
    fn custom_emitter_replaces_serialization() {
        struct Count;
        impl Emitter for Count {
            fn emit(&self, _text: &str, tags: &[TagEvent]) -> String {
                format!("{} tags", tags.len())
            }
        }
        let parser = Parser::with_emitter(smiley_schema(), Box::new(Count));
        let parsed = parser.parse(":) :)").expect("total parse");
        assert_eq!(parsed.xml, "2 tags");
        assert_eq!(parsed.tags[0].kind, TagKind::SELF_CLOSING);
    }
}
