//! End-to-end behavior on the forum schema: links, lists, quotes, filters,
//! entities, and the fatal match-budget path.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use regex::Regex;

use markup::plugins::{BbCodes, Emoticons};
use markup::schema::{PluginConfig, RegexpLimitAction, Schema, TagConfig};
use markup::{ParseError, Parser, Severity, TagKind};
use markup_test_support::{diff_lines, extract_source, forum_schema};

fn parse(input: &str) -> markup::Parsed {
    Parser::new(forum_schema())
        .parse(input)
        .expect("forum schema parses are total")
}

fn kinds(parsed: &markup::Parsed) -> Vec<(&str, TagKind)> {
    parsed
        .tags
        .iter()
        .map(|t| (t.name.as_str(), t.kind))
        .collect()
}

#[test]
fn autolink_strips_trailing_dot_but_keeps_balanced_paren() {
    let input = "Visit http://en.wikipedia.org/wiki/Mars_(disambiguation).";
    let parsed = parse(input);
    assert_eq!(
        parsed.tags[0].attrs.get("url").map(String::as_str),
        Some("http://en.wikipedia.org/wiki/Mars_(disambiguation)")
    );
    assert_eq!(
        parsed.xml,
        "<rt>Visit <URL url=\"http://en.wikipedia.org/wiki/Mars_(disambiguation)\">\
         http://en.wikipedia.org/wiki/Mars_(disambiguation)</URL>.</rt>"
    );
    assert_eq!(extract_source(&parsed.xml), input);
}

#[test]
fn nested_quote_in_list_item_with_emoticon() {
    let input = "[list][*][quote]\n[*][quote]test[/quote][/quote]:)[/list]";
    let parsed = parse(input);
    assert_eq!(
        kinds(&parsed),
        vec![
            ("LIST", TagKind::START),
            ("LI", TagKind::START),
            ("QUOTE", TagKind::START),
            ("QUOTE", TagKind::START),
            ("QUOTE", TagKind::END),
            ("QUOTE", TagKind::END),
            ("E", TagKind::SELF_CLOSING),
            ("LI", TagKind::END),
            ("LIST", TagKind::END),
        ]
    );
    // The second `[*]` sits inside a quote where no list item may open; it
    // stays literal text.
    assert!(parsed
        .log
        .contains(Severity::Debug, "Tag is not allowed in this context"));
    // The outer [/list] closes the still-open item with a zero-length end
    // at its own position.
    let li_end = &parsed.tags[7];
    let list_end = &parsed.tags[8];
    assert_eq!(li_end.len, 0);
    assert_eq!(li_end.pos, list_end.pos);
    assert_eq!(extract_source(&parsed.xml), input);
}

#[test]
fn second_list_item_closes_its_sibling() {
    let input = "[list][*]one[*]two[/list]";
    let parsed = parse(input);
    assert_eq!(
        kinds(&parsed),
        vec![
            ("LIST", TagKind::START),
            ("LI", TagKind::START),
            ("LI", TagKind::END),
            ("LI", TagKind::START),
            ("LI", TagKind::END),
            ("LIST", TagKind::END),
        ]
    );
    // The healed sibling end is zero-length at the second item's position.
    let healed = &parsed.tags[2];
    let second = &parsed.tags[3];
    assert_eq!(healed.len, 0);
    assert_eq!(healed.pos, second.pos);
    assert_eq!(extract_source(&parsed.xml), input);
}

#[test]
fn url_with_disallowed_scheme_degrades_to_text() {
    let input = "[url=javascript:alert(1)]x[/url]";
    let parsed = parse(input);
    assert_eq!(parsed.xml, "<pt>[url=javascript:alert(1)]x[/url]</pt>");
    assert!(parsed.tags.is_empty());
    assert!(parsed
        .log
        .contains(Severity::Error, "URL scheme javascript is not allowed"));
}

#[test]
fn range_attribute_clamps_to_maximum_with_warning() {
    let input = "I am [size=42]loud[/size]";
    let parsed = parse(input);
    let size = parsed
        .tags
        .iter()
        .find(|t| t.name == "SIZE")
        .expect("size tag survives");
    assert_eq!(size.attrs.get("size").map(String::as_str), Some("20"));
    assert!(parsed
        .log
        .contains(Severity::Warning, "Maximum range value adjusted to 20"));
    assert!(parsed.xml.contains("<SIZE size=\"20\">"));
}

#[test]
fn html_entity_becomes_self_closing_tag_with_decoded_char() {
    let input = "A &amp; B";
    let parsed = parse(input);
    assert_eq!(parsed.tags.len(), 1);
    let entity = &parsed.tags[0];
    assert_eq!(entity.kind, TagKind::SELF_CLOSING);
    assert_eq!((entity.pos, entity.len), (2, 5));
    assert_eq!(entity.attrs.get("char").map(String::as_str), Some("&"));
    assert_eq!(parsed.xml, "<rt>A <HE char=\"&amp;\">&amp;amp;</HE> B</rt>");
    assert_eq!(extract_source(&parsed.xml), input);
}

#[test]
fn regexp_limit_abort_raises_with_plugin_name() {
    let mut schema = Schema::default();
    schema.tags.insert("E".to_string(), TagConfig::default());
    schema.plugins.insert(
        "Emoticons".to_string(),
        PluginConfig::new(
            Regex::new(r":\)").expect("test regex"),
            Arc::new(Emoticons::new()),
        )
        .with_limit(1, RegexpLimitAction::Abort),
    );
    let parser = Parser::new(schema);
    let err = parser.parse(":) :)").expect_err("limit must abort");
    let ParseError::RegexpLimitExceeded { plugin } = err;
    assert_eq!(plugin, "Emoticons");
}

#[test]
fn explicit_suffixes_pair_across_lookalike_ends() {
    let input = "[i:7]a[/i]b[/i:7]";
    let parsed = parse(input);
    assert_eq!(
        kinds(&parsed),
        vec![("I", TagKind::START), ("I", TagKind::END)]
    );
    // [/i] carries the plugin's default suffix and cannot close [i:7].
    assert!(parsed.log.contains(Severity::Debug, "Unmatched end tag"));
    let expected = "<rt><I><st>[i:7]</st>a[/i]b<et>[/i:7]</et></I></rt>";
    assert_eq!(
        parsed.xml,
        expected,
        "{}",
        diff_lines(expected, &parsed.xml)
    );
}

#[test]
fn trim_directives_wrap_absorbed_whitespace() {
    let mut schema = Schema::default();
    schema.tags.insert(
        "CENTER".to_string(),
        TagConfig {
            trim_before: true,
            ltrim_content: true,
            rtrim_content: true,
            trim_after: true,
            ..TagConfig::default()
        },
    );
    schema.plugins.insert(
        "BbCodes".to_string(),
        PluginConfig::new(
            Regex::new(r"(?i)\[/?[a-z*][^\[\]]*\]").expect("test regex"),
            Arc::new(BbCodes::new()),
        ),
    );
    let parser = Parser::new(schema);
    let input = "a \n[center] x [/center] \nb";
    let parsed = parser.parse(input).expect("total parse");
    assert_eq!(
        parsed.xml,
        "<rt>a<i> \n</i><CENTER><st>[center]</st><i> </i>x<i> </i>\
         <et>[/center]</et></CENTER><i> \n</i>b</rt>"
    );
    assert_eq!(extract_source(&parsed.xml), input);
}

#[test]
fn autolink_inside_link_context_stays_text() {
    let input = "[url=http://a.example/]see http://b.example/ here[/url]";
    let parsed = parse(input);
    assert_eq!(
        kinds(&parsed),
        vec![("URL", TagKind::START), ("URL", TagKind::END)]
    );
    assert_eq!(
        parsed.tags[0].attrs.get("url").map(String::as_str),
        Some("http://a.example/")
    );
    assert!(parsed
        .log
        .contains(Severity::Debug, "Tag is not allowed in this context"));
    assert_eq!(extract_source(&parsed.xml), input);
}
