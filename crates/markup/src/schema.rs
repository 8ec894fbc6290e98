//! Read-only parse schema: tag rules, plugin wiring, filter settings.
//!
//! The schema is plain data produced by an external configuration layer and
//! consumed verbatim here. It is immutable for the duration of a parse and
//! can be shared across parsers. Tag names are canonical uppercase; plugin
//! names are capitalized identifiers; both maps iterate in insertion order
//! so parses are deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use regex::Regex;

use crate::event::AttrMap;
use crate::filters::FilterContext;
use crate::plugins::Recognizer;

pub const DEFAULT_NESTING_LIMIT: usize = 10;
pub const DEFAULT_TAG_LIMIT: usize = 5000;
pub const DEFAULT_REGEXP_LIMIT: usize = 10_000;

/// Tag-level transform over the whole attribute map (pre/post filter).
pub type AttrMapTransform = Arc<dyn Fn(&mut AttrMap) + Send + Sync>;

/// Attribute-level unary string transform (pre/post filter chain link).
pub type StrTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// User override for a typed filter. Returns the canonical value or `None`
/// for invalid.
pub type FilterCallback =
    Arc<dyn Fn(&str, &mut FilterContext<'_>) -> Option<String> + Send + Sync>;

/// Typed attribute filter. Parameters that the reference keeps as loose
/// attribute-config keys (range bounds, match pattern) live on the variant.
#[derive(Clone, Debug)]
pub enum FilterType {
    Url,
    Identifier,
    Simpletext,
    Text,
    Email,
    Int,
    Float,
    Number,
    Range { min: i64, max: i64 },
    Color,
    Regexp { regexp: Regex, replace: Option<String> },
    /// Dispatched through [`FilterConfig::overrides`] by name; an unknown
    /// name yields the invalid sentinel.
    Custom(&'static str),
}

impl FilterType {
    /// Name used to look up a user override callback.
    pub fn name(&self) -> &'static str {
        match self {
            FilterType::Url => "url",
            FilterType::Identifier => "identifier",
            FilterType::Simpletext => "simpletext",
            FilterType::Text => "text",
            FilterType::Email => "email",
            FilterType::Int => "int",
            FilterType::Float => "float",
            FilterType::Number => "number",
            FilterType::Range { .. } => "range",
            FilterType::Color => "color",
            FilterType::Regexp { .. } => "regexp",
            FilterType::Custom(name) => name,
        }
    }
}

/// Per-attribute configuration.
#[derive(Clone)]
pub struct AttrConfig {
    pub filter: FilterType,
    pub required: bool,
    pub default: Option<String>,
    pub pre_filters: Vec<StrTransform>,
    pub post_filters: Vec<StrTransform>,
}

impl AttrConfig {
    pub fn new(filter: FilterType) -> Self {
        Self {
            filter,
            required: false,
            default: None,
            pre_filters: Vec::new(),
            post_filters: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Structural rules applied during resolution.
#[derive(Clone, Debug, Default)]
pub struct TagRules {
    /// Parent names this tag closes before opening (sibling healing).
    pub close_parent: HashSet<String>,
    /// Exact name required at the top of the open stack.
    pub require_parent: Option<String>,
    /// Names that must be open somewhere on the ancestor chain.
    pub require_ascendant: Vec<String>,
}

/// Per-tag schema entry.
#[derive(Clone)]
pub struct TagConfig {
    /// Names permitted as content of this tag; intersected down the stack.
    pub allow: HashSet<String>,
    /// Maximum simultaneously open instances on any ancestor chain.
    pub nesting_limit: usize,
    /// Maximum total occurrences in one parse.
    pub tag_limit: usize,
    pub rules: TagRules,
    pub trim_before: bool,
    pub ltrim_content: bool,
    pub rtrim_content: bool,
    pub trim_after: bool,
    pub attrs: IndexMap<String, AttrConfig>,
    pub pre_filter: Vec<AttrMapTransform>,
    pub post_filter: Vec<AttrMapTransform>,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            allow: HashSet::new(),
            nesting_limit: DEFAULT_NESTING_LIMIT,
            tag_limit: DEFAULT_TAG_LIMIT,
            rules: TagRules::default(),
            trim_before: false,
            ltrim_content: false,
            rtrim_content: false,
            trim_after: false,
            attrs: IndexMap::new(),
            pre_filter: Vec::new(),
            post_filter: Vec::new(),
        }
    }
}

/// What to do when a plugin exceeds its match budget. `Warn` is the
/// catch-all: any policy that is neither abort nor ignore degrades to a
/// warning so the parse stays total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegexpLimitAction {
    /// Fail the whole parse with a configuration-exceeded error.
    Abort,
    /// Drop excess matches, log at debug.
    Ignore,
    /// Drop excess matches, log at warning.
    #[default]
    Warn,
}

/// Per-plugin configuration. The recognizer instance is constructed when the
/// schema is built and reused across parses; it holds any plugin-private
/// settings itself.
#[derive(Clone)]
pub struct PluginConfig {
    pub regexps: Vec<Regex>,
    pub regexp_limit: usize,
    pub limit_action: RegexpLimitAction,
    pub recognizer: Arc<dyn Recognizer>,
}

impl PluginConfig {
    pub fn new(regexp: Regex, recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            regexps: vec![regexp],
            regexp_limit: DEFAULT_REGEXP_LIMIT,
            limit_action: RegexpLimitAction::default(),
            recognizer,
        }
    }

    pub fn with_regexp(mut self, regexp: Regex) -> Self {
        self.regexps.push(regexp);
        self
    }

    pub fn with_limit(mut self, limit: usize, action: RegexpLimitAction) -> Self {
        self.regexp_limit = limit;
        self.limit_action = action;
        self
    }
}

static DEFAULT_ALLOWED_SCHEMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^https?$").expect("static regex"));

/// Settings for the `url` typed filter.
#[derive(Clone, Debug)]
pub struct UrlFilterConfig {
    /// Anchored pattern the (lowercased) scheme must match.
    pub allowed_schemes: Regex,
    /// Hosts matching this pattern are rejected.
    pub disallowed_hosts: Option<Regex>,
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: DEFAULT_ALLOWED_SCHEMES.clone(),
            disallowed_hosts: None,
        }
    }
}

/// Global filter settings plus user override callbacks keyed by type name.
#[derive(Clone, Default)]
pub struct FilterConfig {
    pub url: UrlFilterConfig,
    pub overrides: HashMap<String, FilterCallback>,
}

/// The whole parse schema.
#[derive(Clone, Default)]
pub struct Schema {
    pub tags: IndexMap<String, TagConfig>,
    /// Plugins run in this order; outputs are merged by the sort stage.
    pub plugins: IndexMap<String, PluginConfig>,
    pub filters: FilterConfig,
    /// Names permitted at the document root; `None` means every tag.
    pub root_allow: Option<HashSet<String>>,
}

impl Schema {
    pub fn tag(&self, name: &str) -> Option<&TagConfig> {
        self.tags.get(name)
    }

    /// Allow-set active before any tag has opened.
    pub(crate) fn initial_allow(&self) -> HashSet<String> {
        match &self.root_allow {
            Some(allow) => allow.clone(),
            None => self.tags.keys().cloned().collect(),
        }
    }
}
