//! Flexible assertion objects built by `!match` directives.
//!
//! A composed document stays a plain [`Value`]: the `!match` handler stores a
//! [`MatcherDescriptor`] (`{"$matcher": name, "$args": [...], ...}`) and
//! consumers rebuild the matcher through [`MatcherRegistry::from_descriptor`]
//! or compare whole documents with [`matches_expected`].

mod dates;

use crate::services::params::{Owner, Params};
use crate::{Error, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const DESCRIPTOR_KEY: &str = "$matcher";

/// A value predicate with a readable description.
pub trait Matcher: fmt::Debug {
    /// Registered name.
    fn name(&self) -> &'static str;

    fn matches(&self, actual: &Value) -> bool;

    /// Short form such as `<Any Text>`.
    fn describe(&self) -> String;

    /// Why `actual` does not match, or `None` when it does.
    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        (!self.matches(actual)).then(|| format!("{} != {}", shorten(actual), self.describe()))
    }
}

/// Matcher constructor. The registry is handed in so that matchers can
/// build nested matchers from descriptors in their arguments.
pub type MatcherFactory = Box<
    dyn Fn(&MatcherRegistry, &[Value], &Map<String, Value>) -> Result<Box<dyn Matcher>>
        + Send
        + Sync,
>;

/// Serialized form of a matcher inside a composed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherDescriptor {
    #[serde(rename = "$matcher")]
    pub name: String,
    #[serde(rename = "$args", default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(flatten)]
    pub kwargs: Map<String, Value>,
}

impl MatcherDescriptor {
    /// Descriptor stored in `value`, if it is one.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Object(map) if map.contains_key(DESCRIPTOR_KEY) => {
                serde_json::from_value(value.clone())
                    .map(Some)
                    .map_err(|err| Error::Matcher {
                        name: map
                            .get(DESCRIPTOR_KEY)
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                        reason: format!("malformed descriptor: {err}"),
                    })
            }
            _ => Ok(None),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|err| Error::Matcher {
            name: self.name.clone(),
            reason: format!("failed to serialize descriptor: {err}"),
        })
    }
}

/// Name → matcher factory registry.
#[derive(Default)]
pub struct MatcherRegistry {
    factories: BTreeMap<String, MatcherFactory>,
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl MatcherRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry preloaded with every built-in matcher.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let units = [
            ("Anything", Kind::Anything),
            ("AnyText", Kind::Text),
            ("AnyNumber", Kind::Number),
            ("AnyBool", Kind::Bool),
            ("AnyDict", Kind::Dict),
            ("AnyNonEmptyDict", Kind::NonEmptyDict),
            ("AnyList", Kind::List),
            ("AnyNonEmptyList", Kind::NonEmptyList),
        ];
        for (name, kind) in units {
            registry.insert(name, move |_, args, kwargs| unit(args, kwargs, name, kind));
        }

        registry.insert("AnyTextLike", |_, args, kwargs| AnyTextLike::build(args, kwargs));
        registry.insert("AnyTextWith", |_, args, kwargs| AnyTextWith::build(args, kwargs));
        registry.insert("AnyNumberGreaterThan", |_, args, kwargs| {
            NumberBound::build(args, kwargs, Bound::Greater)
        });
        registry.insert("AnyNumberLessThan", |_, args, kwargs| {
            NumberBound::build(args, kwargs, Bound::Less)
        });
        registry.insert("AnyNumberInRange", |_, args, kwargs| NumberRange::build(args, kwargs));

        for rule in [SizeRule::Exactly, SizeRule::LongerThan, SizeRule::ShorterThan] {
            registry.insert(rule.name(), move |_, args, kwargs| ListOf::build(args, kwargs, rule));
            registry.insert(ListOfMatchers::name_for(rule), move |registry, args, kwargs| {
                ListOfMatchers::build(registry, args, kwargs, rule)
            });
        }
        registry.insert("AnyListOfRange", |_, args, kwargs| ListOfRange::build(args, kwargs));

        registry.insert("AnyDate", |_, args, kwargs| dates::AnyDate::build(args, kwargs));
        registry.insert("AnyDateBefore", |_, args, kwargs| {
            dates::DateBound::build(args, kwargs, dates::Side::Before)
        });
        registry.insert("AnyDateAfter", |_, args, kwargs| {
            dates::DateBound::build(args, kwargs, dates::Side::After)
        });
        registry.insert("AnyDateInRange", |_, args, kwargs| dates::DateRange::build(args, kwargs));
        registry
    }

    fn insert<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&MatcherRegistry, &[Value], &Map<String, Value>) -> Result<Box<dyn Matcher>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Register a matcher factory; names must be unique.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(&[Value], &Map<String, Value>) -> Result<Box<dyn Matcher>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::Matcher {
                name,
                reason: "already registered".to_string(),
            });
        }
        self.insert(&name, move |_, args, kwargs| factory(args, kwargs));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the named matcher.
    pub fn construct(
        &self,
        name: &str,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Box<dyn Matcher>> {
        let factory = self.factories.get(name).ok_or_else(|| Error::Matcher {
            name: name.to_string(),
            reason: "not registered".to_string(),
        })?;
        factory(self, args, kwargs)
    }

    /// Rebuild a matcher from a descriptor value; `None` for ordinary values.
    pub fn from_descriptor(&self, value: &Value) -> Result<Option<Box<dyn Matcher>>> {
        match MatcherDescriptor::from_value(value)? {
            Some(descriptor) => self
                .construct(&descriptor.name, &descriptor.args, &descriptor.kwargs)
                .map(Some),
            None => Ok(None),
        }
    }
}

/// Structural comparison where descriptors in `expected` match through the
/// matcher they describe. Maps must have the same key set and sequences the
/// same length; everything else compares by equality.
pub fn matches_expected(
    expected: &Value,
    actual: &Value,
    registry: &MatcherRegistry,
) -> Result<bool> {
    Ok(Expected::build(expected, registry)?.matches(actual))
}

/// Expected value with every descriptor already turned into its matcher.
#[derive(Debug)]
enum Expected {
    Matcher(Box<dyn Matcher>),
    Map(Vec<(String, Expected)>),
    List(Vec<Expected>),
    Exact(Value),
}

impl Expected {
    fn build(value: &Value, registry: &MatcherRegistry) -> Result<Self> {
        if let Some(matcher) = registry.from_descriptor(value)? {
            return Ok(Self::Matcher(matcher));
        }
        Ok(match value {
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(key, child)| Ok((key.clone(), Self::build(child, registry)?)))
                    .collect::<Result<_>>()?,
            ),
            Value::Array(items) => Self::List(
                items
                    .iter()
                    .map(|child| Self::build(child, registry))
                    .collect::<Result<_>>()?,
            ),
            other => Self::Exact(other.clone()),
        })
    }

    fn matches(&self, actual: &Value) -> bool {
        match (self, actual) {
            (Self::Matcher(matcher), _) => matcher.matches(actual),
            (Self::Map(want), Value::Object(got)) => {
                want.len() == got.len()
                    && want
                        .iter()
                        .all(|(key, want)| got.get(key).is_some_and(|got| want.matches(got)))
            }
            (Self::List(want), Value::Array(got)) => {
                want.len() == got.len() && want.iter().zip(got).all(|(want, got)| want.matches(got))
            }
            (Self::Exact(want), _) => want == actual,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Matcher(matcher) => matcher.describe(),
            Self::Map(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(key, expected)| format!("\"{key}\": {}", expected.describe()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::describe).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Exact(value) => shorten(value),
        }
    }

    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        match self {
            Self::Matcher(matcher) => matcher.explain_mismatch(actual),
            _ if self.matches(actual) => None,
            _ => Some(format!("{} != {}", shorten(actual), self.describe())),
        }
    }
}

fn shorten(value: &Value) -> String {
    const LIMIT: usize = 80;
    let text = value.to_string();
    if text.chars().count() <= LIMIT {
        return text;
    }
    let head: String = text.chars().take(LIMIT).collect();
    format!("{head}...")
}

/// JSON type of a value, used for element type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    Null,
    Bool,
    Number,
    String,
    List,
    Dict,
}

impl JsonType {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Bool,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::List,
            Value::Object(_) => JsonType::Dict,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Bool => "bool",
            JsonType::Number => "number",
            JsonType::String => "text",
            JsonType::List => "list",
            JsonType::Dict => "dict",
        }
    }
}

/// Matchers without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Anything,
    Text,
    Number,
    Bool,
    Dict,
    NonEmptyDict,
    List,
    NonEmptyList,
}

#[derive(Debug)]
struct Unit {
    name: &'static str,
    kind: Kind,
}

fn unit(
    args: &[Value],
    kwargs: &Map<String, Value>,
    name: &'static str,
    kind: Kind,
) -> Result<Box<dyn Matcher>> {
    Params::bind(Owner::Matcher, name, args, kwargs, &[])?;
    Ok(Box::new(Unit { name, kind }))
}

impl Matcher for Unit {
    fn name(&self) -> &'static str {
        self.name
    }

    fn matches(&self, actual: &Value) -> bool {
        match self.kind {
            Kind::Anything => true,
            Kind::Text => actual.is_string(),
            Kind::Number => actual.is_number(),
            Kind::Bool => actual.is_boolean(),
            Kind::Dict => actual.is_object(),
            Kind::NonEmptyDict => actual.as_object().is_some_and(|map| !map.is_empty()),
            Kind::List => actual.is_array(),
            Kind::NonEmptyList => actual.as_array().is_some_and(|items| !items.is_empty()),
        }
    }

    fn describe(&self) -> String {
        let label = match self.kind {
            Kind::Anything => "<Anything>",
            Kind::Text => "<Any Text>",
            Kind::Number => "<Any Number>",
            Kind::Bool => "<Any Bool>",
            Kind::Dict => "<Any Dict>",
            Kind::NonEmptyDict => "<Any Non-Empty Dict>",
            Kind::List => "<Any List>",
            Kind::NonEmptyList => "<Any Non-Empty List>",
        };
        label.to_string()
    }
}

fn sensitivity(case_sensitive: bool) -> &'static str {
    if case_sensitive { "sensitive" } else { "insensitive" }
}

/// Text matching a regex anchored at the start.
#[derive(Debug)]
struct AnyTextLike {
    pattern: String,
    case_sensitive: bool,
    regex: Regex,
}

impl AnyTextLike {
    fn build(args: &[Value], kwargs: &Map<String, Value>) -> Result<Box<dyn Matcher>> {
        let params = Params::bind(
            Owner::Matcher,
            "AnyTextLike",
            args,
            kwargs,
            &["pattern", "case_sensitive"],
        )?;
        let pattern = params
            .str(0)?
            .ok_or_else(|| params.error("missing required argument \"pattern\""))?;
        let case_sensitive = params.bool(1)?.unwrap_or(false);

        let regex = RegexBuilder::new(&format!("^(?:{pattern})"))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|err| params.error(format!("invalid pattern: {err}")))?;

        Ok(Box::new(Self {
            pattern: pattern.to_string(),
            case_sensitive,
            regex,
        }))
    }
}

impl Matcher for AnyTextLike {
    fn name(&self) -> &'static str {
        "AnyTextLike"
    }

    fn matches(&self, actual: &Value) -> bool {
        actual.as_str().is_some_and(|text| self.regex.is_match(text))
    }

    fn describe(&self) -> String {
        format!(
            "<Any Text Like \"{}\", case {}>",
            self.pattern,
            sensitivity(self.case_sensitive)
        )
    }

    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        if self.matches(actual) {
            return None;
        }
        Some(match actual {
            Value::String(text) => format!(
                "\"{text}\" doesn't match case {} pattern \"{}\"",
                sensitivity(self.case_sensitive),
                self.pattern
            ),
            other => format!("type {} doesn't match expected text", JsonType::of(other).as_str()),
        })
    }
}

/// Text containing a substring.
#[derive(Debug)]
struct AnyTextWith {
    substring: String,
    case_sensitive: bool,
}

impl AnyTextWith {
    fn build(args: &[Value], kwargs: &Map<String, Value>) -> Result<Box<dyn Matcher>> {
        let params = Params::bind(
            Owner::Matcher,
            "AnyTextWith",
            args,
            kwargs,
            &["substring", "case_sensitive"],
        )?;
        let substring = params
            .str(0)?
            .ok_or_else(|| params.error("missing required argument \"substring\""))?;
        Ok(Box::new(Self {
            substring: substring.to_string(),
            case_sensitive: params.bool(1)?.unwrap_or(false),
        }))
    }
}

impl Matcher for AnyTextWith {
    fn name(&self) -> &'static str {
        "AnyTextWith"
    }

    fn matches(&self, actual: &Value) -> bool {
        let Some(text) = actual.as_str() else {
            return false;
        };
        if self.case_sensitive {
            text.contains(&self.substring)
        } else {
            text.to_lowercase().contains(&self.substring.to_lowercase())
        }
    }

    fn describe(&self) -> String {
        format!("<Any Text With \"{}\">", self.substring)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Greater,
    Less,
}

/// Number strictly above or below a limit.
#[derive(Debug)]
struct NumberBound {
    limit: f64,
    bound: Bound,
}

impl NumberBound {
    fn build(
        args: &[Value],
        kwargs: &Map<String, Value>,
        bound: Bound,
    ) -> Result<Box<dyn Matcher>> {
        let name = match bound {
            Bound::Greater => "AnyNumberGreaterThan",
            Bound::Less => "AnyNumberLessThan",
        };
        let params = Params::bind(Owner::Matcher, name, args, kwargs, &["number"])?;
        let limit = params
            .number(0)?
            .ok_or_else(|| params.error("missing required argument \"number\""))?;
        Ok(Box::new(Self { limit, bound }))
    }
}

impl Matcher for NumberBound {
    fn name(&self) -> &'static str {
        match self.bound {
            Bound::Greater => "AnyNumberGreaterThan",
            Bound::Less => "AnyNumberLessThan",
        }
    }

    fn matches(&self, actual: &Value) -> bool {
        actual.as_f64().is_some_and(|n| match self.bound {
            Bound::Greater => n > self.limit,
            Bound::Less => n < self.limit,
        })
    }

    fn describe(&self) -> String {
        match self.bound {
            Bound::Greater => format!("<Any Number Greater Than {}>", self.limit),
            Bound::Less => format!("<Any Number Less Than {}>", self.limit),
        }
    }
}

/// Number within inclusive limits.
#[derive(Debug)]
struct NumberRange {
    min: f64,
    max: f64,
}

impl NumberRange {
    fn build(args: &[Value], kwargs: &Map<String, Value>) -> Result<Box<dyn Matcher>> {
        let params = Params::bind(
            Owner::Matcher,
            "AnyNumberInRange",
            args,
            kwargs,
            &["min_number", "max_number"],
        )?;
        let min = params
            .number(0)?
            .ok_or_else(|| params.error("missing required argument \"min_number\""))?;
        let max = params
            .number(1)?
            .ok_or_else(|| params.error("missing required argument \"max_number\""))?;
        if min > max {
            return Err(params.error(format!(
                "invalid range limits, \"min_number\" must not exceed \"max_number\" \
                 but {min} > {max}"
            )));
        }
        Ok(Box::new(Self { min, max }))
    }
}

impl Matcher for NumberRange {
    fn name(&self) -> &'static str {
        "AnyNumberInRange"
    }

    fn matches(&self, actual: &Value) -> bool {
        actual.as_f64().is_some_and(|n| self.min <= n && n <= self.max)
    }

    fn describe(&self) -> String {
        format!("<Any Number In Range from {} to {}>", self.min, self.max)
    }

    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        if self.matches(actual) {
            return None;
        }
        Some(match actual.as_f64() {
            Some(n) if n > self.max => format!("{n} is greater than {} (right limit)", self.max),
            Some(n) => format!("{n} is less than {} (left limit)", self.min),
            None => format!("{} is not a number", shorten(actual)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeRule {
    Exactly,
    LongerThan,
    ShorterThan,
}

impl SizeRule {
    fn name(&self) -> &'static str {
        match self {
            SizeRule::Exactly => "AnyListOf",
            SizeRule::LongerThan => "AnyListLongerThan",
            SizeRule::ShorterThan => "AnyListShorterThan",
        }
    }

    fn holds(&self, len: usize, size: usize) -> bool {
        match self {
            SizeRule::Exactly => len == size,
            SizeRule::LongerThan => len > size,
            SizeRule::ShorterThan => len < size,
        }
    }
}

fn items_have_type(items: &[Value], item_type: Option<JsonType>) -> bool {
    item_type.is_none_or(|expected| items.iter().all(|item| JsonType::of(item) == expected))
}

fn type_desc(item_type: Option<JsonType>) -> String {
    item_type
        .map(|t| format!(" of type \"{}\"", t.as_str()))
        .unwrap_or_default()
}

/// List with a size rule and an optional element type. The element type is
/// given as an example value.
#[derive(Debug)]
struct ListOf {
    rule: SizeRule,
    size: Option<usize>,
    item_type: Option<JsonType>,
}

impl ListOf {
    fn build(
        args: &[Value],
        kwargs: &Map<String, Value>,
        rule: SizeRule,
    ) -> Result<Box<dyn Matcher>> {
        let params = Params::bind(
            Owner::Matcher,
            rule.name(),
            args,
            kwargs,
            &["size", "item_type"],
        )?;
        let size = params.size(0)?;
        if size.is_none() && rule != SizeRule::Exactly {
            return Err(params.error("missing required argument \"size\""));
        }
        Ok(Box::new(Self {
            rule,
            size,
            item_type: params.get(1).map(JsonType::of),
        }))
    }
}

impl Matcher for ListOf {
    fn name(&self) -> &'static str {
        self.rule.name()
    }

    fn matches(&self, actual: &Value) -> bool {
        let Some(items) = actual.as_array() else {
            return false;
        };
        let size_ok = self.size.is_none_or(|size| self.rule.holds(items.len(), size));
        size_ok && items_have_type(items, self.item_type)
    }

    fn describe(&self) -> String {
        let label = match self.rule {
            SizeRule::Exactly => "Any List Of",
            SizeRule::LongerThan => "Any List Longer Than",
            SizeRule::ShorterThan => "Any List Shorter Than",
        };
        let size = self
            .size
            .map(|size| format!(" {size} item(s)"))
            .unwrap_or_default();
        format!("<{label}{size}{}>", type_desc(self.item_type))
    }
}

/// List whose length lies within inclusive limits.
#[derive(Debug)]
struct ListOfRange {
    min_size: usize,
    max_size: usize,
    item_type: Option<JsonType>,
}

impl ListOfRange {
    fn build(args: &[Value], kwargs: &Map<String, Value>) -> Result<Box<dyn Matcher>> {
        let params = Params::bind(
            Owner::Matcher,
            "AnyListOfRange",
            args,
            kwargs,
            &["min_size", "max_size", "item_type"],
        )?;
        let min_size = params
            .size(0)?
            .ok_or_else(|| params.error("missing required argument \"min_size\""))?;
        let max_size = params
            .size(1)?
            .ok_or_else(|| params.error("missing required argument \"max_size\""))?;
        if min_size >= max_size {
            return Err(params.error(format!(
                "invalid range limits, \"min_size\" must be less than \"max_size\" \
                 but {min_size} >= {max_size}"
            )));
        }
        Ok(Box::new(Self {
            min_size,
            max_size,
            item_type: params.get(2).map(JsonType::of),
        }))
    }
}

impl Matcher for ListOfRange {
    fn name(&self) -> &'static str {
        "AnyListOfRange"
    }

    fn matches(&self, actual: &Value) -> bool {
        actual.as_array().is_some_and(|items| {
            (self.min_size..=self.max_size).contains(&items.len())
                && items_have_type(items, self.item_type)
        })
    }

    fn describe(&self) -> String {
        format!(
            "<Any List Of Range of {} to {} items{}>",
            self.min_size,
            self.max_size,
            type_desc(self.item_type)
        )
    }
}

/// List whose elements all match one expected value. The expected value may
/// be a matcher descriptor or a structure containing descriptors.
#[derive(Debug)]
struct ListOfMatchers {
    rule: SizeRule,
    size: Option<usize>,
    element: Expected,
}

impl ListOfMatchers {
    fn name_for(rule: SizeRule) -> &'static str {
        match rule {
            SizeRule::Exactly => "AnyListOfMatchers",
            SizeRule::LongerThan => "AnyListOfMatchersLongerThan",
            SizeRule::ShorterThan => "AnyListOfMatchersShorterThan",
        }
    }

    fn build(
        registry: &MatcherRegistry,
        args: &[Value],
        kwargs: &Map<String, Value>,
        rule: SizeRule,
    ) -> Result<Box<dyn Matcher>> {
        let name = Self::name_for(rule);
        let params = Params::bind(Owner::Matcher, name, args, kwargs, &["matcher", "size"])?;
        let element = Expected::build(params.require(0)?, registry)?;
        let size = params.size(1)?;
        if size.is_none() && rule != SizeRule::Exactly {
            return Err(params.error("missing required argument \"size\""));
        }
        Ok(Box::new(Self {
            rule,
            size,
            element,
        }))
    }

    fn size_desc(&self) -> String {
        match (self.rule, self.size) {
            (_, None) => "any number of".to_string(),
            (SizeRule::Exactly, Some(size)) => size.to_string(),
            (SizeRule::LongerThan, Some(size)) => format!("more than {size}"),
            (SizeRule::ShorterThan, Some(size)) => format!("fewer than {size}"),
        }
    }
}

impl Matcher for ListOfMatchers {
    fn name(&self) -> &'static str {
        Self::name_for(self.rule)
    }

    fn matches(&self, actual: &Value) -> bool {
        let Some(items) = actual.as_array() else {
            return false;
        };
        let size_ok = self.size.is_none_or(|size| self.rule.holds(items.len(), size));
        size_ok && items.iter().all(|item| self.element.matches(item))
    }

    fn describe(&self) -> String {
        format!(
            "<Any List Of Matchers ({}) of {} item(s)>",
            self.element.describe(),
            self.size_desc()
        )
    }

    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        let Some(items) = actual.as_array() else {
            return Some(format!(
                "type {} doesn't match expected list",
                JsonType::of(actual).as_str()
            ));
        };

        let mut lines = Vec::new();
        if self.size.is_some_and(|size| !self.rule.holds(items.len(), size)) {
            lines.push(format!(
                "size {} doesn't match expected {} item(s)",
                items.len(),
                self.size_desc()
            ));
        }
        let mismatches: Vec<String> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                self.element
                    .explain_mismatch(item)
                    .map(|reason| format!("  {idx}) {}: {reason}", shorten(item)))
            })
            .collect();
        if !mismatches.is_empty() {
            lines.push(format!(
                "elements that don't match {}:",
                self.element.describe()
            ));
            lines.extend(mismatches);
        }

        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}
