//! `!gen` and `!match` handlers backed by the shared registries.

use super::handler::{
    CompositionContext, CompositionHandler, CompositionStatus, directive_option, is_option_key,
    string_payload,
};
use crate::services::generators::GeneratorRegistry;
use crate::services::matchers::{MatcherDescriptor, MatcherRegistry};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const GENERATOR_MARKER: &str = "!gen";
pub const MATCHER_MARKER: &str = "!match";

/// Positional `$args` of a directive; absent means none.
fn positional_args<'a>(directive: &'a Map<String, Value>, owner: &str) -> Result<&'a [Value]> {
    match directive_option(directive, "args") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::InvalidInput(format!(
            "\"$args\" of {owner} expects a list, got {other}"
        ))),
    }
}

/// Every key that is neither the marker nor one of the reserved options.
fn keyword_args(
    directive: &Map<String, Value>,
    marker: &str,
    reserved: &[&str],
) -> Map<String, Value> {
    directive
        .iter()
        .filter(|(key, _)| key.as_str() != marker && !is_option_key(key, reserved))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// `{"!gen": "Name", "$args": [...], "$id": "user", ...kwargs}`: generated
/// value. Directives sharing name and `$id` get the identical value until the
/// cache is invalidated.
#[derive(Debug)]
pub struct GeneratorHandler {
    registry: Arc<GeneratorRegistry>,
    correlated: HashMap<String, Value>,
}

impl GeneratorHandler {
    #[must_use]
    pub fn new(registry: Arc<GeneratorRegistry>) -> Self {
        Self {
            registry,
            correlated: HashMap::new(),
        }
    }

    fn correlation_key(name: &str, id: &Value) -> Result<String> {
        match id {
            Value::String(id) => Ok(format!("{name}.{id}")),
            Value::Number(id) => Ok(format!("{name}.{id}")),
            other => Err(Error::InvalidInput(format!(
                "\"$id\" expects a string or number, got {other}"
            ))),
        }
    }
}

impl CompositionHandler for GeneratorHandler {
    fn name(&self) -> &'static str {
        "Generator"
    }

    fn marker(&self) -> &'static str {
        GENERATOR_MARKER
    }

    fn compose(
        &mut self,
        directive: &Map<String, Value>,
        _ctx: &CompositionContext<'_>,
    ) -> Result<(CompositionStatus, Value)> {
        let name = string_payload(directive, GENERATOR_MARKER)?;
        let args = positional_args(directive, GENERATOR_MARKER)?;
        let kwargs = keyword_args(directive, GENERATOR_MARKER, &["args", "id"]);

        let key = directive_option(directive, "id")
            .map(|id| Self::correlation_key(name, id))
            .transpose()?;

        if let Some(cached) = key.as_ref().and_then(|key| self.correlated.get(key)) {
            log::trace!("Reusing correlated value for {name}");
            return Ok((CompositionStatus::Success, cached.clone()));
        }

        let value = self.registry.generate(name, args, &kwargs)?;
        if let Some(key) = key {
            self.correlated.insert(key, value.clone());
        }
        Ok((CompositionStatus::Success, value))
    }

    fn invalidate_cache(&mut self) {
        self.correlated.clear();
    }
}

/// `{"!match": "Name", "$args": [...], ...kwargs}`: validated matcher
/// descriptor.
#[derive(Debug)]
pub struct MatcherHandler {
    registry: Arc<MatcherRegistry>,
}

impl MatcherHandler {
    #[must_use]
    pub fn new(registry: Arc<MatcherRegistry>) -> Self {
        Self { registry }
    }
}

impl CompositionHandler for MatcherHandler {
    fn name(&self) -> &'static str {
        "Matcher"
    }

    fn marker(&self) -> &'static str {
        MATCHER_MARKER
    }

    fn compose(
        &mut self,
        directive: &Map<String, Value>,
        _ctx: &CompositionContext<'_>,
    ) -> Result<(CompositionStatus, Value)> {
        let name = string_payload(directive, MATCHER_MARKER)?;
        let args = positional_args(directive, MATCHER_MARKER)?;
        let kwargs = keyword_args(directive, MATCHER_MARKER, &["args"]);

        let matcher = self.registry.construct(name, args, &kwargs)?;
        log::trace!("Built matcher {}", matcher.describe());

        let descriptor = MatcherDescriptor {
            name: name.to_string(),
            args: args.to_vec(),
            kwargs,
        };
        Ok((CompositionStatus::Success, descriptor.to_value()?))
    }
}
