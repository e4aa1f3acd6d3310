//! Argument binding shared by generators and matchers.
//!
//! Directives pass positional `$args` plus keyword arguments. Each factory
//! declares its parameter names once; a value is looked up by position
//! first and then by name.

use crate::{Error, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Generator,
    Matcher,
}

pub(crate) struct Params<'a> {
    owner: Owner,
    name: &'a str,
    args: &'a [Value],
    kwargs: &'a Map<String, Value>,
    accepted: &'static [&'static str],
}

impl<'a> Params<'a> {
    /// Bind arguments, rejecting extra positionals, unknown keywords and
    /// parameters given both ways.
    pub(crate) fn bind(
        owner: Owner,
        name: &'a str,
        args: &'a [Value],
        kwargs: &'a Map<String, Value>,
        accepted: &'static [&'static str],
    ) -> Result<Self> {
        let params = Self {
            owner,
            name,
            args,
            kwargs,
            accepted,
        };

        if args.len() > accepted.len() {
            return Err(params.error(format!(
                "takes at most {} positional argument(s), {} given",
                accepted.len(),
                args.len()
            )));
        }
        for key in kwargs.keys() {
            let Some(position) = accepted.iter().position(|name| name == key) else {
                return Err(params.error(format!("unexpected keyword argument \"{key}\"")));
            };
            if position < args.len() {
                return Err(params.error(format!("got multiple values for argument \"{key}\"")));
            }
        }

        Ok(params)
    }

    pub(crate) fn error(&self, reason: impl Into<String>) -> Error {
        match self.owner {
            Owner::Generator => Error::Generator {
                name: self.name.to_string(),
                reason: reason.into(),
            },
            Owner::Matcher => Error::Matcher {
                name: self.name.to_string(),
                reason: reason.into(),
            },
        }
    }

    /// Raw value of the parameter at `position`, treating `null` as absent.
    pub(crate) fn get(&self, position: usize) -> Option<&'a Value> {
        let value = self.args.get(position).or_else(|| {
            self.accepted
                .get(position)
                .and_then(|name| self.kwargs.get(*name))
        })?;
        (!value.is_null()).then_some(value)
    }

    fn label(&self, position: usize) -> &'static str {
        self.accepted.get(position).copied().unwrap_or("?")
    }

    pub(crate) fn require(&self, position: usize) -> Result<&'a Value> {
        self.get(position).ok_or_else(|| {
            self.error(format!("missing required argument \"{}\"", self.label(position)))
        })
    }

    pub(crate) fn str(&self, position: usize) -> Result<Option<&'a str>> {
        match self.get(position) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.type_error(position, "a string", other)),
        }
    }

    pub(crate) fn bool(&self, position: usize) -> Result<Option<bool>> {
        match self.get(position) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(other) => Err(self.type_error(position, "a boolean", other)),
        }
    }

    pub(crate) fn number(&self, position: usize) -> Result<Option<f64>> {
        match self.get(position) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.type_error(position, "a number", &Value::Number(n.clone()))),
            Some(other) => Err(self.type_error(position, "a number", other)),
        }
    }

    pub(crate) fn integer(&self, position: usize) -> Result<Option<i64>> {
        match self.get(position) {
            None => Ok(None),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.error(format!("\"{}\" is out of range", self.label(position)))),
            Some(other) => Err(self.type_error(position, "an integer", other)),
        }
    }

    pub(crate) fn size(&self, position: usize) -> Result<Option<usize>> {
        match self.integer(position)? {
            None => Ok(None),
            Some(n) => usize::try_from(n).map(Some).map_err(|_| {
                self.error(format!("\"{}\" must not be negative", self.label(position)))
            }),
        }
    }

    fn type_error(&self, position: usize, expected: &str, got: &Value) -> Error {
        self.error(format!(
            "\"{}\" must be {expected}, got {got}",
            self.label(position)
        ))
    }
}
