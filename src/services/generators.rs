//! Named value generators used by `!gen` directives.

use crate::services::params::{Owner, Params};
use crate::{Error, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Generator callable: positional args and keyword args to a value.
pub type GeneratorFn = Box<dyn Fn(&[Value], &Map<String, Value>) -> Result<Value> + Send + Sync>;

const MALE_NAMES: &[&str] = &[
    "James", "John", "Alex", "Keanu", "Michel", "Aaron", "Richard", "Ricardo",
];
const FEMALE_NAMES: &[&str] = &[
    "Karen", "Kate", "Maria", "Marry", "Lucia", "Tiffany", "Aki", "Noelle",
];
const LAST_NAMES: &[&str] = &[
    "Harris",
    "Robinson",
    "Walker",
    "Reaves",
    "Smith",
    "Levi",
    "Yamamoto",
    "Brodski",
    "Danielopoulos",
    "McNuggets",
    "Lopez",
    "Hernandez",
];

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Name → generator registry.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, GeneratorFn>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl GeneratorRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Registry preloaded with every built-in generator.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, GeneratorFn); 7] = [
            ("FirstName", Box::new(first_name)),
            ("LastName", Box::new(last_name)),
            ("Number", Box::new(number)),
            ("Uuid", Box::new(uuid_v4)),
            ("Text", Box::new(text)),
            ("Choice", Box::new(choice)),
            ("Bool", Box::new(boolean)),
        ];
        for (name, generator) in builtins {
            registry.generators.insert(name.to_string(), generator);
        }
        registry
    }

    /// Register a generator; names must be unique.
    pub fn register<F>(&mut self, name: impl Into<String>, generator: F) -> Result<()>
    where
        F: Fn(&[Value], &Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.generators.contains_key(&name) {
            return Err(Error::Generator {
                name,
                reason: "already registered".to_string(),
            });
        }
        self.generators.insert(name, Box::new(generator));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }

    /// Produce a fresh value from the named generator.
    pub fn generate(
        &self,
        name: &str,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Value> {
        let generator = self.generators.get(name).ok_or_else(|| Error::Generator {
            name: name.to_string(),
            reason: "not registered".to_string(),
        })?;
        generator(args, kwargs)
    }
}

fn pick<'a>(params: &Params<'_>, items: &'a [&'a str]) -> Result<&'a str> {
    items
        .choose(&mut rand::thread_rng())
        .copied()
        .ok_or_else(|| params.error("nothing to choose from"))
}

fn first_name(args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
    let params = Params::bind(Owner::Generator, "FirstName", args, kwargs, &["gender"])?;
    let gender = params.str(0)?.unwrap_or("male");
    let names = if gender.trim().eq_ignore_ascii_case("male") {
        MALE_NAMES
    } else {
        FEMALE_NAMES
    };
    Ok(Value::from(pick(&params, names)?))
}

fn last_name(args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
    let params = Params::bind(Owner::Generator, "LastName", args, kwargs, &[])?;
    Ok(Value::from(pick(&params, LAST_NAMES)?))
}

fn number(args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
    let params = Params::bind(Owner::Generator, "Number", args, kwargs, &["min", "max"])?;
    let min = params.integer(0)?.unwrap_or(0);
    let max = params.integer(1)?.unwrap_or(100);
    if min > max {
        return Err(params.error(format!("min ({min}) is greater than max ({max})")));
    }
    Ok(json!(rand::thread_rng().gen_range(min..=max)))
}

fn uuid_v4(args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
    Params::bind(Owner::Generator, "Uuid", args, kwargs, &[])?;
    Ok(Value::from(uuid::Uuid::new_v4().to_string()))
}

fn text(args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
    let params = Params::bind(Owner::Generator, "Text", args, kwargs, &["length", "prefix"])?;
    let length = params.size(0)?.unwrap_or(8);
    let prefix = params.str(1)?.unwrap_or_default();

    let mut rng = rand::thread_rng();
    let body: String = (0..length)
        .map(|_| char::from(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())]))
        .collect();
    Ok(Value::from(format!("{prefix}{body}")))
}

fn choice(args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
    let params = Params::bind(Owner::Generator, "Choice", args, kwargs, &["options"])?;
    match params.require(0)? {
        Value::Array(options) if !options.is_empty() => options
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| params.error("nothing to choose from")),
        other => Err(params.error(format!("\"options\" must be a non-empty list, got {other}"))),
    }
}

fn boolean(args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
    Params::bind(Owner::Generator, "Bool", args, kwargs, &[])?;
    Ok(Value::Bool(rand::thread_rng().gen_bool(0.5)))
}
