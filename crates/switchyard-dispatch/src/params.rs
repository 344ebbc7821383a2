//! Parameter typecasting.
//!
//! A route declares a [`ParamSpec`] per parameter name. After a successful
//! match, [`typecast`] converts the raw captures present in the context to
//! their declared types and runs each parameter's validators over the result.
//! Declared parameters that are absent from the context are skipped.
//!
//! Casting is idempotent: a value that already has the target type is left
//! as is, and a value of some other non-string type is rejected rather than
//! coerced.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::trace;

use crate::context::RequestContext;
use crate::error::DispatchError;

/// Built-in parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    /// Parses the raw text as a JSON document.
    Json,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
            ParamType::Json => "json",
        }
    }

    /// Converts `value` to this type.
    ///
    /// The error is a human-readable reason; [`typecast`] wraps it in
    /// [`DispatchError::ParamCast`].
    pub fn cast(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (ParamType::String, Value::String(_)) => Ok(value.clone()),

            (ParamType::Integer, Value::String(raw)) => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            (ParamType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(value.clone())
            }
            (ParamType::Integer, Value::Number(_)) => Err("not a whole number".to_string()),

            (ParamType::Float, Value::String(raw)) => {
                let parsed = raw.parse::<f64>().map_err(|e| e.to_string())?;
                finite(parsed)
            }
            (ParamType::Float, Value::Number(n)) => match n.as_f64() {
                Some(f) => finite(f),
                None => Err("not representable as a float".to_string()),
            },

            (ParamType::Boolean, Value::String(raw)) => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| "expected one of true/false/1/0/yes/no/on/off".to_string()),
            (ParamType::Boolean, Value::Bool(_)) => Ok(value.clone()),

            (ParamType::Json, Value::String(raw)) => {
                serde_json::from_str(raw).map_err(|e| e.to_string())
            }
            (ParamType::Json, _) => Ok(value.clone()),

            (_, other) => Err(format!("unexpected {} value", kind_of(other))),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn finite(value: f64) -> Result<Value, String> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| "not a finite number".to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text used for the `raw` field of a cast error.
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An application-defined parameter type.
///
/// Casters may suspend, e.g. to look a record up by id.
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use switchyard_dispatch::ParamCaster;
///
/// struct Upper;
///
/// #[async_trait]
/// impl ParamCaster for Upper {
///     fn type_name(&self) -> &str {
///         "upper"
///     }
///
///     async fn cast(&self, value: &Value) -> Result<Value, String> {
///         value
///             .as_str()
///             .map(|s| Value::String(s.to_uppercase()))
///             .ok_or_else(|| "expected a string".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait ParamCaster: Send + Sync {
    /// Name reported as the target type in cast errors.
    fn type_name(&self) -> &str;

    async fn cast(&self, value: &Value) -> Result<Value, String>;
}

/// Validator run over a parameter after it has been cast.
pub type ParamValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
enum Caster {
    Builtin(ParamType),
    Custom(Arc<dyn ParamCaster>),
}

/// Type and validators for one route parameter.
#[derive(Clone)]
pub struct ParamSpec {
    caster: Caster,
    validators: Vec<ParamValidator>,
}

impl ParamSpec {
    pub fn of(kind: ParamType) -> Self {
        Self {
            caster: Caster::Builtin(kind),
            validators: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::of(ParamType::String)
    }

    pub fn integer() -> Self {
        Self::of(ParamType::Integer)
    }

    pub fn float() -> Self {
        Self::of(ParamType::Float)
    }

    pub fn boolean() -> Self {
        Self::of(ParamType::Boolean)
    }

    pub fn json() -> Self {
        Self::of(ParamType::Json)
    }

    pub fn custom<C>(caster: C) -> Self
    where
        C: ParamCaster + 'static,
    {
        Self {
            caster: Caster::Custom(Arc::new(caster)),
            validators: Vec::new(),
        }
    }

    /// Appends a validator over the cast value.
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(f));
        self
    }

    /// Name of the target type.
    pub fn type_name(&self) -> &str {
        match &self.caster {
            Caster::Builtin(kind) => kind.name(),
            Caster::Custom(caster) => caster.type_name(),
        }
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    async fn cast(&self, name: &str, value: &Value) -> Result<Value, DispatchError> {
        let result = match &self.caster {
            Caster::Builtin(kind) => kind.cast(value),
            Caster::Custom(caster) => caster.cast(value).await,
        };

        let cast = result.map_err(|reason| DispatchError::ParamCast {
            name: name.to_string(),
            raw: raw_text(value),
            target: self.type_name().to_string(),
            reason,
        })?;

        for (index, validator) in self.validators.iter().enumerate() {
            validator(&cast).map_err(|message| DispatchError::ValidationFailed {
                validator_index: index,
                param: Some(name.to_string()),
                message,
            })?;
        }

        Ok(cast)
    }
}

impl From<ParamType> for ParamSpec {
    fn from(kind: ParamType) -> Self {
        ParamSpec::of(kind)
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("type", &self.type_name())
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Parameter specs of a route, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParamSpecs {
    specs: Vec<(String, ParamSpec)>,
}

impl ParamSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name`. A second declaration replaces the first.
    pub fn insert(&mut self, name: impl Into<String>, spec: ParamSpec) {
        let name = name.into();
        match self.specs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = spec,
            None => self.specs.push((name, spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.specs.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Casts every declared parameter present in `ctx`, in declaration order.
///
/// Stops at the first failure. Values cast before the failure stay cast.
pub async fn typecast(specs: &ParamSpecs, ctx: &mut RequestContext) -> Result<(), DispatchError> {
    for (name, spec) in specs.iter() {
        let cast = match ctx.params.get(name) {
            Some(value) => spec.cast(name, value).await?,
            None => {
                trace!(param = name, "declared parameter absent, skipping");
                continue;
            }
        };
        trace!(param = name, to = spec.type_name(), "parameter cast");
        ctx.params.insert(name, cast);
    }
    Ok(())
}
