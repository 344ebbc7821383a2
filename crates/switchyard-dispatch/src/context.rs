//! Per-request dispatch state.
//!
//! A [`RequestContext`] is created by the caller for one request, handed to
//! exactly one in-flight `handle` call, and mutated by every step of the
//! pipeline. It is never shared between dispatches.
//!
//! | Field | Set by | Read by |
//! |-------|--------|---------|
//! | `path`, `method` | caller | matcher, route table |
//! | `params` | caller (defaults), matcher, typecasting | steps |
//! | `event` | caller (defaults to `"request"`) | action table |
//! | `format` | caller or steps | content negotiation |
//! | `error`, `cancelled` | steps | pipeline executor |
//! | `route` | dispatch, on match | steps |
//! | `extensions` | steps | steps |

use serde::Serialize;
use serde_json::{Map, Value};
use switchyard_pattern::ParamSink;

use crate::actions::REQUEST;
use crate::error::DispatchError;
use crate::extensions::Extensions;

/// Request parameters: named values plus ordered positional captures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Params {
    named: Map<String, Value>,
    positional: Vec<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Returns the value for `name` if it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.named.get(name).and_then(Value::as_str)
    }

    /// Returns the value for `name` if it is an integer.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.named.get(name).and_then(Value::as_i64)
    }

    /// Returns the value for `name` if it is a boolean.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.named.get(name).and_then(Value::as_bool)
    }

    /// Sets a named value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.named.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.named.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Named values, ordered by name.
    pub fn named(&self) -> &Map<String, Value> {
        &self.named
    }

    /// Positional captures in match order. Unmatched captures are `Null`.
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.named.iter()
    }

    /// Number of named values plus positional captures.
    pub fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

impl ParamSink for Params {
    fn contains_param(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    fn insert_param(&mut self, name: &str, value: String) {
        self.named.insert(name.to_string(), Value::String(value));
    }

    fn push_positional(&mut self, value: Option<String>) {
        self.positional.push(value.map(Value::String).unwrap_or(Value::Null));
    }
}

/// Mutable state for one dispatch.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// Request path, optionally with a query string.
    pub path: String,
    /// Request method. Route tables skip routes with another method when set.
    pub method: Option<String>,
    pub params: Params,
    /// Selected event. `None` means the route's default event.
    pub event: Option<String>,
    /// Requested response format, used by content negotiation.
    pub format: Option<String>,
    /// Error left by a step. Checked at every step boundary.
    pub error: Option<DispatchError>,
    /// Cooperative cancellation flag. Checked at every step boundary.
    pub cancelled: bool,
    /// Name of the matched route.
    pub route: Option<String>,
    pub extensions: Extensions,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Pre-populates a parameter. Path captures never overwrite it.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// The selected event, falling back to `"request"`.
    pub fn event(&self) -> &str {
        self.event.as_deref().unwrap_or(REQUEST)
    }

    /// Records a step failure. The pipeline stops at the next boundary.
    pub fn fail<E>(&mut self, err: E)
    where
        E: Into<anyhow::Error>,
    {
        self.error = Some(DispatchError::step(err));
    }

    /// Requests cancellation. The pipeline stops at the next boundary.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Returns true if an error is pending or the context was cancelled.
    pub fn is_aborted(&self) -> bool {
        self.error.is_some() || self.cancelled
    }

    pub fn take_error(&mut self) -> Option<DispatchError> {
        self.error.take()
    }

    /// Consumes the pending abort reason, if any.
    ///
    /// A pending error wins over cancellation.
    pub(crate) fn take_abort(&mut self) -> Option<DispatchError> {
        match self.error.take() {
            Some(err) => Some(err),
            None if self.cancelled => Some(DispatchError::Cancelled),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_sink_preserves_existing() {
        let mut params = Params::new();
        params.insert("id", 5);
        assert!(params.contains_param("id"));
        assert!(!params.contains_param("name"));

        params.insert_param("name", "bob".into());
        assert_eq!(params.get_str("name"), Some("bob"));
        assert_eq!(params.get_i64("id"), Some(5));
    }

    #[test]
    fn test_params_positional_null_for_missing() {
        let mut params = Params::new();
        params.push_positional(Some("a".into()));
        params.push_positional(None);
        assert_eq!(params.positional(), &[json!("a"), Value::Null]);
        assert_eq!(params.len(), 2);
        assert!(!params.is_empty());
    }

    #[test]
    fn test_params_len_counts_named_and_positional() {
        let mut params = Params::new();
        assert_eq!(params.len(), 0);
        assert!(params.is_empty());

        params.insert("id", 1);
        params.push_positional(Some("rest".into()));
        assert_eq!(params.len(), 2);
        assert_eq!(params.named().len(), 1);

        params.remove("id");
        assert_eq!(params.len(), 1);
        assert!(!params.is_empty());
    }

    #[test]
    fn test_context_defaults() {
        let ctx = RequestContext::new("/posts");
        assert_eq!(ctx.event(), "request");
        assert!(!ctx.is_aborted());
        assert!(ctx.route.is_none());
    }

    #[test]
    fn test_context_builders() {
        let ctx = RequestContext::new("/posts")
            .with_method("POST")
            .with_event("enter")
            .with_format("json")
            .with_param("page", "2");
        assert_eq!(ctx.method.as_deref(), Some("POST"));
        assert_eq!(ctx.event(), "enter");
        assert_eq!(ctx.format.as_deref(), Some("json"));
        assert_eq!(ctx.params.get_str("page"), Some("2"));
    }

    #[test]
    fn test_fail_and_take_abort() {
        let mut ctx = RequestContext::new("/");
        ctx.fail(anyhow::anyhow!("nope"));
        assert!(ctx.is_aborted());
        let err = ctx.take_abort().unwrap();
        assert_eq!(err.to_string(), "step failed: nope");
        assert!(!ctx.is_aborted());
    }

    #[test]
    fn test_cancel_yields_cancelled() {
        let mut ctx = RequestContext::new("/");
        ctx.cancel();
        assert!(ctx.is_aborted());
        assert!(ctx.take_abort().unwrap().is_cancelled());
    }

    #[test]
    fn test_error_wins_over_cancel() {
        let mut ctx = RequestContext::new("/");
        ctx.cancel();
        ctx.fail(anyhow::anyhow!("first"));
        assert!(!ctx.take_abort().unwrap().is_cancelled());
    }
}
