//! Routes and per-route dispatch.
//!
//! A [`Route`] bundles a compiled path pattern with everything needed to
//! serve a matching request: parameter specs, middleware, validators, an
//! action table and formatters. Routes are built once with the consuming
//! builder methods below and are read-only afterwards, so one route can
//! serve any number of concurrent dispatches.
//!
//! # Dispatch
//!
//! [`Route::handle`] walks the states
//!
//! ```text
//! UNMATCHED → MATCHED → TYPECASTING → RUNNING(i) → RUNNING(i+1) | ABORTED | COMPLETED
//! ```
//!
//! and calls its continuation exactly once, unless a step returns `Err`, in
//! which case the error escapes as [`UnhandledThrow`] and the continuation
//! is dropped uncalled.
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use switchyard_dispatch::{ParamSpec, RequestContext, Route, Step};
//!
//! let route = Route::define("posts.show", "/posts/:id")?
//!     .param("id", ParamSpec::integer())
//!     .action(Step::sync(|ctx| {
//!         let id = ctx.params.get_i64("id").unwrap_or_default();
//!         ctx.params.insert("title", format!("post #{}", id));
//!         Ok(())
//!     }));
//!
//! let mut ctx = RequestContext::new("/posts/7");
//! let outcome = block_on(route.handle(&mut ctx, |err| assert!(err.is_none())))?;
//!
//! assert!(outcome.is_handled());
//! assert_eq!(ctx.params.get_str("title"), Some("post #7"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use switchyard_pattern::{CompileOptions, CompiledPattern};
use tracing::{debug, debug_span, trace, Instrument};

use crate::actions::{ActionTable, Phase, REQUEST};
use crate::context::RequestContext;
use crate::error::{DispatchError, RouteError, UnhandledThrow};
use crate::negotiate::{Formats, Negotiation, WILDCARD};
use crate::params::{typecast, ParamSpec, ParamSpecs};
use crate::pipeline::{Pipeline, Stage};
use crate::step::Step;
use crate::validate::Validate;

pub const DEFAULT_METHOD: &str = "GET";

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

/// Definition-time settings of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOptions {
    pub name: String,
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub strict: bool,
}

impl RouteOptions {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method: default_method(),
            sensitive: false,
            strict: false,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::new()
            .sensitive(self.sensitive)
            .strict(self.strict)
    }
}

/// Result of [`Route::run`].
#[derive(Debug)]
pub enum Outcome {
    /// The path did not match. Nothing ran.
    Unmatched,
    /// Every step ran.
    Completed,
    /// The pipeline stopped early.
    Aborted(DispatchError),
}

impl Outcome {
    /// True if the route matched, whether or not the pipeline completed.
    pub fn is_handled(&self) -> bool {
        !matches!(self, Outcome::Unmatched)
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            Outcome::Aborted(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_error(self) -> Option<DispatchError> {
        match self {
            Outcome::Aborted(err) => Some(err),
            _ => None,
        }
    }

    pub fn kind(&self) -> Dispatch {
        match self {
            Outcome::Unmatched => Dispatch::Unmatched,
            Outcome::Completed => Dispatch::Completed,
            Outcome::Aborted(_) => Dispatch::Aborted,
        }
    }
}

/// What [`Route::handle`] did. The error, if any, went to the continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    Unmatched,
    Completed,
    Aborted,
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        *self != Dispatch::Unmatched
    }
}

/// A named, compiled route with its processing pipeline.
#[derive(Clone)]
pub struct Route {
    name: String,
    method: String,
    pattern: CompiledPattern,
    params: ParamSpecs,
    actions: ActionTable,
    middleware: Vec<Step>,
    validators: Vec<Arc<dyn Validate>>,
    accepts: Vec<String>,
    formats: Formats,
    negotiation: Negotiation,
}

impl Route {
    /// Compiles a route from its options.
    pub fn new(options: RouteOptions) -> Result<Self, RouteError> {
        if options.name.is_empty() {
            return Err(RouteError::MissingName(options.path));
        }

        let pattern = CompiledPattern::new(&options.path, options.compile_options()).map_err(
            |source| RouteError::Pattern {
                name: options.name.clone(),
                source,
            },
        )?;

        debug!(
            route = %options.name,
            method = %options.method,
            path = %options.path,
            source = pattern.source(),
            "route compiled"
        );

        Ok(Self {
            name: options.name,
            method: options.method.to_ascii_uppercase(),
            pattern,
            params: ParamSpecs::new(),
            actions: ActionTable::new(),
            middleware: Vec::new(),
            validators: Vec::new(),
            accepts: Vec::new(),
            formats: Formats::new(),
            negotiation: Negotiation::default(),
        })
    }

    /// Compiles a `GET` route from a name and a path, in either order.
    ///
    /// An argument starting with `/` is taken as the path.
    pub fn define(first: &str, second: &str) -> Result<Self, RouteError> {
        let (name, path) = if first.starts_with('/') {
            (second, first)
        } else {
            (first, second)
        };
        Self::new(RouteOptions::new(name, path))
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    /// Declares the type of a path parameter.
    pub fn param(mut self, name: impl Into<String>, spec: impl Into<ParamSpec>) -> Self {
        self.params.insert(name, spec.into());
        self
    }

    /// Appends a route validator closure.
    pub fn validate<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator(f)
    }

    /// Appends a route validator.
    pub fn validator<V>(mut self, validator: V) -> Self
    where
        V: Validate + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Appends a middleware step.
    pub fn use_step(mut self, step: Step) -> Self {
        self.middleware.push(step);
        self
    }

    /// Appends a synchronous middleware step.
    pub fn use_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.use_step(Step::sync(f))
    }

    /// Appends accepted content types.
    pub fn accept<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepts.extend(types.into_iter().map(Into::into));
        self
    }

    /// Sets the handler of the `request` event.
    pub fn action(self, step: Step) -> Self {
        self.on(REQUEST, step)
    }

    /// Sets the handler of `event`.
    pub fn on(mut self, event: &str, step: Step) -> Self {
        self.actions.register(event, Phase::Handler, step);
        self
    }

    /// Appends a step that runs before the handler of `event`.
    pub fn before(mut self, event: &str, step: Step) -> Self {
        self.actions.register(event, Phase::Before, step);
        self
    }

    /// Appends a step that runs after the handler of `event`.
    pub fn after(mut self, event: &str, step: Step) -> Self {
        self.actions.register(event, Phase::After, step);
        self
    }

    /// Changes the event run when the context selects none.
    pub fn default_event(mut self, event: &str) -> Self {
        self.actions = self.actions.with_default_event(event);
        self
    }

    /// Registers a formatter for a named format.
    pub fn render(mut self, format: &str, step: Step) -> Self {
        self.formats.insert(format, step);
        self
    }

    /// Registers the formatter that accepts every format.
    pub fn render_any(self, step: Step) -> Self {
        self.render(WILDCARD, step)
    }

    pub fn negotiation(mut self, policy: Negotiation) -> Self {
        self.negotiation = policy;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        self.pattern.template()
    }

    pub fn http_method(&self) -> &str {
        &self.method
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn params(&self) -> &ParamSpecs {
        &self.params
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn middleware(&self) -> &[Step] {
        &self.middleware
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    pub fn accepts(&self) -> &[String] {
        &self.accepts
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Returns true if the context's method, when set, is this route's.
    pub fn accepts_method(&self, ctx: &RequestContext) -> bool {
        ctx.method
            .as_deref()
            .map_or(true, |m| m.eq_ignore_ascii_case(&self.method))
    }

    /// Matches the context path, merging captures into `ctx.params`.
    ///
    /// On success `ctx.route` is set to this route's name.
    pub fn matches(&self, ctx: &mut RequestContext) -> bool {
        let matched = self.pattern.match_into(&ctx.path, &mut ctx.params);
        if matched {
            ctx.route = Some(self.name.clone());
        }
        matched
    }

    /// Assembles the units for one event.
    pub fn pipeline(&self, event: Option<&str>, format: Option<&str>) -> Pipeline<'_> {
        let mut pipeline = Pipeline::new().steps(Stage::Middleware, &self.middleware);
        for validator in &self.validators {
            pipeline = pipeline.validator(validator.as_ref());
        }
        if let Some(set) = self.actions.select(event) {
            pipeline = pipeline.actions(set);
        }
        if let Some(formatter) = self.formats.resolve(self.negotiation, format, &self.accepts) {
            pipeline = pipeline.step(Stage::Formatter, formatter);
        }
        pipeline
    }

    /// Matches, typecasts and runs the pipeline.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<Outcome, UnhandledThrow> {
        let event = self.actions.resolve(ctx.event.as_deref()).to_string();
        let span = debug_span!("dispatch", route = %self.name, event = %event);
        self.run_event(ctx, event).instrument(span).await
    }

    async fn run_event(
        &self,
        ctx: &mut RequestContext,
        event: String,
    ) -> Result<Outcome, UnhandledThrow> {
        if !self.matches(ctx) {
            trace!(path = %ctx.path, "no match");
            return Ok(Outcome::Unmatched);
        }
        ctx.event = Some(event);

        if let Err(err) = typecast(&self.params, ctx).await {
            debug!(error = %err, "typecast failed");
            return Ok(Outcome::Aborted(err));
        }

        let pipeline = self.pipeline(ctx.event.as_deref(), ctx.format.as_deref());
        trace!(steps = pipeline.len(), "pipeline assembled");

        match pipeline.run(ctx).await? {
            Some(err) => Ok(Outcome::Aborted(err)),
            None => {
                debug!("dispatch completed");
                Ok(Outcome::Completed)
            }
        }
    }

    /// Dispatches `ctx` and reports the result to `done`.
    ///
    /// `done` receives `None` when the route did not match or every step
    /// ran, and the abort reason otherwise. It is not called when a step
    /// returns `Err`; that error is returned instead.
    pub async fn handle<F>(
        &self,
        ctx: &mut RequestContext,
        done: F,
    ) -> Result<Dispatch, UnhandledThrow>
    where
        F: FnOnce(Option<DispatchError>),
    {
        let outcome = self.run(ctx).await?;
        let kind = outcome.kind();
        done(outcome.into_error());
        Ok(kind)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path())
            .field("params", &self.params)
            .field("middleware", &self.middleware.len())
            .field("validators", &self.validators.len())
            .field("events", &self.actions.events())
            .field("accepts", &self.accepts)
            .finish_non_exhaustive()
    }
}
