//! Route dispatch pipeline.
//!
//! `switchyard-dispatch` takes a compiled path pattern from
//! `switchyard-pattern` and builds everything around it: a per-request
//! [`RequestContext`], parameter typecasting, per-event action tables, and
//! an ordered, cancelable step pipeline.
//!
//! # Quick Start
//!
//! ```rust
//! use futures::executor::block_on;
//! use switchyard_dispatch::{ParamSpec, RequestContext, Route, RouteTable, Step};
//!
//! let mut table = RouteTable::new();
//! table.register(
//!     Route::define("users.show", "/:username")?
//!         .param("page", ParamSpec::integer())
//!         .use_fn(|ctx| {
//!             ctx.params.insert("viewer", "guest");
//!             Ok(())
//!         })
//!         .action(Step::sync(|ctx| {
//!             let name = ctx.params.get_str("username").unwrap_or_default().to_string();
//!             ctx.params.insert("greeting", format!("hello, {}", name));
//!             Ok(())
//!         })),
//! );
//!
//! let mut ctx = RequestContext::new("/alice?tab=posts").with_param("page", "2");
//! let outcome = block_on(table.dispatch(&mut ctx, |err| assert!(err.is_none())))?;
//!
//! assert!(outcome.is_handled());
//! assert_eq!(ctx.params.get_i64("page"), Some(2));
//! assert_eq!(ctx.params.get_str("greeting"), Some("hello, alice"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Pipeline Order
//!
//! For a matched route and the selected event:
//!
//! 1. typecast declared parameters
//! 2. middleware, in registration order
//! 3. route validators
//! 4. the event's before steps, handler, after steps
//! 5. the negotiated formatter, if any
//!
//! Steps stop the pipeline by failing the context, cancelling it, or handing
//! an error to their continuation. The final continuation is called exactly
//! once with the reason. A step that returns `Err` is an [`UnhandledThrow`]:
//! it escapes the dispatch call and the continuation is never called.

mod actions;
mod context;
mod error;
mod extensions;
mod manifest;
mod mixin;
mod negotiate;
mod params;
mod pipeline;
mod route;
mod step;
mod table;
mod validate;

pub use actions::{ActionSet, ActionTable, Phase, CONNECT, DISCONNECT, ENTER, EXIT, REQUEST};
pub use context::{Params, RequestContext};
pub use error::{BoxError, DispatchError, RouteError, UnhandledThrow};
pub use extensions::Extensions;
pub use manifest::{ManifestError, ParamConfig, RouteEntry, RouteManifest};
pub use mixin::Mixins;
pub use negotiate::{Formats, Negotiation, WILDCARD};
pub use params::{typecast, ParamCaster, ParamSpec, ParamSpecs, ParamType, ParamValidator};
pub use pipeline::{Pipeline, Stage};
pub use route::{Dispatch, Outcome, Route, RouteOptions, DEFAULT_METHOD};
pub use step::{Flow, Next, Step};
pub use table::RouteTable;
pub use validate::Validate;

// Re-export the pattern crate so users need a single dependency.
pub use switchyard_pattern as pattern;
