//! Request routing and dispatch.
//!
//! `switchyard` re-exports the two core crates and ships the `switchyard`
//! command-line tool:
//!
//! - [`pattern`] (`switchyard-pattern`): path template compiler and matcher
//! - the dispatch types (`switchyard-dispatch`): request context,
//!   typecasting, action tables, step pipelines, route tables and manifests
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use switchyard::{ParamSpec, RequestContext, Route, RouteTable, Step};
//!
//! let table: RouteTable = vec![
//!     Route::define("posts.index", "/posts")?,
//!     Route::define("posts.show", "/posts/:id")?
//!         .param("id", ParamSpec::integer())
//!         .action(Step::sync(|ctx| {
//!             ctx.params.insert("found", true);
//!             Ok(())
//!         })),
//! ]
//! .into_iter()
//! .collect();
//!
//! let mut ctx = RequestContext::new("/posts/3/");
//! block_on(table.dispatch(&mut ctx, |err| assert!(err.is_none())))?;
//!
//! assert_eq!(ctx.route.as_deref(), Some("posts.show"));
//! assert_eq!(ctx.params.get_bool("found"), Some(true));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;

pub use switchyard_dispatch::*;
pub use switchyard_pattern::{
    compile, decode_segment, strip_query, CaptureDescriptor, CompileOptions, CompiledPattern,
    ParamSink, PathParams, PatternError,
};
