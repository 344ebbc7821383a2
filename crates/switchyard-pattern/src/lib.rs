//! Path template compiler and matcher.
//!
//! `switchyard-pattern` turns route templates such as `/users/:id` into
//! anchored matchers and applies them to request paths.
//!
//! # Quick Start
//!
//! ```rust
//! use switchyard_pattern::{compile, CompileOptions, PathParams};
//!
//! let pattern = compile("/posts/:id/:section?", CompileOptions::default()).unwrap();
//!
//! let mut params = PathParams::new();
//! assert!(pattern.match_into("/posts/42?ref=home", &mut params));
//! assert_eq!(params.get("id"), Some("42"));
//! assert_eq!(params.get("section"), None);
//! ```
//!
//! # Template Syntax
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `text` | Literal, matched exactly |
//! | `:name` | Named segment, one path segment |
//! | `:name?` | Optional named segment (its leading `/` is optional too) |
//! | `:name(re)` | Named segment restricted to the sub-expression `re` |
//! | `.:name` | Format segment, e.g. `/report.:format` |
//! | `*` | Positional splat, spans segments |
//!
//! Matching is case-insensitive and tolerates a trailing slash unless
//! [`CompileOptions`] says otherwise.

mod compile;
mod error;
mod matcher;
mod token;

pub use compile::{compile, CaptureDescriptor, CompileOptions, CompiledPattern};
pub use error::{PatternError, Result};
pub use matcher::{decode_segment, strip_query, ParamSink, PathParams};
