//! Error types for route definition and dispatch.
//!
//! Dispatch distinguishes two channels:
//!
//! - [`DispatchError`]: the pipeline stopped early. Reported once through the
//!   final continuation; never returned from `handle`.
//! - [`UnhandledThrow`]: a step body returned `Err` instead of signalling
//!   through the pipeline. Returned from `handle` and the continuation is not
//!   invoked.

use std::fmt;

use switchyard_pattern::PatternError;
use thiserror::Error;

use crate::pipeline::Stage;

/// Boxed error carried by [`DispatchError::Step`] and [`UnhandledThrow`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reasons a pipeline aborts.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A parameter could not be converted to its declared type.
    #[error("cannot cast parameter '{name}' ({raw:?}) to {target}: {reason}")]
    ParamCast {
        name: String,
        raw: String,
        target: String,
        reason: String,
    },

    /// A route or parameter validator rejected the request.
    #[error("validator {validator_index} rejected {}: {message}", describe_target(.param))]
    ValidationFailed {
        validator_index: usize,
        /// Parameter the validator belongs to; `None` for route validators.
        param: Option<String>,
        message: String,
    },

    /// A step reported an error through its continuation or the context.
    #[error("step failed: {0}")]
    Step(#[source] BoxError),

    /// The context was cancelled without an error.
    #[error("dispatch cancelled")]
    Cancelled,
}

fn describe_target(param: &Option<String>) -> String {
    match param {
        Some(name) => format!("parameter '{}'", name),
        None => "the request".to_string(),
    }
}

impl DispatchError {
    /// Wraps an arbitrary error as a step failure.
    pub fn step<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        let err: anyhow::Error = err.into();
        DispatchError::Step(err.into())
    }

    /// Creates a step failure from a message.
    pub fn message(msg: impl fmt::Display) -> Self {
        DispatchError::step(anyhow::anyhow!("{}", msg))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }
}

/// A step returned `Err` from its body.
///
/// The pipeline does not recover from this: it stops, skips the final
/// continuation, and hands the error to the caller of `handle`.
#[derive(Debug, Error)]
#[error("unhandled error in {stage} step {index}: {source}")]
pub struct UnhandledThrow {
    pub stage: Stage,
    /// Position of the step within its stage.
    pub index: usize,
    #[source]
    pub source: BoxError,
}

impl UnhandledThrow {
    pub(crate) fn new(stage: Stage, index: usize, err: anyhow::Error) -> Self {
        Self {
            stage,
            index,
            source: err.into(),
        }
    }
}

/// Errors raised while defining a route.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The path template did not compile.
    #[error("invalid path for route '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: PatternError,
    },

    /// The route has no name.
    #[error("route for path '{0}' has no name")]
    MissingName(String),
}
