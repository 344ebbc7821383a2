//! Pipeline steps and their calling conventions.
//!
//! Every unit of work in a route pipeline is a [`Step`]. The calling
//! convention is picked when the step is built and never inferred later:
//!
//! - [`Step::sync`]: runs its effect on the context and continues
//!   implicitly. To stop the pipeline it calls [`RequestContext::fail`] or
//!   [`RequestContext::cancel`].
//! - [`Step::continuation`]: async, and receives a [`Next`] token that it
//!   must consume to produce the [`Flow`] it returns. `Next` cannot be
//!   cloned and `Flow` has no public constructor, so a continuation step
//!   resumes the pipeline at most once.
//!
//! In both conventions, returning `Err` is not a pipeline failure: it is an
//! [`UnhandledThrow`](crate::UnhandledThrow) that escapes `handle`.
//!
//! ```rust
//! use futures::FutureExt;
//! use switchyard_dispatch::Step;
//!
//! let count = Step::sync(|ctx| {
//!     ctx.params.insert("seen", true);
//!     Ok(())
//! });
//!
//! let load = Step::continuation(|ctx, next| {
//!     async move {
//!         if ctx.params.contains("id") {
//!             Ok(next.proceed())
//!         } else {
//!             Ok(next.fail(anyhow::anyhow!("missing id")))
//!         }
//!     }
//!     .boxed()
//! });
//!
//! assert!(!count.is_continuation());
//! assert!(load.is_continuation());
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::RequestContext;
use crate::error::DispatchError;

type SyncFn = dyn Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync;

type StepFuture<'a> = BoxFuture<'a, anyhow::Result<Flow>>;

type ContinuationFn = dyn for<'a> Fn(&'a mut RequestContext, Next) -> StepFuture<'a> + Send + Sync;

/// A unit of pipeline work with an explicit calling convention.
#[derive(Clone)]
pub enum Step {
    Sync(Arc<SyncFn>),
    Continuation(Arc<ContinuationFn>),
}

impl Step {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Step::Sync(Arc::new(f))
    }

    pub fn continuation<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, anyhow::Result<Flow>>
            + Send
            + Sync
            + 'static,
    {
        Step::Continuation(Arc::new(f))
    }

    pub fn is_continuation(&self) -> bool {
        matches!(self, Step::Continuation(_))
    }

    /// Runs the step once.
    ///
    /// `Ok(Some(err))` is an error handed to the continuation. Errors left
    /// on the context are picked up by the executor, not here.
    pub(crate) async fn run(
        &self,
        ctx: &mut RequestContext,
    ) -> anyhow::Result<Option<DispatchError>> {
        match self {
            Step::Sync(f) => {
                f(ctx)?;
                Ok(None)
            }
            Step::Continuation(f) => {
                let flow = f(ctx, Next::new()).await?;
                Ok(flow.error)
            }
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Sync(_) => f.write_str("Step::Sync"),
            Step::Continuation(_) => f.write_str("Step::Continuation"),
        }
    }
}

/// The continuation handed to a [`Step::continuation`] body.
#[must_use = "a continuation step must consume `Next` to resume the pipeline"]
pub struct Next {
    _private: (),
}

impl Next {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Continue with the next step.
    pub fn proceed(self) -> Flow {
        Flow { error: None }
    }

    /// Stop the pipeline with a step error.
    pub fn fail<E>(self, err: E) -> Flow
    where
        E: Into<anyhow::Error>,
    {
        self.abort(DispatchError::step(err))
    }

    /// Stop the pipeline with a specific dispatch error.
    pub fn abort(self, err: DispatchError) -> Flow {
        Flow { error: Some(err) }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}

/// Result of consuming a [`Next`].
#[derive(Debug)]
#[must_use]
pub struct Flow {
    error: Option<DispatchError>,
}

impl Flow {
    pub fn is_abort(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;

    #[test]
    fn test_sync_step_mutates_context() {
        let step = Step::sync(|ctx| {
            ctx.params.insert("hit", 1);
            Ok(())
        });
        let mut ctx = RequestContext::new("/");

        assert!(block_on(step.run(&mut ctx)).unwrap().is_none());
        assert_eq!(ctx.params.get_i64("hit"), Some(1));
    }

    #[test]
    fn test_sync_step_err_is_returned() {
        let step = Step::sync(|_| Err(anyhow::anyhow!("thrown")));
        let mut ctx = RequestContext::new("/");

        let err = block_on(step.run(&mut ctx)).unwrap_err();
        assert_eq!(err.to_string(), "thrown");
    }

    #[test]
    fn test_continuation_proceed() {
        let step = Step::continuation(|ctx, next| {
            async move {
                ctx.format = Some("json".into());
                Ok(next.proceed())
            }
            .boxed()
        });
        let mut ctx = RequestContext::new("/");

        assert!(block_on(step.run(&mut ctx)).unwrap().is_none());
        assert_eq!(ctx.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_continuation_fail() {
        let step = Step::continuation(|_, next| {
            async move { Ok(next.fail(anyhow::anyhow!("denied"))) }.boxed()
        });
        let mut ctx = RequestContext::new("/");

        let err = block_on(step.run(&mut ctx)).unwrap().unwrap();
        assert_eq!(err.to_string(), "step failed: denied");
    }

    #[test]
    fn test_flow_is_abort() {
        assert!(!Next::new().proceed().is_abort());
        assert!(Next::new().abort(DispatchError::Cancelled).is_abort());
    }

    #[test]
    fn test_debug_names_convention() {
        let step = Step::sync(|_| Ok(()));
        assert_eq!(format!("{:?}", step), "Step::Sync");
    }
}
