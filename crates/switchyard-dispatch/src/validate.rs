//! Route-scoped validators.

use async_trait::async_trait;

use crate::context::RequestContext;

/// A check over the whole request, run after typecasting and middleware.
///
/// Returning `Err(message)` aborts the pipeline with
/// [`DispatchError::ValidationFailed`](crate::DispatchError::ValidationFailed).
/// Plain closures implement this trait; implement it directly for checks
/// that need to suspend.
#[async_trait]
pub trait Validate: Send + Sync {
    async fn validate(&self, ctx: &RequestContext) -> Result<(), String>;
}

#[async_trait]
impl<F> Validate for F
where
    F: Fn(&RequestContext) -> Result<(), String> + Send + Sync,
{
    async fn validate(&self, ctx: &RequestContext) -> Result<(), String> {
        self(ctx)
    }
}
