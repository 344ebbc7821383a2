//! Definition-time route decorators.
//!
//! A mixin is a function from [`Route`] to [`Route`] that adds shared
//! behavior (authentication middleware, a default formatter, common param
//! types) to every route built through a [`Mixins`] list. Decorators run in
//! registration order, once, when the route is defined.

use std::fmt;
use std::sync::Arc;

use crate::error::RouteError;
use crate::route::{Route, RouteOptions};

type Decorator = Arc<dyn Fn(Route) -> Route + Send + Sync>;

/// Ordered list of route decorators.
#[derive(Clone, Default)]
pub struct Mixins {
    decorators: Vec<Decorator>,
}

impl Mixins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`push`](Self::push).
    pub fn with<F>(mut self, decorator: F) -> Self
    where
        F: Fn(Route) -> Route + Send + Sync + 'static,
    {
        self.push(decorator);
        self
    }

    pub fn push<F>(&mut self, decorator: F)
    where
        F: Fn(Route) -> Route + Send + Sync + 'static,
    {
        self.decorators.push(Arc::new(decorator));
    }

    /// Applies every decorator to `route`, in order.
    pub fn apply(&self, route: Route) -> Route {
        self.decorators.iter().fold(route, |route, decorate| decorate(route))
    }

    /// Compiles a route and decorates it.
    pub fn define(&self, options: RouteOptions) -> Result<Route, RouteError> {
        Route::new(options).map(|route| self.apply(route))
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }
}

impl fmt::Debug for Mixins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixins")
            .field("decorators", &self.decorators.len())
            .finish()
    }
}
