//! In-memory route registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::{DispatchError, UnhandledThrow};
use crate::route::{Dispatch, Outcome, Route};

/// Routes indexed by name, kept in registration order.
///
/// Dispatching through the table tries routes in order and hands the
/// context to the first one whose method and path both match. Two routes
/// may share a path as long as their names differ, e.g. `posts.index` on
/// `GET /posts` and `posts.create` on `POST /posts`.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `route`. A route with the same name is replaced in place and
    /// returned.
    pub fn register(&mut self, route: Route) -> Option<Arc<Route>> {
        let route = Arc::new(route);
        match self.index.get(route.name()).copied() {
            Some(slot) => {
                warn!(route = route.name(), "route replaced");
                Some(std::mem::replace(&mut self.routes[slot], route))
            }
            None => {
                self.index.insert(route.name().to_string(), self.routes.len());
                self.routes.push(route);
                None
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<Route>> {
        self.index.get(name).map(|&slot| &self.routes[slot])
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the first route that accepts `ctx`.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<Outcome, UnhandledThrow> {
        for route in &self.routes {
            if !route.accepts_method(ctx) {
                continue;
            }
            match route.run(ctx).await? {
                Outcome::Unmatched => continue,
                outcome => return Ok(outcome),
            }
        }
        debug!(path = %ctx.path, method = ?ctx.method, "no route matched");
        Ok(Outcome::Unmatched)
    }

    /// Continuation form of [`run`](Self::run).
    ///
    /// `done` is called once with the abort reason, or `None` when the
    /// pipeline completed or nothing matched.
    pub async fn dispatch<F>(
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

impl FromIterator<Route> for RouteTable {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        let mut table = RouteTable::new();
        for route in iter {
            table.register(route);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteOptions;
    use futures::executor::block_on;

    fn route(name: &str, path: &str, method: &str) -> Route {
        Route::new(RouteOptions::new(name, path).method(method)).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = RouteTable::new();
        assert!(table.register(route("posts.index", "/posts", "GET")).is_none());
        assert!(table.register(route("posts.create", "/posts", "POST")).is_none());

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("posts.create").unwrap().http_method(), "POST");
        assert!(table.lookup("posts.missing").is_none());
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut table: RouteTable = vec![
            route("a", "/a", "GET"),
            route("b", "/b", "GET"),
        ]
        .into_iter()
        .collect();

        let old = table.register(route("a", "/alpha", "GET")).unwrap();
        assert_eq!(old.path(), "/a");

        let names: Vec<_> = table.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(table.lookup("a").unwrap().path(), "/alpha");
    }

    #[test]
    fn test_clear() {
        let mut table = RouteTable::new();
        table.register(route("a", "/a", "GET"));
        table.clear();
        assert!(table.is_empty());
        assert!(table.lookup("a").is_none());
    }

    #[test]
    fn test_run_filters_by_method() {
        let table: RouteTable = vec![
            route("posts.index", "/posts", "GET"),
            route("posts.create", "/posts", "POST"),
        ]
        .into_iter()
        .collect();

        let mut ctx = RequestContext::new("/posts").with_method("post");
        assert!(block_on(table.run(&mut ctx)).unwrap().is_handled());
        assert_eq!(ctx.route.as_deref(), Some("posts.create"));

        let mut ctx = RequestContext::new("/posts");
        assert!(block_on(table.run(&mut ctx)).unwrap().is_handled());
        assert_eq!(ctx.route.as_deref(), Some("posts.index"));
    }

    #[test]
    fn test_dispatch_no_match_calls_done_once() {
        let table: RouteTable = vec![route("a", "/a", "GET")].into_iter().collect();
        let mut ctx = RequestContext::new("/zzz");
        let mut calls = 0;

        let kind = block_on(table.dispatch(&mut ctx, |err| {
            assert!(err.is_none());
            calls += 1;
        }))
        .unwrap();

        assert_eq!(kind, Dispatch::Unmatched);
        assert_eq!(calls, 1);
    }
}
