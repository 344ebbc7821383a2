//! Data produced by the CLI commands.
//!
//! Each report is `Serialize` for the structured output modes and
//! `Display` for text output.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use switchyard_dispatch::{Outcome, RequestContext, Route, RouteTable};
use switchyard_pattern::{CaptureDescriptor, CompiledPattern};

/// Result of dispatching one path through a manifest.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteSummary>,
    pub params: Map<String, Value>,
    pub positional: Vec<Value>,
    /// Abort reason, e.g. a failed typecast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchReport {
    pub fn new(table: &RouteTable, ctx: &RequestContext, outcome: &Outcome) -> Self {
        let route = ctx
            .route
            .as_deref()
            .and_then(|name| table.lookup(name))
            .map(|route| RouteSummary::from(route.as_ref()));

        Self {
            path: ctx.path.clone(),
            method: ctx.method.clone(),
            matched: outcome.is_handled(),
            route,
            params: ctx.params.named().clone(),
            positional: ctx.params.positional().to_vec(),
            error: outcome.error().map(|e| e.to_string()),
        }
    }

    /// True if a route matched and its parameters were accepted.
    pub fn is_success(&self) -> bool {
        self.matched && self.error.is_none()
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route = match (&self.route, self.matched) {
            (Some(route), true) => route,
            _ => return write!(f, "no route matched {}", self.path),
        };

        writeln!(f, "{}", route)?;
        for (name, value) in &self.params {
            writeln!(f, "  {} = {}", name, value)?;
        }
        for (index, value) in self.positional.iter().enumerate() {
            writeln!(f, "  [{}] = {}", index, value)?;
        }
        if let Some(error) = &self.error {
            write!(f, "error: {}", error)?;
        }
        Ok(())
    }
}

/// Name, method and path of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub name: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accepts: Vec<String>,
    /// Declared parameter types, as `name:type`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        Self {
            name: route.name().to_string(),
            method: route.http_method().to_string(),
            path: route.path().to_string(),
            accepts: route.accepts().to_vec(),
            params: route
                .params()
                .iter()
                .map(|(name, spec)| format!("{}:{}", name, spec.type_name()))
                .collect(),
        }
    }
}

impl fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.method, self.path)?;
        if !self.params.is_empty() {
            write!(f, " ({})", self.params.join(", "))?;
        }
        Ok(())
    }
}

/// Routes of a manifest, in registration order.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RouteListing(pub Vec<RouteSummary>);

impl From<&RouteTable> for RouteListing {
    fn from(table: &RouteTable) -> Self {
        RouteListing(table.iter().map(RouteSummary::from).collect())
    }
}

impl fmt::Display for RouteListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no routes");
        }
        for route in &self.0 {
            writeln!(f, "{}", route)?;
        }
        Ok(())
    }
}

/// A compiled template.
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    pub template: String,
    pub source: String,
    pub sensitive: bool,
    pub strict: bool,
    pub captures: Vec<CaptureDescriptor>,
}

impl From<&CompiledPattern> for CompileReport {
    fn from(pattern: &CompiledPattern) -> Self {
        Self {
            template: pattern.template().to_string(),
            source: pattern.source().to_string(),
            sensitive: pattern.is_case_sensitive(),
            strict: pattern.is_strict(),
            captures: pattern.captures().to_vec(),
        }
    }
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.source)?;
        for (index, capture) in self.captures.iter().enumerate() {
            let name = capture.name.as_deref().unwrap_or("*");
            let optional = if capture.optional { " (optional)" } else { "" };
            writeln!(f, "  {}: {} at {}{}", index, name, capture.position, optional)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_pattern::{compile, CompileOptions};

    #[test]
    fn test_compile_report_text() {
        let pattern = compile("/posts/:id?", CompileOptions::default()).unwrap();
        let report = CompileReport::from(&pattern);
        assert_eq!(
            report.to_string(),
            "^/posts(?:/([^/]+?))?/?$\n  0: id at 6 (optional)\n"
        );
    }

    #[test]
    fn test_route_summary_text() {
        let route = Route::define("posts.show", "/posts/:id")
            .unwrap()
            .param("id", switchyard_dispatch::ParamSpec::integer());
        let summary = RouteSummary::from(&route);
        assert_eq!(summary.to_string(), "posts.show GET /posts/:id (id:integer)");
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(RouteListing(Vec::new()).to_string(), "no routes");
    }
}
