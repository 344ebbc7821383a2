//! Route manifests.
//!
//! A manifest declares routes as data so a table can be built without code:
//!
//! ```yaml
//! routes:
//!   - name: users.show
//!     path: /:username
//!   - name: posts.show
//!     path: /posts/:id.:format?
//!     method: GET
//!     accepts: [json, html]
//!     params:
//!       id: { type: integer }
//! ```
//!
//! Manifests carry no steps. Routes built from one match and typecast, and
//! applications attach behavior afterwards through [`Mixins`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::RouteError;
use crate::mixin::Mixins;
use crate::params::ParamType;
use crate::route::{Route, RouteOptions};
use crate::table::RouteTable;

/// Errors raised while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown manifest format for {}: expected .json, .yaml or .yml", .0.display())]
    UnknownFormat(PathBuf),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Declared type of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamConfig {
    #[serde(rename = "type")]
    pub kind: ParamType,
}

/// One route declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    #[serde(flatten)]
    pub options: RouteOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepts: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamConfig>,
}

impl RouteEntry {
    /// Compiles this entry into a route.
    pub fn build(&self, mixins: &Mixins) -> Result<Route, RouteError> {
        let route = Route::new(self.options.clone())?.accept(self.accepts.iter().cloned());
        let route = self
            .params
            .iter()
            .fold(route, |route, (name, config)| route.param(name.clone(), config.kind));
        Ok(mixins.apply(route))
    }
}

/// A list of route declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl RouteManifest {
    pub fn from_yaml_str(s: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads a manifest, picking the parser from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let parse: fn(&str) -> Result<Self, ManifestError> = match extension.as_deref() {
            Some("json") => Self::from_json_str,
            Some("yaml") | Some("yml") => Self::from_yaml_str,
            _ => return Err(ManifestError::UnknownFormat(path.to_path_buf())),
        };

        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = parse(&content)?;
        debug!(path = %path.display(), routes = manifest.routes.len(), "manifest loaded");
        Ok(manifest)
    }

    pub fn into_table(self) -> Result<RouteTable, ManifestError> {
        self.into_table_with(&Mixins::new())
    }

    /// Builds a table, decorating every route with `mixins`.
    pub fn into_table_with(self, mixins: &Mixins) -> Result<RouteTable, ManifestError> {
        let mut table = RouteTable::new();
        for entry in &self.routes {
            table.register(entry.build(mixins)?);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
routes:
  - name: users.show
    path: /:username
  - name: posts.create
    path: /posts
    method: POST
    strict: true
    accepts: [json]
    params:
      likes: { type: integer }
      draft: { type: boolean }
"#;

    #[test]
    fn test_yaml_manifest() {
        let manifest = RouteManifest::from_yaml_str(YAML).unwrap();
        assert_eq!(manifest.routes.len(), 2);

        let first = &manifest.routes[0];
        assert_eq!(first.options.method, "GET");
        assert!(!first.options.strict);
        assert!(first.params.is_empty());

        let second = &manifest.routes[1];
        assert_eq!(second.options.method, "POST");
        assert!(second.options.strict);
        assert_eq!(second.accepts, vec!["json"]);
        assert_eq!(second.params["likes"].kind, ParamType::Integer);
    }

    #[test]
    fn test_json_manifest() {
        let json = r#"{"routes": [
            {"name": "home", "path": "/", "params": {"n": {"type": "float"}}}
        ]}"#;
        let manifest = RouteManifest::from_json_str(json).unwrap();
        assert_eq!(manifest.routes[0].params["n"].kind, ParamType::Float);
    }

    #[test]
    fn test_unknown_param_type() {
        let yaml = "routes:\n  - name: a\n    path: /a\n    params:\n      x: { type: date }\n";
        assert!(matches!(
            RouteManifest::from_yaml_str(yaml),
            Err(ManifestError::Yaml(_))
        ));
    }

    #[test]
    fn test_into_table() {
        let table = RouteManifest::from_yaml_str(YAML)
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(table.len(), 2);

        let route = table.lookup("posts.create").unwrap();
        assert_eq!(route.http_method(), "POST");
        assert_eq!(route.accepts(), &["json".to_string()]);
        assert_eq!(route.params().len(), 2);
        assert!(route.pattern().is_strict());
    }

    #[test]
    fn test_into_table_reports_bad_route() {
        let yaml = "routes:\n  - name: bad\n    path: \"/files/:id(\"\n";
        let err = RouteManifest::from_yaml_str(yaml)
            .unwrap()
            .into_table()
            .unwrap_err();
        assert!(matches!(err, ManifestError::Route(RouteError::Pattern { .. })));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let err = RouteManifest::load("routes.toml").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownFormat(_)));
    }
}
