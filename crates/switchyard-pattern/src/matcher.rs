//! Path matching.
//!
//! Applies a [`CompiledPattern`] to a concrete request path and merges the
//! captured values into a caller-owned parameter store.
//!
//! # Merge Rules
//!
//! - Everything from the first `?` onward is ignored.
//! - Textual captures are percent-decoded.
//! - A named capture is written only if the store has no value for that
//!   name yet. Values supplied before matching (for example query-string
//!   defaults) always win over path segments.
//! - Positional captures are appended in order. An unmatched positional
//!   capture is appended as `None`, so the number of values produced always
//!   equals the number of descriptors.
//! - When the pattern does not match, the store is left untouched.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use serde::Serialize;

use crate::compile::CompiledPattern;

/// A parameter store that path captures can be merged into.
///
/// Implemented by [`PathParams`] here and by the request context of the
/// dispatch crate.
pub trait ParamSink {
    /// Returns true if a value is already present for `name`.
    fn contains_param(&self, name: &str) -> bool;

    /// Stores a named capture. Only called when `contains_param` is false.
    fn insert_param(&mut self, name: &str, value: String);

    /// Appends a positional capture.
    fn push_positional(&mut self, value: Option<String>);
}

/// Plain string parameter store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathParams {
    pub named: BTreeMap<String, String>,
    pub positional: Vec<Option<String>>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Pre-populates a named value. Path captures will not overwrite it.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }
}

impl ParamSink for PathParams {
    fn contains_param(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    fn insert_param(&mut self, name: &str, value: String) {
        self.named.insert(name.to_string(), value);
    }

    fn push_positional(&mut self, value: Option<String>) {
        self.positional.push(value);
    }
}

/// Returns `path` without its query string.
pub fn strip_query(path: &str) -> &str {
    match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    }
}

/// Percent-decodes a captured segment.
///
/// Invalid escapes are kept literally; bytes that do not form valid UTF-8
/// after decoding are replaced with U+FFFD.
pub fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

impl CompiledPattern {
    /// Returns true if `path` (query string ignored) matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(strip_query(path))
    }

    /// Extracts decoded capture values in descriptor order.
    ///
    /// Returns `None` if the path does not match. On a match the returned
    /// vector has exactly one entry per [`CaptureDescriptor`](crate::CaptureDescriptor);
    /// captures that did not participate are `None`.
    pub fn extract(&self, path: &str) -> Option<Vec<Option<String>>> {
        let pathname = strip_query(path);
        let caps = self.regex.captures(pathname)?;

        let values: Vec<Option<String>> = (1..caps.len())
            .map(|i| caps.get(i).map(|m| decode_segment(m.as_str())))
            .collect();

        debug_assert_eq!(values.len(), self.captures.len());
        Some(values)
    }

    /// Matches `path` and merges captures into `params`.
    ///
    /// Returns false, leaving `params` untouched, when the path does not
    /// match.
    ///
    /// # Example
    ///
    /// ```
    /// use switchyard_pattern::{compile, CompileOptions, PathParams};
    ///
    /// let pattern = compile("/:username", CompileOptions::default()).unwrap();
    /// let mut params = PathParams::new();
    ///
    /// assert!(pattern.match_into("/alice?tab=posts", &mut params));
    /// assert_eq!(params.get("username"), Some("alice"));
    /// assert!(params.positional.is_empty());
    /// ```
    pub fn match_into<S>(&self, path: &str, params: &mut S) -> bool
    where
        S: ParamSink + ?Sized,
    {
        let Some(values) = self.extract(path) else {
            tracing::trace!(template = self.template(), path, "no match");
            return false;
        };

        for (descriptor, value) in self.captures.iter().zip(values) {
            match &descriptor.name {
                Some(name) => {
                    if let Some(value) = value {
                        if !params.contains_param(name) {
                            params.insert_param(name, value);
                        }
                    }
                }
                None => params.push_positional(value),
            }
        }

        tracing::trace!(template = self.template(), path, "matched");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, CompileOptions};

    fn relaxed(template: &str) -> CompiledPattern {
        compile(template, CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("/a?x=1"), "/a");
        assert_eq!(strip_query("/a?x=1?y=2"), "/a");
        assert_eq!(strip_query("/a"), "/a");
        assert_eq!(strip_query("?"), "");
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("hello%20world"), "hello world");
        assert_eq!(decode_segment("caf%C3%A9"), "café");
        assert_eq!(decode_segment("a+b"), "a+b");
        assert_eq!(decode_segment("100%"), "100%");
        assert_eq!(decode_segment("%FF"), "\u{FFFD}");
    }

    #[test]
    fn test_literal_match() {
        let p = relaxed("/posts");
        assert!(p.is_match("/posts"));
        assert!(p.is_match("/posts/"));
        assert!(p.is_match("/POSTS"));
        assert!(!p.is_match("/posts/1"));
        assert!(!p.is_match("/post"));
    }

    #[test]
    fn test_case_sensitive() {
        let p = compile("/posts", CompileOptions::new().sensitive(true)).unwrap();
        assert!(p.is_match("/posts"));
        assert!(!p.is_match("/Posts"));
    }

    #[test]
    fn test_strict_trailing_slash() {
        let p = compile("/posts", CompileOptions::new().strict(true)).unwrap();
        assert!(p.is_match("/posts"));
        assert!(!p.is_match("/posts/"));
    }

    #[test]
    fn test_named_capture_decoded() {
        let p = relaxed("/users/:name");
        let mut params = PathParams::new();
        assert!(p.match_into("/users/j%C3%BCrgen", &mut params));
        assert_eq!(params.get("name"), Some("jürgen"));
    }

    #[test]
    fn test_existing_param_is_not_overwritten() {
        let p = relaxed("/users/:name");
        let mut params = PathParams::new().with("name", "preset");
        assert!(p.match_into("/users/bob", &mut params));
        assert_eq!(params.get("name"), Some("preset"));
    }

    #[test]
    fn test_no_match_leaves_params_untouched() {
        let p = relaxed("/users/:name/:tab");
        let mut params = PathParams::new().with("x", "1");
        let before = params.clone();
        assert!(!p.match_into("/users/bob", &mut params));
        assert_eq!(params, before);
    }

    #[test]
    fn test_optional_capture_absent() {
        let p = relaxed("/posts/:id?");
        let mut params = PathParams::new();
        assert!(p.match_into("/posts", &mut params));
        assert!(params.named.is_empty());

        assert!(p.match_into("/posts/7", &mut params));
        assert_eq!(params.get("id"), Some("7"));
    }

    #[test]
    fn test_format_capture() {
        let p = relaxed("/report.:format");
        let mut params = PathParams::new();
        assert!(p.match_into("/report.json", &mut params));
        assert_eq!(params.get("format"), Some("json"));
        assert!(!p.is_match("/report.tar/gz"));
    }

    #[test]
    fn test_splat_positional() {
        let p = relaxed("/static/*");
        let mut params = PathParams::new();
        assert!(p.match_into("/static/css/site%20main.css", &mut params));
        assert_eq!(
            params.positional,
            vec![Some("css/site main.css".to_string())]
        );
    }

    #[test]
    fn test_custom_capture_restricts_match() {
        let p = relaxed("/files/:id(\\d+)");
        assert!(p.is_match("/files/42"));
        assert!(!p.is_match("/files/abc"));
    }

    #[test]
    fn test_extract_count_matches_descriptors() {
        let p = relaxed("/:a/:b?/*");
        let values = p.extract("/x/y/z/w").unwrap();
        assert_eq!(values.len(), p.captures().len());
    }

    #[test]
    fn test_query_string_ignored() {
        let p = relaxed("/a");
        let mut with_query = PathParams::new();
        let mut without = PathParams::new();
        assert_eq!(
            p.match_into("/a?x=1", &mut with_query),
            p.match_into("/a", &mut without)
        );
        assert_eq!(with_query, without);
    }
}
