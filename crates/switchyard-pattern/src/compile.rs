//! Template compilation.
//!
//! [`compile`] turns a path template into a [`CompiledPattern`]: an anchored
//! regular expression plus the ordered [`CaptureDescriptor`]s describing
//! each capture group.
//!
//! # Emitted Expression
//!
//! ```text
//! /:username           → ^/(?:([^/]+?))/?$
//! /posts/:id?          → ^/posts(?:/([^/]+?))?/?$
//! /report.:format      → ^/report(?:\.([^/.]+?))/?$
//! /files/:id(\d+)      → ^/files/(?:(\d+))/?$
//! /static/*            → ^/static/(.*)/?$
//! ```
//!
//! The trailing `/?` is omitted when [`CompileOptions::strict`] is set.
//! Case-insensitive matching is a regex flag, so the source string is the
//! same for both sensitivity settings.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{PatternError, Result};
use crate::token::{tokenize, ParamToken, Token};

/// Upper bound on the compiled program size.
const MAX_REGEX_SIZE: usize = 1 << 20;

const SEGMENT_CAPTURE: &str = "([^/]+?)";
const FORMAT_CAPTURE: &str = "([^/.]+?)";

/// Flags controlling how a template is compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Match letter case exactly. Off by default.
    pub sensitive: bool,
    /// Require the trailing slash to match exactly. Off by default.
    pub strict: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Metadata for one capture group of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureDescriptor {
    /// Parameter name, or `None` for positional captures (`*`).
    pub name: Option<String>,
    /// Whether the capture may be absent from a matching path.
    pub optional: bool,
    /// Byte offset of the placeholder in the template.
    pub position: usize,
}

impl CaptureDescriptor {
    /// Returns true if this capture is written to the positional list.
    pub fn is_positional(&self) -> bool {
        self.name.is_none()
    }
}

/// A path template compiled into a matcher.
///
/// Immutable once built. Cloning is cheap enough to share between routes,
/// but routes normally own their pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    source: String,
    pub(crate) regex: Regex,
    pub(crate) captures: Vec<CaptureDescriptor>,
    options: CompileOptions,
}

impl CompiledPattern {
    /// Compiles `template` with the given options.
    ///
    /// Equivalent to [`compile`].
    pub fn new(template: &str, options: CompileOptions) -> Result<Self> {
        compile(template, options)
    }

    /// The original template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The generated regular expression, without case flags.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Capture descriptors in group order.
    pub fn captures(&self) -> &[CaptureDescriptor] {
        &self.captures
    }

    /// Names of the named captures, in group order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().filter_map(|c| c.name.as_deref())
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.options.sensitive
    }

    pub fn is_strict(&self) -> bool {
        self.options.strict
    }

    /// Returns true if the template contains no capture groups.
    pub fn is_literal(&self) -> bool {
        self.captures.is_empty()
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
            && self.source == other.source
            && self.captures == other.captures
            && self.options == other.options
    }
}

impl Eq for CompiledPattern {}

/// Compiles a path template.
///
/// # Errors
///
/// Returns [`PatternError::MalformedTemplate`] for an empty template, a `:`
/// without a name, unbalanced parentheses, duplicate parameter names, or a
/// custom sub-expression that is invalid or contains its own capture group.
///
/// # Example
///
/// ```
/// use switchyard_pattern::{compile, CompileOptions};
///
/// let pattern = compile("/:username", CompileOptions::default()).unwrap();
/// assert_eq!(pattern.source(), "^/(?:([^/]+?))/?$");
/// assert_eq!(pattern.captures().len(), 1);
/// ```
pub fn compile(template: &str, options: CompileOptions) -> Result<CompiledPattern> {
    if template.is_empty() {
        return Err(PatternError::malformed(template, 0, "template is empty"));
    }

    // A relaxed template ending in '/' matches with or without it, which the
    // trailing `/?` already covers. The root template keeps its slash.
    let body = if !options.strict && template.len() > 1 && template.ends_with('/') {
        &template[..template.len() - 1]
    } else {
        template
    };

    let tokens = tokenize(body).map_err(|err| match err {
        PatternError::MalformedTemplate {
            position, reason, ..
        } => PatternError::malformed(template, position, reason),
        other => other,
    })?;

    let mut source = String::from("^");
    let mut captures = Vec::new();
    let mut seen = HashSet::new();

    for token in &tokens {
        match token {
            Token::Literal(text) => source.push_str(&regex::escape(text)),
            Token::Splat { position } => {
                source.push_str("(.*)");
                captures.push(CaptureDescriptor {
                    name: None,
                    optional: false,
                    position: *position,
                });
            }
            Token::Param(param) => {
                if !seen.insert(param.name.as_str()) {
                    return Err(PatternError::malformed(
                        template,
                        param.position,
                        format!("duplicate parameter '{}'", param.name),
                    ));
                }
                if let Some(custom) = &param.custom {
                    check_custom(template, param, custom)?;
                }
                push_param(&mut source, param);
                captures.push(CaptureDescriptor {
                    name: Some(param.name.clone()),
                    optional: param.optional,
                    position: param.position,
                });
            }
        }
    }

    if !options.strict {
        source.push_str("/?");
    }
    source.push('$');

    let regex = RegexBuilder::new(&source)
        .case_insensitive(!options.sensitive)
        .size_limit(MAX_REGEX_SIZE)
        .build()
        .map_err(|source| PatternError::InvalidExpression {
            template: template.to_string(),
            source,
        })?;

    debug_assert_eq!(regex.captures_len() - 1, captures.len());
    tracing::trace!(template, source = %source, captures = captures.len(), "compiled pattern");

    Ok(CompiledPattern {
        template: template.to_string(),
        source,
        regex,
        captures,
        options,
    })
}

fn push_param(source: &mut String, param: &ParamToken) {
    let slash = if param.slash { "/" } else { "" };
    let capture = match (&param.custom, param.format) {
        (Some(custom), _) => format!("({})", custom),
        (None, true) => FORMAT_CAPTURE.to_string(),
        (None, false) => SEGMENT_CAPTURE.to_string(),
    };

    if !param.optional {
        source.push_str(slash);
    }
    source.push_str("(?:");
    if param.optional {
        source.push_str(slash);
    }
    if param.format {
        source.push_str("\\.");
    }
    source.push_str(&capture);
    source.push(')');
    if param.optional {
        source.push('?');
    }
}

/// Custom sub-expressions must compile on their own and must not add groups,
/// otherwise group indices would drift from the descriptors.
fn check_custom(template: &str, param: &ParamToken, custom: &str) -> Result<()> {
    let probe = Regex::new(custom).map_err(|err| {
        PatternError::malformed(
            template,
            param.position,
            format!("invalid custom pattern for '{}': {}", param.name, err),
        )
    })?;
    if probe.captures_len() > 1 {
        return Err(PatternError::malformed(
            template,
            param.position,
            format!(
                "custom pattern for '{}' must not contain capture groups; use (?:...)",
                param.name
            ),
        ));
    }
    Ok(())
}
