//! Template tokenizer.
//!
//! Splits a path template into literal runs, named parameters and splats.
//! The tokenizer owns all syntax validation; the compiler only emits.

use crate::error::{PatternError, Result};

/// One lexical unit of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Literal text matched verbatim.
    Literal(&'a str),
    /// A `:name` placeholder, possibly prefixed by `/` or `.`.
    Param(ParamToken),
    /// A `*` splat, captured positionally.
    Splat { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParamToken {
    pub name: String,
    /// Byte offset of the token in the template (including any prefix).
    pub position: usize,
    /// Preceded by `/`.
    pub slash: bool,
    /// Preceded by `.` (a format segment such as `.:format`).
    pub format: bool,
    /// Custom sub-expression from `:name(...)`.
    pub custom: Option<String>,
    pub optional: bool,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Tokenizes `template`.
///
/// Parameter prefixes are recognized greedily: `/:` and `/.:` bind the slash
/// to the parameter so that optional parameters can swallow it.
pub(crate) fn tokenize(template: &str) -> Result<Vec<Token<'_>>> {
    let bytes = template.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < len {
        let (prefix_len, slash, format) = match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b':') => (1, true, false),
            b'/' if bytes.get(i + 1) == Some(&b'.') && bytes.get(i + 2) == Some(&b':') => {
                (2, true, true)
            }
            b'.' if bytes.get(i + 1) == Some(&b':') => (1, false, true),
            b':' => (0, false, false),
            b'*' => {
                flush(&mut tokens, template, literal_start, i);
                tokens.push(Token::Splat { position: i });
                i += 1;
                literal_start = i;
                continue;
            }
            b'(' | b')' => {
                return Err(PatternError::malformed(
                    template,
                    i,
                    format!("unexpected '{}' outside a parameter", bytes[i] as char),
                ));
            }
            _ => {
                i += 1;
                continue;
            }
        };

        flush(&mut tokens, template, literal_start, i);
        let start = i;
        // Skip the prefix and the ':' itself.
        i += prefix_len + 1;

        let name_start = i;
        while i < len && is_name_byte(bytes[i]) {
            i += 1;
        }
        if name_start == i {
            return Err(PatternError::malformed(
                template,
                start,
                "expected a parameter name after ':'",
            ));
        }
        let name = template[name_start..i].to_string();

        let mut custom = None;
        if bytes.get(i) == Some(&b'(') {
            let open = i;
            let close = find_closing_paren(bytes, open).ok_or_else(|| {
                PatternError::malformed(template, open, "unbalanced '(' in custom pattern")
            })?;
            let body = &template[open + 1..close];
            if body.is_empty() {
                return Err(PatternError::malformed(
                    template,
                    open,
                    "empty custom pattern",
                ));
            }
            custom = Some(body.to_string());
            i = close + 1;
        }

        let optional = bytes.get(i) == Some(&b'?');
        if optional {
            i += 1;
        }

        tokens.push(Token::Param(ParamToken {
            name,
            position: start,
            slash,
            format,
            custom,
            optional,
        }));
        literal_start = i;
    }

    flush(&mut tokens, template, literal_start, len);
    Ok(tokens)
}

fn flush<'a>(tokens: &mut Vec<Token<'a>>, template: &'a str, from: usize, to: usize) {
    if from < to {
        tokens.push(Token::Literal(&template[from..to]));
    }
}

/// Returns the index of the `)` closing the `(` at `open`, honoring escapes.
fn find_closing_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(tokens: &[Token<'_>], idx: usize) -> ParamToken {
        match &tokens[idx] {
            Token::Param(p) => p.clone(),
            other => panic!("expected param, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_only() {
        let tokens = tokenize("/posts/archive").unwrap();
        assert_eq!(tokens, vec![Token::Literal("/posts/archive")]);
    }

    #[test]
    fn test_slash_param() {
        let tokens = tokenize("/users/:id").unwrap();
        assert_eq!(tokens[0], Token::Literal("/users"));
        let p = param(&tokens, 1);
        assert_eq!(p.name, "id");
        assert!(p.slash);
        assert!(!p.format);
        assert!(!p.optional);
        assert_eq!(p.position, 6);
    }

    #[test]
    fn test_optional_and_custom() {
        let tokens = tokenize("/files/:id(\\d+)?").unwrap();
        let p = param(&tokens, 1);
        assert_eq!(p.custom.as_deref(), Some("\\d+"));
        assert!(p.optional);
    }

    #[test]
    fn test_format_param() {
        let tokens = tokenize("/report.:format").unwrap();
        assert_eq!(tokens[0], Token::Literal("/report"));
        let p = param(&tokens, 1);
        assert!(p.format);
        assert!(!p.slash);
    }

    #[test]
    fn test_splat() {
        let tokens = tokenize("/static/*").unwrap();
        assert_eq!(tokens[0], Token::Literal("/static/"));
        assert_eq!(tokens[1], Token::Splat { position: 8 });
    }

    #[test]
    fn test_nested_parens_in_custom() {
        let tokens = tokenize("/:slug((?:a|b)+)").unwrap();
        assert_eq!(param(&tokens, 0).custom.as_deref(), Some("(?:a|b)+"));
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let err = tokenize("/users/:").unwrap_err();
        assert!(matches!(err, PatternError::MalformedTemplate { position: 6, .. }));
    }

    #[test]
    fn test_unbalanced_custom_is_malformed() {
        assert!(tokenize("/:id(\\d+").is_err());
    }

    #[test]
    fn test_stray_paren_is_malformed() {
        assert!(tokenize("/users)").is_err());
        assert!(tokenize("/(users").is_err());
    }

    #[test]
    fn test_empty_custom_is_malformed() {
        assert!(tokenize("/:id()").is_err());
    }
}
