//! Textual denylist scan over formula source.
//!
//! The language has no host bindings, so none of these names resolve to
//! anything at runtime. The scan exists as defense in depth: sources that
//! mention host-environment APIs are rejected outright, before parsing,
//! with a position for the first offending mention.

use crate::error::CompileError;
use crate::formula::lexer::{tokenize, Token, TokenKind};

/// Identifiers that reject a formula on sight.
const DENYLIST: &[&str] = &[
    "eval",
    "Function",
    "setTimeout",
    "setInterval",
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "document",
    "window",
    "globalThis",
    "require",
    "import",
    "process",
];

/// Reject source that mentions a denylisted name.
///
/// Both identifiers and string literals are scanned, so wrapping a name in
/// quotes does not evade the check. Lexically invalid source passes; the
/// parser reports it with a better diagnostic.
pub(crate) fn scan_source(source: &str) -> Result<(), CompileError> {
    let Ok(tokens) = tokenize(source) else {
        return Ok(());
    };
    for token in &tokens {
        if let Some(pattern) = offending_pattern(token) {
            return Err(CompileError::Forbidden {
                pattern: pattern.to_string(),
                line: token.line,
                column: token.column,
            });
        }
    }
    Ok(())
}

fn offending_pattern(token: &Token) -> Option<&'static str> {
    match &token.kind {
        TokenKind::Ident(name) => DENYLIST.iter().copied().find(|p| p == name),
        TokenKind::Str(text) => DENYLIST.iter().copied().find(|p| text.contains(p)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_source_passes() {
        assert!(scan_source("fn calculateScore(ctx) { return 1; }").is_ok());
    }

    #[test]
    fn test_identifier_mention_rejected() {
        let err = scan_source("fn calculateScore(ctx) { let e = eval; return 1; }").unwrap_err();
        let CompileError::Forbidden { pattern, line, .. } = err else {
            panic!("expected forbidden");
        };
        assert_eq!(pattern, "eval");
        assert_eq!(line, 1);
    }

    #[test]
    fn test_string_mention_rejected() {
        let err = scan_source(r#"fn calculateScore(ctx) { let s = "use fetch here"; }"#)
            .unwrap_err();
        assert!(matches!(err, CompileError::Forbidden { ref pattern, .. } if pattern == "fetch"));
    }

    #[test]
    fn test_substring_of_identifier_is_fine() {
        // `evaluate` is not `eval`; identifier matching is exact.
        assert!(scan_source("fn calculateScore(ctx) { let evaluate = 1; return evaluate; }").is_ok());
    }

    #[test]
    fn test_position_reported() {
        let err = scan_source("fn calculateScore(ctx) {\n  window;\n}").unwrap_err();
        let CompileError::Forbidden { line, column, .. } = err else {
            panic!("expected forbidden");
        };
        assert_eq!(line, 2);
        assert_eq!(column, 3);
    }
}
