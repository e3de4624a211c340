use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cursor::is_quoted_terminated;
use crate::token::{Span, Token, TokenKind};

/// Broad grouping of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Characters or literals the scanner could not make sense of.
    LexicalAnomaly,
    /// Something opened and never closed.
    UnterminatedConstruct,
    /// Closers that do not match what is open.
    StructuralMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    BadCharacter,
    UnterminatedString,
    UnterminatedComment,
    UnterminatedInterpolation,
    UnterminatedSection,
    UnterminatedDirective,
    MismatchedDirectiveClose,
    MissingTagClose,
    DuplicateSection,
    UnexpectedToken,
}

impl DiagnosticKind {
    pub fn category(self) -> Category {
        match self {
            DiagnosticKind::BadCharacter | DiagnosticKind::UnterminatedString => {
                Category::LexicalAnomaly
            }
            DiagnosticKind::UnterminatedComment
            | DiagnosticKind::UnterminatedInterpolation
            | DiagnosticKind::UnterminatedSection
            | DiagnosticKind::UnterminatedDirective => Category::UnterminatedConstruct,
            DiagnosticKind::MismatchedDirectiveClose
            | DiagnosticKind::MissingTagClose
            | DiagnosticKind::DuplicateSection
            | DiagnosticKind::UnexpectedToken => Category::StructuralMismatch,
        }
    }

    /// Stable kebab-case name, used in CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::BadCharacter => "bad-character",
            DiagnosticKind::UnterminatedString => "unterminated-string",
            DiagnosticKind::UnterminatedComment => "unterminated-comment",
            DiagnosticKind::UnterminatedInterpolation => "unterminated-interpolation",
            DiagnosticKind::UnterminatedSection => "unterminated-section",
            DiagnosticKind::UnterminatedDirective => "unterminated-directive",
            DiagnosticKind::MismatchedDirectiveClose => "mismatched-directive-close",
            DiagnosticKind::MissingTagClose => "missing-tag-close",
            DiagnosticKind::DuplicateSection => "duplicate-section",
            DiagnosticKind::UnexpectedToken => "unexpected-token",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem found in RSX source, with the byte span it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} at {}..{}: {message}", .span.start, .span.end)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }
}

/// The lexical problem a single token carries, if any.
///
/// The scanner itself keeps no diagnostics; consumers call this on the
/// tokens they pull so that resuming a scan stays a pure function of
/// `(offset, state)`.
pub fn lexical_anomaly(token: &Token, source: &str) -> Option<Diagnostic> {
    let text = token.text(source);
    let (kind, message) = match token.kind {
        TokenKind::BadCharacter => (
            DiagnosticKind::BadCharacter,
            format!("unexpected character `{text}`"),
        ),
        TokenKind::String if !is_quoted_terminated(text, true) => (
            DiagnosticKind::UnterminatedString,
            "unterminated string literal".to_string(),
        ),
        TokenKind::AttrValue if text.starts_with("{{") => {
            if text.len() >= 4 && text.ends_with("}}") {
                return None;
            }
            (
                DiagnosticKind::UnterminatedInterpolation,
                "attribute value is missing `}}`".to_string(),
            )
        }
        TokenKind::AttrValue
            if text.starts_with(['"', '\'']) && !is_quoted_terminated(text, false) =>
        {
            (
                DiagnosticKind::UnterminatedString,
                "unterminated attribute value".to_string(),
            )
        }
        TokenKind::Comment if text.len() < "<!---->".len() || !text.ends_with("-->") => (
            DiagnosticKind::UnterminatedComment,
            "comment is missing `-->`".to_string(),
        ),
        _ => return None,
    };
    Some(Diagnostic::new(kind, token.span, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scanner;
    use pretty_assertions::assert_eq;

    fn anomalies(source: &str) -> Vec<DiagnosticKind> {
        Scanner::new(source)
            .filter_map(|t| lexical_anomaly(&t, source))
            .map(|d| d.kind)
            .collect()
    }

    #[test]
    fn test_clean_template_has_no_anomalies() {
        let source = "<template><a href=\"x\" title={{ t }}>{{ 'ok' }}</a><!-- c --></template>";
        assert!(anomalies(source).is_empty());
    }

    #[test]
    fn test_bad_character() {
        let source = "<template>{{ a # b }}</template>";
        let diags: Vec<_> = Scanner::new(source)
            .filter_map(|t| lexical_anomaly(&t, source))
            .collect();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::BadCharacter);
        assert_eq!(diags[0].span, Span::new(15, 16));
        assert_eq!(diags[0].message, "unexpected character `#`");
    }

    #[test]
    fn test_unterminated_string_in_expression() {
        assert_eq!(
            anomalies("<template>{{ 'open }}"),
            vec![DiagnosticKind::UnterminatedString]
        );
    }

    #[test]
    fn test_unterminated_attribute_values() {
        assert_eq!(
            anomalies("<template><a href=\"open"),
            vec![DiagnosticKind::UnterminatedString]
        );
        assert_eq!(
            anomalies("<template><a href={{ x"),
            vec![DiagnosticKind::UnterminatedInterpolation]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        assert_eq!(
            anomalies("<template><!-- open"),
            vec![DiagnosticKind::UnterminatedComment]
        );
        assert_eq!(anomalies("<template><!-->"), vec![DiagnosticKind::UnterminatedComment]);
    }

    #[test]
    fn test_categories() {
        assert_eq!(DiagnosticKind::BadCharacter.category(), Category::LexicalAnomaly);
        assert_eq!(
            DiagnosticKind::UnterminatedDirective.category(),
            Category::UnterminatedConstruct
        );
        assert_eq!(
            DiagnosticKind::MismatchedDirectiveClose.category(),
            Category::StructuralMismatch
        );
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::new(DiagnosticKind::MissingTagClose, Span::new(3, 7), "`div` is never closed");
        assert_eq!(d.to_string(), "missing-tag-close at 3..7: `div` is never closed");
    }
}
