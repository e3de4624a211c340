use serde::{Deserialize, Serialize};

/// A half-open byte range in source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty span at `offset`.
    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// The slice of `source` this span covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Token classification for RSX source.
///
/// Tokens carry no data; their text is recovered from the source through
/// the span. Variants are grouped by the sub-language that produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Front matter
    FrontMatterDelimiter, // ---
    FrontMatterCode,

    // Script section
    ScriptOpen,  // <script ...>
    ScriptCode,
    ScriptClose, // </script>

    // Template section
    TemplateOpen,  // <template ...>
    TemplateClose, // </template>

    // Style section
    StyleOpen,  // <style ...>
    StyleCode,
    StyleClose, // </style>

    // Markup
    TagOpen,    // <
    TagEndOpen, // </
    TagClose,   // >
    SelfClose,  // />
    TagName,
    AttrName,
    Equals,
    AttrValue,
    Text,
    Comment, // <!-- ... -->

    // Interpolation
    InterpolationOpen,  // {{
    InterpolationClose, // }}

    // Directives
    If,      // @if
    ElseIf,  // :else if, :elseif
    Else,    // :else
    EndIf,   // /if
    Each,    // @each
    EndEach, // /each
    Html,    // @html

    // Expression literals and keywords
    Identifier,
    Number,
    String,
    Boolean,
    As,

    // Expression operators
    StrictEq,    // ===
    StrictNotEq, // !==
    EqEq,        // ==
    NotEq,       // !=
    GtEq,        // >=
    LtEq,        // <=
    AndAnd,      // &&
    OrOr,        // ||
    Gt,
    Lt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Question,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // Trivia and catch-all
    Whitespace,
    BadCharacter,

    // End of the scan range
    Eof,
}

impl TokenKind {
    /// Whitespace carries no meaning for the builder.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace)
    }

    /// Tokens produced by the expression rules inside `{{ }}`.
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::Number
                | TokenKind::String
                | TokenKind::Boolean
                | TokenKind::As
                | TokenKind::StrictEq
                | TokenKind::StrictNotEq
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::GtEq
                | TokenKind::LtEq
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Bang
                | TokenKind::Question
                | TokenKind::Colon
                | TokenKind::Dot
                | TokenKind::Comma
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBracket
                | TokenKind::RBracket
        )
    }
}

/// A token produced by the RSX scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// The scanner's current sub-grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Between sections.
    #[default]
    Initial,
    /// Inside `--- ... ---`.
    FrontMatter,
    /// Inside `<script>`.
    Script,
    /// Markup content of `<template>`.
    Template,
    /// Inside `<style>`.
    Style,
    /// After `<`, reading a tag name and attributes.
    TagOpen,
    /// After `=` inside a start tag.
    TagAttributeValue,
    /// After `</`.
    TagClose,
    /// Inside `{{ }}`.
    Interpolation,
    /// Right after `{{` when a directive keyword may follow.
    Directive,
}

impl Mode {
    /// The mode this one returns to when its construct closes.
    ///
    /// Every nested mode has exactly one enclosing mode, which is why the
    /// mode stack never has to be stored alongside the state.
    pub fn enclosing(self) -> Option<Mode> {
        match self {
            Mode::Initial => None,
            Mode::FrontMatter | Mode::Script | Mode::Template | Mode::Style => Some(Mode::Initial),
            Mode::TagOpen | Mode::TagClose | Mode::Interpolation | Mode::Directive => {
                Some(Mode::Template)
            }
            Mode::TagAttributeValue => Some(Mode::TagOpen),
        }
    }
}

/// Everything the scanner needs to resume at a token boundary.
///
/// Hosts persist this next to an offset to re-lex a range after an edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LexState {
    pub mode: Mode,
    /// Kind of the last non-whitespace token.
    pub last: Option<TokenKind>,
}

impl LexState {
    pub fn new(mode: Mode) -> Self {
        Self { mode, last: None }
    }

    /// State for scanning the body of a `{{ ... }}` run on its own.
    pub fn interpolation() -> Self {
        Self {
            mode: Mode::Interpolation,
            last: Some(TokenKind::InterpolationOpen),
        }
    }

    /// The full mode stack, outermost first.
    pub fn mode_stack(&self) -> Vec<Mode> {
        let mut stack = vec![self.mode];
        let mut mode = self.mode;
        while let Some(outer) = mode.enclosing() {
            stack.push(outer);
            mode = outer;
        }
        stack.reverse();
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_span_cover_and_text() {
        let a = Span::new(2, 4);
        let b = Span::new(6, 9);
        assert_eq!(a.cover(b), Span::new(2, 9));
        assert_eq!(Span::new(0, 3).text("div>"), "div");
        assert!(a.contains(3));
        assert!(!a.contains(4));
        assert!(Span::at(5).is_empty());
    }

    #[test]
    fn test_mode_stack_for_attribute_value() {
        let state = LexState::new(Mode::TagAttributeValue);
        assert_eq!(
            state.mode_stack(),
            vec![Mode::Initial, Mode::Template, Mode::TagOpen, Mode::TagAttributeValue]
        );
    }

    #[test]
    fn test_mode_stack_initial() {
        assert_eq!(LexState::default().mode_stack(), vec![Mode::Initial]);
    }

    #[test]
    fn test_token_groups() {
        assert!(TokenKind::AndAnd.is_expression());
        assert!(!TokenKind::InterpolationClose.is_expression());
        assert!(TokenKind::Whitespace.is_trivia());
    }
}
