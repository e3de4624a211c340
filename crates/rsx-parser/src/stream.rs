//! Lazily filled token buffer between the scanner and the parser.

use rsx_lexer::{lexical_anomaly, Diagnostic, DiagnosticKind, Scanner, Span, Token, TokenKind};

/// A saved position in the token buffer.
///
/// Rolling back to a marker re-reads buffered tokens; it never re-scans text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker(usize);

/// Significant tokens pulled from a [`Scanner`] on demand.
///
/// Whitespace is dropped as tokens enter the buffer. Lexical diagnostics
/// are recorded at the same moment, so a rollback never reports them twice.
pub struct TokenStream<'a> {
    source: &'a str,
    scanner: Scanner<'a>,
    buffer: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::from_scanner(source, Scanner::new(source))
    }

    pub fn from_scanner(source: &'a str, scanner: Scanner<'a>) -> Self {
        Self {
            source,
            scanner,
            buffer: Vec::new(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn text(&self, token: Token) -> &'a str {
        token.text(self.source)
    }

    /// The next significant token. `Eof` once the input is exhausted.
    pub fn peek(&mut self) -> Token {
        self.peek_nth(0)
    }

    pub fn peek_nth(&mut self, n: usize) -> Token {
        self.fill(self.pos + n);
        let last = self.buffer.len() - 1;
        self.buffer[(self.pos + n).min(last)]
    }

    pub fn at(&mut self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume and return the next token. `Eof` is never consumed.
    pub fn bump(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it is of `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        self.at(kind).then(|| self.bump())
    }

    /// End offset of the last consumed token.
    pub fn prev_end(&self) -> usize {
        match self.pos {
            0 => 0,
            pos => self.buffer[pos - 1].span.end,
        }
    }

    pub fn marker(&self) -> Marker {
        Marker(self.pos)
    }

    pub fn rollback(&mut self, marker: Marker) {
        self.pos = marker.0;
    }

    /// Lexical diagnostics of every token pulled so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Make sure `buffer[index]` exists, or that the buffer ends in `Eof`.
    fn fill(&mut self, index: usize) {
        while self.buffer.len() <= index {
            if self.buffer.last().is_some_and(|t| t.kind == TokenKind::Eof) {
                return;
            }
            let token = self.scanner.next_token();
            if token.kind.is_trivia() {
                continue;
            }
            if let Some(diagnostic) = lexical_anomaly(&token, self.source) {
                record(&mut self.diagnostics, diagnostic, self.source);
            }
            self.buffer.push(token);
        }
    }
}

/// Push a diagnostic, folding a run of adjacent bad characters into one.
pub(crate) fn record(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic, source: &str) {
    if diagnostic.kind == DiagnosticKind::BadCharacter {
        if let Some(prev) = diagnostics.last_mut() {
            if prev.kind == DiagnosticKind::BadCharacter && prev.span.end == diagnostic.span.start {
                prev.span = prev.span.cover(diagnostic.span);
                prev.message = format!("unexpected characters `{}`", prev.span.text(source));
                return;
            }
        }
    }
    diagnostics.push(diagnostic);
}

/// Significant tokens of a `{{ ... }}` attribute value, scanned on their own.
pub(crate) fn relex_interpolation(source: &str, value: Span, diagnostics: &mut Vec<Diagnostic>) -> Vec<Token> {
    let text = value.text(source);
    let start = value.start + 2;
    let end = if text.len() >= 4 && text.ends_with("}}") {
        value.end - 2
    } else {
        value.end
    };
    Scanner::with_range(source, start..end, rsx_lexer::LexState::interpolation())
        .filter(|t| !t.kind.is_trivia())
        .inspect(|t| {
            if let Some(diagnostic) = lexical_anomaly(t, source) {
                record(diagnostics, diagnostic, source);
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_skips_trivia_and_stops_at_eof() {
        let mut stream = TokenStream::new("<template> a </template>");
        assert_eq!(stream.bump().kind, TokenKind::TemplateOpen);
        assert_eq!(stream.bump().kind, TokenKind::Text);
        assert_eq!(stream.bump().kind, TokenKind::TemplateClose);
        assert_eq!(stream.bump().kind, TokenKind::Eof);
        assert_eq!(stream.bump().kind, TokenKind::Eof);
        assert_eq!(stream.prev_end(), 24);
    }

    #[test]
    fn test_rollback_does_not_duplicate_diagnostics() {
        let mut stream = TokenStream::new("<template>{{ # }}</template>");
        let marker = stream.marker();
        while !stream.at(TokenKind::Eof) {
            stream.bump();
        }
        stream.rollback(marker);
        assert_eq!(stream.peek().kind, TokenKind::TemplateOpen);
        while !stream.at(TokenKind::Eof) {
            stream.bump();
        }
        assert_eq!(stream.take_diagnostics().len(), 1);
    }

    #[test]
    fn test_adjacent_bad_characters_merge() {
        let mut stream = TokenStream::new("abc <template></template> z");
        while !stream.at(TokenKind::Eof) {
            stream.bump();
        }
        let diagnostics = stream.take_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].span, Span::new(0, 3));
        assert_eq!(diagnostics[0].message, "unexpected characters `abc`");
        assert_eq!(diagnostics[1].span, Span::new(26, 27));
    }

    #[test]
    fn test_peek_nth_past_end() {
        let mut stream = TokenStream::new("---");
        assert_eq!(stream.peek_nth(0).kind, TokenKind::FrontMatterDelimiter);
        assert_eq!(stream.peek_nth(5).kind, TokenKind::Eof);
    }

    #[test]
    fn test_relex_attribute_interpolation() {
        let source = "{{ a > 1 }}";
        let mut diagnostics = Vec::new();
        let kinds: Vec<TokenKind> = relex_interpolation(source, Span::new(0, source.len()), &mut diagnostics)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Gt, TokenKind::Number]);
        assert!(diagnostics.is_empty());
    }
}
