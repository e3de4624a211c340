use std::ops::Range;

use crate::cursor::{is_ident_part, is_ident_start, is_tag_name_char, Cursor};
use crate::tables::{expression_keyword, DIRECTIVE_KEYWORDS, EXPRESSION_OPERATORS};
use crate::token::{LexState, Mode, Span, Token, TokenKind};

const TEMPLATE_CLOSE: &str = "</template>";
const SCRIPT_CLOSE: &str = "</script>";
const STYLE_CLOSE: &str = "</style>";

/// RSX source scanner.
///
/// Pull-based: every call to [`Scanner::next_token`] consumes exactly the
/// bytes of the token it returns. The scanner never fails; anything it
/// cannot classify becomes a `BadCharacter` token, and unterminated
/// constructs run to the end of the scan range.
///
/// All state that influences the next token lives in [`LexState`], so a
/// host can stop at any token boundary, save `(offset, state)`, and later
/// resume with [`Scanner::with_range`] to get identical output.
pub struct Scanner<'a> {
    cursor: Cursor<'a>,
    state: LexState,
}

impl<'a> Scanner<'a> {
    /// Create a scanner over the whole source, starting between sections.
    pub fn new(source: &'a str) -> Self {
        Self::with_range(source, 0..source.len(), LexState::default())
    }

    /// Create a scanner over `range` of `source`, resuming from `state`.
    ///
    /// Range bounds are clamped to the source and moved back to the nearest
    /// char boundary.
    pub fn with_range(source: &'a str, range: Range<usize>, state: LexState) -> Self {
        let end = floor_char_boundary(source, range.end.min(source.len()));
        let start = floor_char_boundary(source, range.start.min(end));
        Self {
            cursor: Cursor::new(source, start, end),
            state,
        }
    }

    /// Tokenize the entire source. The last token is always `Eof`.
    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next_token();
            tokens.push(token);
            if token.kind == TokenKind::Eof {
                return tokens;
            }
        }
    }

    /// State at the current offset.
    pub fn state(&self) -> LexState {
        self.state
    }

    /// Byte offset of the next token.
    pub fn offset(&self) -> usize {
        self.cursor.pos()
    }

    /// Scan the next token. At the end of the range this returns a
    /// zero-length `Eof` token, repeatedly.
    pub fn next_token(&mut self) -> Token {
        let start = self.cursor.pos();
        if self.cursor.is_at_end() {
            return Token::new(TokenKind::Eof, Span::at(start));
        }

        let kind = match self.state.mode {
            Mode::Initial => self.lex_initial(),
            Mode::FrontMatter => self.lex_front_matter(),
            Mode::Script => self.lex_raw_text(SCRIPT_CLOSE, TokenKind::ScriptCode, TokenKind::ScriptClose),
            Mode::Style => self.lex_raw_text(STYLE_CLOSE, TokenKind::StyleCode, TokenKind::StyleClose),
            Mode::Template => self.lex_template(),
            Mode::TagOpen => self.lex_tag_open(),
            Mode::TagAttributeValue => self.lex_attr_value(),
            Mode::TagClose => self.lex_tag_close(),
            Mode::Interpolation => self.lex_interpolation(),
            Mode::Directive => self.lex_directive(),
        };

        if !kind.is_trivia() {
            self.state.last = Some(kind);
        }
        Token::new(kind, Span::new(start, self.cursor.pos()))
    }

    // --- Sections ---

    fn lex_initial(&mut self) -> TokenKind {
        if self.cursor.eat("---") {
            self.state.mode = Mode::FrontMatter;
            return TokenKind::FrontMatterDelimiter;
        }

        let sections = [
            ("<script", TokenKind::ScriptOpen, Mode::Script),
            ("<template", TokenKind::TemplateOpen, Mode::Template),
            ("<style", TokenKind::StyleOpen, Mode::Style),
        ];
        for (tag, kind, mode) in sections {
            if self.at_section_open(tag) {
                self.cursor.bump_bytes(tag.len());
                self.cursor.scan_tag_rest();
                self.state.mode = mode;
                return kind;
            }
        }

        self.whitespace_or_bad()
    }

    /// `tag` followed by `>`, `/`, whitespace, or the end of the range.
    fn at_section_open(&self, tag: &str) -> bool {
        if !self.cursor.looking_at(tag) {
            return false;
        }
        match self.cursor.rest()[tag.len()..].chars().next() {
            None => true,
            Some(c) => c == '>' || c == '/' || c.is_whitespace(),
        }
    }

    fn lex_front_matter(&mut self) -> TokenKind {
        if self.cursor.eat("---") {
            self.state.mode = Mode::Initial;
            return TokenKind::FrontMatterDelimiter;
        }
        self.cursor.scan_front_matter_code();
        TokenKind::FrontMatterCode
    }

    fn lex_raw_text(&mut self, close: &str, code: TokenKind, close_kind: TokenKind) -> TokenKind {
        if self.cursor.eat(close) {
            self.state.mode = Mode::Initial;
            return close_kind;
        }
        self.cursor.scan_raw_text(close);
        code
    }

    // --- Template markup ---

    fn lex_template(&mut self) -> TokenKind {
        if self.resync_template_close() {
            return TokenKind::TemplateClose;
        }
        if self.cursor.looking_at("<!--") {
            self.cursor.scan_html_comment();
            return TokenKind::Comment;
        }
        if self.cursor.eat("</") {
            self.state.mode = Mode::TagClose;
            return TokenKind::TagEndOpen;
        }
        if self.cursor.eat("<") {
            self.state.mode = Mode::TagOpen;
            return TokenKind::TagOpen;
        }
        if self.cursor.eat("{{") {
            self.state.mode = match self.cursor.peek() {
                Some('@' | ':' | '/') => Mode::Directive,
                _ => Mode::Interpolation,
            };
            return TokenKind::InterpolationOpen;
        }
        if self.cursor.eat_whitespace() > 0 {
            return TokenKind::Whitespace;
        }

        while let Some(c) = self.cursor.peek() {
            if c == '<' || c.is_whitespace() || self.cursor.looking_at("{{") {
                break;
            }
            self.cursor.bump();
        }
        TokenKind::Text
    }

    fn lex_tag_open(&mut self) -> TokenKind {
        if self.resync_template_close() {
            return TokenKind::TemplateClose;
        }
        if self.cursor.eat_whitespace() > 0 {
            return TokenKind::Whitespace;
        }
        if self.cursor.eat("/>") {
            self.state.mode = Mode::Template;
            return TokenKind::SelfClose;
        }
        if self.cursor.eat(">") {
            self.state.mode = Mode::Template;
            return TokenKind::TagClose;
        }
        if self.cursor.eat("=") {
            self.state.mode = Mode::TagAttributeValue;
            return TokenKind::Equals;
        }
        match self.cursor.peek() {
            Some('"' | '\'') => {
                self.cursor.scan_quoted(false);
                TokenKind::AttrValue
            }
            Some(c) if is_ident_start(c) => {
                self.cursor.eat_while(is_tag_name_char);
                if self.state.last == Some(TokenKind::TagOpen) {
                    TokenKind::TagName
                } else {
                    TokenKind::AttrName
                }
            }
            _ => self.bad_character(),
        }
    }

    fn lex_attr_value(&mut self) -> TokenKind {
        if self.resync_template_close() {
            return TokenKind::TemplateClose;
        }
        if self.cursor.eat_whitespace() > 0 {
            return TokenKind::Whitespace;
        }
        match self.cursor.peek() {
            Some('"' | '\'') => {
                self.cursor.scan_quoted(false);
            }
            _ if self.cursor.looking_at("{{") => {
                self.cursor.skip_past("}}");
            }
            _ => {
                let mut consumed = false;
                while let Some(c) = self.cursor.peek() {
                    if c.is_whitespace() || c == '>' || self.cursor.looking_at("/>") {
                        break;
                    }
                    self.cursor.bump();
                    consumed = true;
                }
                if !consumed {
                    // `=` with no value: let the tag rules take the `>` or `/>`.
                    self.state.mode = Mode::TagOpen;
                    return self.lex_tag_open();
                }
            }
        }
        self.state.mode = Mode::TagOpen;
        TokenKind::AttrValue
    }

    fn lex_tag_close(&mut self) -> TokenKind {
        if self.resync_template_close() {
            return TokenKind::TemplateClose;
        }
        if self.cursor.eat_whitespace() > 0 {
            return TokenKind::Whitespace;
        }
        if self.cursor.eat(">") {
            self.state.mode = Mode::Template;
            return TokenKind::TagClose;
        }
        match self.cursor.peek() {
            Some(c) if is_ident_start(c) => {
                self.cursor.eat_while(is_tag_name_char);
                TokenKind::TagName
            }
            _ => self.bad_character(),
        }
    }

    // --- Interpolations and directives ---

    fn lex_interpolation(&mut self) -> TokenKind {
        if self.resync_template_close() {
            return TokenKind::TemplateClose;
        }
        if self.cursor.eat_whitespace() > 0 {
            return TokenKind::Whitespace;
        }
        if self.cursor.eat("}}") {
            self.state.mode = Mode::Template;
            return TokenKind::InterpolationClose;
        }
        if let Some(&(op, kind)) = EXPRESSION_OPERATORS
            .iter()
            .find(|(op, _)| self.cursor.looking_at(op))
        {
            self.cursor.bump_bytes(op.len());
            return kind;
        }

        match self.cursor.peek() {
            Some('"' | '\'') => {
                self.cursor.scan_quoted(true);
                TokenKind::String
            }
            Some(c) if c.is_ascii_digit() => self.lex_number(),
            Some(c) if is_ident_start(c) => {
                let start = self.cursor.pos();
                self.cursor.eat_while(is_ident_part);
                let word = self.cursor.slice_from(start);
                expression_keyword(word).unwrap_or(TokenKind::Identifier)
            }
            _ => self.bad_character(),
        }
    }

    /// Integer or decimal: digits, optionally `.` and more digits.
    fn lex_number(&mut self) -> TokenKind {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.bump();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }
        TokenKind::Number
    }

    fn lex_directive(&mut self) -> TokenKind {
        if self.resync_template_close() {
            return TokenKind::TemplateClose;
        }
        if self.cursor.eat_whitespace() > 0 {
            return TokenKind::Whitespace;
        }
        if self.cursor.eat("}}") {
            self.state.mode = Mode::Template;
            return TokenKind::InterpolationClose;
        }

        if self.eat_else_if() {
            self.state.mode = Mode::Interpolation;
            return TokenKind::ElseIf;
        }
        if let Some(&(keyword, kind)) = DIRECTIVE_KEYWORDS
            .iter()
            .find(|(keyword, _)| self.cursor.looking_at_word(keyword))
        {
            self.cursor.bump_bytes(keyword.len());
            self.state.mode = Mode::Interpolation;
            return kind;
        }

        self.state.mode = Mode::Interpolation;
        self.lex_interpolation()
    }

    /// `:else`, whitespace, then the word `if`.
    fn eat_else_if(&mut self) -> bool {
        if !self.cursor.looking_at(":else") {
            return false;
        }
        let mut ahead = self.cursor.clone();
        ahead.bump_bytes(":else".len());
        if ahead.eat_whitespace() == 0 || !ahead.looking_at_word("if") {
            return false;
        }
        ahead.bump_bytes("if".len());
        self.cursor = ahead;
        true
    }

    // --- Helpers ---

    /// `</template>` ends the section from any nested markup or expression mode.
    fn resync_template_close(&mut self) -> bool {
        if self.cursor.eat(TEMPLATE_CLOSE) {
            self.state.mode = Mode::Initial;
            true
        } else {
            false
        }
    }

    fn whitespace_or_bad(&mut self) -> TokenKind {
        if self.cursor.eat_whitespace() > 0 {
            TokenKind::Whitespace
        } else {
            self.bad_character()
        }
    }

    fn bad_character(&mut self) -> TokenKind {
        self.cursor.bump();
        TokenKind::BadCharacter
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields tokens up to, but not including, `Eof`.
    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

fn floor_char_boundary(source: &str, mut index: usize) -> usize {
    while !source.is_char_boundary(index) {
        index -= 1;
    }
    index
}
