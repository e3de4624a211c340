//! Low-level scanning primitives shared by every scanner mode.
//!
//! A [`Cursor`] walks a byte range of a `&str` one `char` at a time. All
//! lookahead is bounded by the end of the range, so a scan over a sub-range
//! never reads past it.

/// Identifier start inside expressions and tags.
pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Tag and attribute names also allow `-` and `:` (`data-id`, `xlink:href`).
pub fn is_tag_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':')
}

/// Whether a quoted literal `text` ends with its (unescaped) opening quote.
pub fn is_quoted_terminated(text: &str, escapes: bool) -> bool {
    let Some(quote) = text.chars().next() else {
        return false;
    };
    if text.len() < 2 * quote.len_utf8() || !text.ends_with(quote) {
        return false;
    }
    if !escapes {
        return true;
    }
    let body = &text[quote.len_utf8()..text.len() - quote.len_utf8()];
    let trailing_backslashes = body.chars().rev().take_while(|&c| c == '\\').count();
    trailing_backslashes % 2 == 0
}

/// Byte cursor over `source[pos..end]`.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    /// Both offsets must lie on char boundaries with `start <= end <= source.len()`.
    pub fn new(source: &'a str, start: usize, end: usize) -> Self {
        Self {
            source,
            pos: start,
            end,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.end
    }

    /// The unscanned remainder of the range.
    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..self.end]
    }

    /// Text scanned since `start`.
    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.source[start..self.pos]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The char `n` chars ahead of the current one.
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    /// The char immediately before the cursor, ignoring the range start.
    pub fn prev(&self) -> Option<char> {
        self.source[..self.pos].chars().next_back()
    }

    pub fn looking_at(&self, literal: &str) -> bool {
        self.rest().starts_with(literal)
    }

    /// `literal` followed by a character that cannot continue an identifier.
    pub fn looking_at_word(&self, literal: &str) -> bool {
        self.looking_at(literal) && !self.rest()[literal.len()..].chars().next().is_some_and(is_ident_part)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Advance over `bytes` bytes; callers only pass lengths of matched ASCII literals.
    pub fn bump_bytes(&mut self, bytes: usize) {
        self.pos = (self.pos + bytes).min(self.end);
    }

    pub fn eat(&mut self, literal: &str) -> bool {
        if self.looking_at(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    pub fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> usize {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.pos - start
    }

    pub fn eat_whitespace(&mut self) -> usize {
        self.eat_while(char::is_whitespace)
    }

    /// Absolute offset of the next occurrence of `pattern`.
    pub fn find(&self, pattern: &str) -> Option<usize> {
        self.rest().find(pattern).map(|i| self.pos + i)
    }

    /// Move up to (not over) the next `pattern`, or to the end of the range.
    /// Returns whether the pattern was found.
    pub fn skip_until(&mut self, pattern: &str) -> bool {
        match self.find(pattern) {
            Some(at) => {
                self.pos = at;
                true
            }
            None => {
                self.pos = self.end;
                false
            }
        }
    }

    /// Move past the next `pattern`, or to the end of the range.
    pub fn skip_past(&mut self, pattern: &str) -> bool {
        let found = self.skip_until(pattern);
        if found {
            self.pos += pattern.len();
        }
        found
    }

    /// Scan a quoted literal starting at the opening quote.
    ///
    /// With `escapes`, a backslash protects the following char. Returns
    /// whether the closing quote was found; otherwise the range is consumed.
    pub fn scan_quoted(&mut self, escapes: bool) -> bool {
        let Some(quote) = self.bump() else {
            return false;
        };
        while let Some(c) = self.bump() {
            if c == quote {
                return true;
            }
            if escapes && c == '\\' {
                self.bump();
            }
        }
        false
    }

    /// Scan `<!-- ... -->` starting at `<!--`.
    pub fn scan_html_comment(&mut self) -> bool {
        self.bump_bytes("<!--".len());
        self.skip_past("-->")
    }

    /// Scan `// ...` up to (not including) the line break.
    pub fn scan_line_comment(&mut self) {
        self.eat_while(|c| c != '\n');
    }

    /// Scan a block comment starting at `/*`. Comments nest, as in Rust.
    pub fn scan_block_comment(&mut self) -> bool {
        self.bump_bytes(2);
        let mut depth = 1usize;
        while !self.is_at_end() {
            if self.eat("*/") {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            } else if self.eat("/*") {
                depth += 1;
            } else {
                self.bump();
            }
        }
        false
    }

    /// Scan the remainder of a section open tag up to and including `>`,
    /// skipping quoted attribute values.
    pub fn scan_tag_rest(&mut self) -> bool {
        while let Some(c) = self.peek() {
            match c {
                '>' => {
                    self.bump();
                    return true;
                }
                '"' | '\'' => {
                    self.scan_quoted(false);
                }
                _ => {
                    self.bump();
                }
            }
        }
        false
    }

    /// Scan front-matter code up to the next `---` that is not inside a
    /// string, char literal, or comment.
    ///
    /// A `---` at the start of a line always ends the code, so an unclosed
    /// literal cannot run past the closing fence.
    pub fn scan_front_matter_code(&mut self) {
        let end = self.end;
        if let Some(line) = self.rest().find("\n---") {
            self.end = self.pos + line + 1;
        }
        self.skip_front_matter_code();
        self.end = end;
    }

    fn skip_front_matter_code(&mut self) {
        while !self.is_at_end() && !self.looking_at("---") {
            match self.peek() {
                Some('"') => {
                    self.scan_quoted(true);
                }
                Some('r') if self.at_raw_string() => self.scan_raw_string(),
                Some('\'') if self.at_char_literal() => {
                    self.scan_quoted(true);
                }
                Some('/') if self.looking_at("//") => self.scan_line_comment(),
                Some('/') if self.looking_at("/*") => {
                    self.scan_block_comment();
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// `r"` or `r#...#"` not preceded by an identifier char.
    fn at_raw_string(&self) -> bool {
        if self.prev().is_some_and(is_ident_part) {
            return false;
        }
        let after_r = &self.rest()[1..];
        after_r.trim_start_matches('#').starts_with('"')
    }

    fn scan_raw_string(&mut self) {
        self.bump(); // r
        let hashes = self.eat_while(|c| c == '#');
        self.bump(); // opening quote
        let closing = format!("\"{}", "#".repeat(hashes));
        self.skip_past(&closing);
    }

    /// `'x'` or `'\..'`; a lone `'` is a lifetime or label.
    fn at_char_literal(&self) -> bool {
        match self.peek_nth(1) {
            Some('\\') => true,
            Some(_) => self.peek_nth(2) == Some('\''),
            None => false,
        }
    }

    /// Scan raw-text section content (script or style) up to `close_tag`.
    /// The first literal close tag always wins, as in HTML raw text.
    pub fn scan_raw_text(&mut self, close_tag: &str) -> bool {
        self.skip_until(close_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cursor(source: &str) -> Cursor<'_> {
        Cursor::new(source, 0, source.len())
    }

    #[test]
    fn test_looking_at_word_requires_boundary() {
        let c = cursor("@ifValue");
        assert!(c.looking_at("@if"));
        assert!(!c.looking_at_word("@if"));
        assert!(cursor("@if a").looking_at_word("@if"));
        assert!(cursor("@if").looking_at_word("@if"));
    }

    #[test]
    fn test_lookahead_bounded_by_range() {
        let c = Cursor::new("abc---", 0, 4);
        assert!(!c.looking_at("c---"));
        assert_eq!(c.find("---"), None);
        assert_eq!(c.rest(), "abc-");
    }

    #[test]
    fn test_scan_quoted_with_escapes() {
        let mut c = cursor(r#""a\"b" rest"#);
        assert!(c.scan_quoted(true));
        assert_eq!(c.pos(), 6);
    }

    #[test]
    fn test_scan_quoted_without_escapes() {
        let mut c = cursor(r#""a\"b""#);
        assert!(c.scan_quoted(false));
        assert_eq!(c.pos(), 4);
    }

    #[test]
    fn test_scan_quoted_unterminated_consumes_range() {
        let mut c = cursor("'open");
        assert!(!c.scan_quoted(true));
        assert!(c.is_at_end());
    }

    #[test]
    fn test_scan_html_comment() {
        let mut c = cursor("<!-- x --> after");
        assert!(c.scan_html_comment());
        assert_eq!(c.rest(), " after");

        let mut open = cursor("<!-- never");
        assert!(!open.scan_html_comment());
        assert!(open.is_at_end());
    }

    #[test]
    fn test_nested_block_comment() {
        let mut c = cursor("/* a /* b */ c */d");
        assert!(c.scan_block_comment());
        assert_eq!(c.rest(), "d");
    }

    #[test]
    fn test_front_matter_skips_strings_and_comments() {
        let mut c = cursor("let s = \"---\"; // ---\nlet c = '-';\n---");
        c.scan_front_matter_code();
        assert_eq!(c.rest(), "---");
    }

    #[test]
    fn test_front_matter_fence_ends_unclosed_literals() {
        let mut c = cursor("let s = \"oops;\n---\n<template>");
        c.scan_front_matter_code();
        assert_eq!(c.rest(), "---\n<template>");

        let mut c = cursor("/* open\n---");
        c.scan_front_matter_code();
        assert_eq!(c.rest(), "---");
    }

    #[test]
    fn test_front_matter_fence_inside_line_is_code() {
        let mut c = cursor("let s = \"a --- b\"; /* --- */\n---");
        c.scan_front_matter_code();
        assert_eq!(c.rest(), "---");
    }

    #[test]
    fn test_front_matter_raw_string_and_lifetime() {
        let mut c = cursor("fn f<'a>(x: &'a str) { r#\"---\"# }\n---");
        c.scan_front_matter_code();
        assert_eq!(c.rest(), "---");
    }

    #[test]
    fn test_scan_tag_rest_skips_quoted_gt() {
        let mut c = cursor(" lang=\"a>b\">x");
        assert!(c.scan_tag_rest());
        assert_eq!(c.rest(), "x");
    }

    #[test]
    fn test_quoted_terminated() {
        assert!(is_quoted_terminated("\"ok\"", true));
        assert!(!is_quoted_terminated("\"open", true));
        assert!(!is_quoted_terminated("\"esc\\\"", true));
        assert!(is_quoted_terminated("\"esc\\\\\"", true));
        assert!(is_quoted_terminated("'x\\'", false));
        assert!(!is_quoted_terminated("'", false));
    }

    #[test]
    fn test_multibyte_bump() {
        let mut c = cursor("é<");
        assert_eq!(c.bump(), Some('é'));
        assert_eq!(c.pos(), 2);
        assert_eq!(c.peek(), Some('<'));
    }
}
