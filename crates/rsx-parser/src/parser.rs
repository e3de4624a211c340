//! Syntax builder for RSX files.
//!
//! Pulls significant tokens from the scanner and assembles the section tree
//! in one forward pass. Elements and directives that are still open live on
//! an explicit frame stack, so nesting depth never turns into recursion.
//! Nothing here aborts: malformed input produces a diagnostic and a node
//! that covers what was seen.

use rsx_lexer::{is_void_element, Diagnostic, DiagnosticKind, Span, Token, TokenKind};
use serde::Serialize;

use crate::ast::{
    Attribute, AttributeValue, Branch, CodeSection, Directive, DirectiveHead, DirectiveKind,
    EachBinding, Element, Expression, File, Interpolation, Node, Section, SectionKind,
    TemplateSection, Text,
};
use crate::expr_parser::ExprParser;
use crate::stream::{record, relex_interpolation, TokenStream};

/// Knobs for a single parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Build an [`Expr`](crate::ast::Expr) tree for every expression run.
    /// When off, expressions keep only their tokens.
    pub expression_trees: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            expression_trees: true,
        }
    }
}

/// The result of parsing: always a tree, plus everything wrong with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parse {
    pub file: File,
    /// Lexical and structural diagnostics, ordered by start offset.
    pub diagnostics: Vec<Diagnostic>,
}

/// RSX file parser.
pub struct Parser<'a> {
    stream: TokenStream<'a>,
    options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
    seen: Vec<SectionKind>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, options: ParseOptions) -> Self {
        Self {
            stream: TokenStream::new(source),
            options,
            diagnostics: Vec::new(),
            seen: Vec::new(),
        }
    }

    /// Parse a complete file with default options.
    pub fn parse(source: &str) -> Parse {
        Self::parse_with(source, ParseOptions::default())
    }

    pub fn parse_with(source: &str, options: ParseOptions) -> Parse {
        let mut parser = Parser::new(source, options);
        let file = parser.parse_file();
        parser.finish(file)
    }

    fn finish(mut self, file: File) -> Parse {
        let mut diagnostics = self.stream.take_diagnostics();
        diagnostics.append(&mut self.diagnostics);
        diagnostics.sort_by_key(|d| d.span.start);
        Parse { file, diagnostics }
    }

    // =========================================================================
    // Sections
    // =========================================================================

    fn parse_file(&mut self) -> File {
        let mut sections = Vec::new();
        loop {
            let token = self.stream.peek();
            let kind = match token.kind {
                TokenKind::Eof => break,
                TokenKind::FrontMatterDelimiter => SectionKind::FrontMatter,
                TokenKind::ScriptOpen => SectionKind::Script,
                TokenKind::TemplateOpen => SectionKind::Template,
                TokenKind::StyleOpen => SectionKind::Style,
                TokenKind::BadCharacter => {
                    // Already reported by the stream.
                    self.stream.bump();
                    continue;
                }
                _ => {
                    self.stream.bump();
                    self.unexpected(token, "outside of any section");
                    continue;
                }
            };

            if self.seen.contains(&kind) {
                self.error(
                    DiagnosticKind::DuplicateSection,
                    token.span,
                    format!("duplicate {} section", kind.name()),
                );
            } else {
                self.seen.push(kind);
            }

            tracing::trace!(section = kind.name(), offset = token.span.start, "entering section");
            let section = match kind {
                SectionKind::FrontMatter => Section::FrontMatter(self.parse_code_section(
                    kind,
                    TokenKind::FrontMatterCode,
                    TokenKind::FrontMatterDelimiter,
                )),
                SectionKind::Script => Section::Script(self.parse_code_section(
                    kind,
                    TokenKind::ScriptCode,
                    TokenKind::ScriptClose,
                )),
                SectionKind::Style => Section::Style(self.parse_code_section(
                    kind,
                    TokenKind::StyleCode,
                    TokenKind::StyleClose,
                )),
                SectionKind::Template => Section::Template(self.parse_template()),
            };
            sections.push(section);
        }

        File {
            sections,
            span: Span::new(0, self.stream.source().len()),
        }
    }

    /// Front matter, script or style: an open token, opaque code, a close token.
    fn parse_code_section(&mut self, kind: SectionKind, code: TokenKind, close: TokenKind) -> CodeSection {
        let open = self.stream.bump();
        if kind != SectionKind::FrontMatter {
            self.check_open_tag(open);
        }

        let mut content = Span::at(open.span.end);
        while let Some(token) = self.stream.eat(code) {
            content = content.cover(token.span);
        }

        let close = self.stream.eat(close).map(|t| t.span);
        if close.is_none() {
            self.error(
                DiagnosticKind::UnterminatedSection,
                open.span,
                format!("{} section is never closed", kind.name()),
            );
        }

        CodeSection {
            open: open.span,
            content,
            close,
            span: Span::new(open.span.start, self.stream.prev_end()),
        }
    }

    fn parse_template(&mut self) -> TemplateSection {
        let open = self.stream.bump();
        self.check_open_tag(open);

        let mut tree = Tree::default();
        loop {
            let token = self.stream.peek();
            match token.kind {
                TokenKind::TemplateClose | TokenKind::Eof => break,
                TokenKind::TagOpen => self.parse_start_tag(&mut tree),
                TokenKind::TagEndOpen => self.parse_end_tag(&mut tree),
                TokenKind::Text => self.parse_text(&mut tree),
                TokenKind::Comment => {
                    self.stream.bump();
                    tree.push(Node::Comment(token.span));
                }
                TokenKind::InterpolationOpen => self.parse_mustache(&mut tree),
                TokenKind::BadCharacter => {
                    self.stream.bump();
                }
                _ => {
                    self.stream.bump();
                    self.unexpected(token, "in template");
                    tree.push(Node::Error(token.span));
                }
            }
        }

        let boundary = self.stream.prev_end();
        self.close_frames(&mut tree, 0, boundary);

        let close = self.stream.eat(TokenKind::TemplateClose).map(|t| t.span);
        if close.is_none() {
            self.error(
                DiagnosticKind::UnterminatedSection,
                open.span,
                "template section is never closed",
            );
        }

        TemplateSection {
            open: open.span,
            children: tree.roots,
            close,
            span: Span::new(open.span.start, self.stream.prev_end()),
        }
    }

    /// `<script ...>` and friends run to `>`; report when the input ended first.
    fn check_open_tag(&mut self, open: Token) {
        let text = self.stream.text(open);
        if !text.ends_with('>') {
            self.error(
                DiagnosticKind::MissingTagClose,
                open.span,
                format!("`{}` is missing `>`", text.trim_end()),
            );
        }
    }

    // =========================================================================
    // Markup
    // =========================================================================

    fn parse_text(&mut self, tree: &mut Tree) {
        let first = self.stream.bump();
        let mut span = first.span;
        // Whitespace never reaches the stream, so adjacent text tokens were
        // separated by whitespace only.
        while let Some(token) = self.stream.eat(TokenKind::Text) {
            span = span.cover(token.span);
        }
        tree.push(Node::Text(Text {
            content: span.text(self.stream.source()).to_string(),
            span,
        }));
    }

    fn parse_start_tag(&mut self, tree: &mut Tree) {
        let open = self.stream.bump();
        let name = match self.stream.eat(TokenKind::TagName) {
            Some(token) => Some(self.stream.text(token).to_string()),
            None => {
                let next = self.stream.peek();
                self.unexpected(next, "where a tag name was expected");
                None
            }
        };

        let mut attributes = Vec::new();
        let terminator = loop {
            let token = self.stream.peek();
            match token.kind {
                TokenKind::AttrName => attributes.push(self.parse_attribute()),
                TokenKind::TagClose | TokenKind::SelfClose => {
                    self.stream.bump();
                    break Some(token.kind);
                }
                TokenKind::BadCharacter => {
                    self.stream.bump();
                }
                TokenKind::TemplateClose | TokenKind::Eof => break None,
                _ => {
                    self.stream.bump();
                    self.unexpected(token, "in start tag");
                }
            }
        };

        let start_tag = Span::new(open.span.start, self.stream.prev_end());
        if terminator.is_none() {
            self.error(
                DiagnosticKind::MissingTagClose,
                start_tag,
                format!("start tag `{}` is missing `>`", start_tag.text(self.stream.source()).trim_end()),
            );
        }

        let Some(name) = name else {
            tree.push(Node::Error(start_tag));
            return;
        };

        let self_closing = terminator == Some(TokenKind::SelfClose);
        let element = Element {
            name,
            attributes,
            children: Vec::new(),
            start_tag,
            end_tag: None,
            self_closing,
            span: start_tag,
        };
        if self_closing || terminator.is_none() || is_void_element(&element.name) {
            tree.push(Node::Element(element));
        } else {
            tree.frames.push(Frame::Element(element));
        }
    }

    fn parse_attribute(&mut self) -> Attribute {
        let name = self.stream.bump();
        let mut span = name.span;
        let mut value = None;

        if let Some(equals) = self.stream.eat(TokenKind::Equals) {
            span = span.cover(equals.span);
            match self.stream.eat(TokenKind::AttrValue) {
                Some(token) => {
                    span = span.cover(token.span);
                    value = Some(self.attribute_value(token));
                }
                None => self.error(
                    DiagnosticKind::UnexpectedToken,
                    equals.span,
                    "expected a value after `=`",
                ),
            }
        }

        Attribute {
            name: self.stream.text(name).to_string(),
            value,
            span,
        }
    }

    fn attribute_value(&mut self, token: Token) -> AttributeValue {
        let raw = self.stream.text(token);
        let expression = if raw.starts_with("{{") {
            let tokens = relex_interpolation(self.stream.source(), token.span, &mut self.diagnostics);
            let expression = self.expression(tokens, true);
            if expression.is_none() {
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    token.span,
                    "expected an expression inside `{{ }}`",
                );
            }
            expression
        } else {
            None
        };

        AttributeValue {
            raw: raw.to_string(),
            expression,
            span: token.span,
        }
    }

    fn parse_end_tag(&mut self, tree: &mut Tree) {
        let open = self.stream.bump();
        let name = self.stream.eat(TokenKind::TagName);
        loop {
            let token = self.stream.peek();
            match token.kind {
                TokenKind::BadCharacter => {
                    self.stream.bump();
                }
                TokenKind::TagName => {
                    self.stream.bump();
                    self.unexpected(token, "in end tag");
                }
                _ => break,
            }
        }
        let closed = self.stream.eat(TokenKind::TagClose).is_some();
        let span = Span::new(open.span.start, self.stream.prev_end());
        if !closed {
            self.error(DiagnosticKind::MissingTagClose, span, "end tag is missing `>`");
        }

        let Some(name) = name else {
            self.error(DiagnosticKind::UnexpectedToken, span, "end tag has no name");
            tree.push(Node::Error(span));
            return;
        };

        let name = self.stream.text(name);
        let target = tree
            .frames
            .iter()
            .rposition(|frame| matches!(frame, Frame::Element(el) if el.name.eq_ignore_ascii_case(name)));
        match target {
            Some(index) => {
                self.close_frames(tree, index + 1, span.start);
                tree.close_top(span.end, Some(span));
            }
            None => {
                tracing::debug!(name, offset = span.start, "end tag without a matching start tag");
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    span,
                    format!("`</{name}>` has no matching start tag"),
                );
                tree.push(Node::Error(span));
            }
        }
    }

    // =========================================================================
    // Interpolations and directives
    // =========================================================================

    /// Anything that starts with `{{`.
    fn parse_mustache(&mut self, tree: &mut Tree) {
        let open = self.stream.bump();
        match self.stream.peek().kind {
            TokenKind::If | TokenKind::Each => self.open_directive(tree, open),
            TokenKind::ElseIf | TokenKind::Else => self.parse_branch(tree, open),
            TokenKind::EndIf | TokenKind::EndEach => self.parse_directive_close(tree, open),
            TokenKind::Html => {
                self.stream.bump();
                self.parse_interpolation(tree, open, true);
            }
            _ => self.parse_interpolation(tree, open, false),
        }
    }

    fn parse_interpolation(&mut self, tree: &mut Tree, open: Token, raw: bool) {
        let tokens = self.take_run();
        let (span, terminated) = self.close_mustache(open);
        let expression = self.expression(tokens, true);
        if expression.is_none() && terminated {
            self.error(DiagnosticKind::UnexpectedToken, span, "expected an expression inside `{{ }}`");
        }
        tree.push(Node::Interpolation(Interpolation {
            raw,
            expression,
            span,
            terminated,
        }));
    }

    fn open_directive(&mut self, tree: &mut Tree, open: Token) {
        let keyword = self.stream.bump();
        let kind = if keyword.kind == TokenKind::If {
            DirectiveKind::If
        } else {
            DirectiveKind::Each
        };

        let (expression, binding) = match kind {
            DirectiveKind::If => {
                let tokens = self.take_run();
                (self.expression(tokens, true), None)
            }
            DirectiveKind::Each => self.parse_each_head(),
        };
        let (span, _) = self.close_mustache(open);
        if expression.is_none() {
            self.error(
                DiagnosticKind::UnexpectedToken,
                span,
                format!("`{}` needs an expression", kind.keyword()),
            );
        }

        tree.frames.push(Frame::Directive(DirectiveFrame {
            kind,
            done: Vec::new(),
            current: Branch {
                head: DirectiveHead {
                    keyword: keyword.kind,
                    expression,
                    binding,
                    span,
                },
                children: Vec::new(),
            },
            has_else: false,
            start: open.span.start,
        }));
    }

    /// `iterable as item` or `iterable as item, index`.
    fn parse_each_head(&mut self) -> (Option<Expression>, Option<EachBinding>) {
        let marker = self.stream.marker();
        let mut iterable = Vec::new();
        while !self.at_run_end() && !self.stream.at(TokenKind::As) {
            iterable.push(self.stream.bump());
        }

        if let Some(binding) = self.parse_each_binding() {
            if !iterable.is_empty() && self.at_run_end() {
                return (self.expression(iterable, true), Some(binding));
            }
        }

        self.stream.rollback(marker);
        let tokens = self.take_run();
        if let (Some(first), Some(last)) = (tokens.first(), tokens.last()) {
            tracing::debug!(offset = first.span.start, "each head without a binding");
            self.error(
                DiagnosticKind::UnexpectedToken,
                first.span.cover(last.span),
                "expected `iterable as item` or `iterable as item, index`",
            );
        }
        (self.expression(tokens, false), None)
    }

    fn parse_each_binding(&mut self) -> Option<EachBinding> {
        let as_token = self.stream.eat(TokenKind::As)?;
        let item = self.stream.eat(TokenKind::Identifier)?;
        let index = match self.stream.eat(TokenKind::Comma) {
            Some(_) => Some(self.stream.eat(TokenKind::Identifier)?),
            None => None,
        };
        let end = index.unwrap_or(item).span.end;
        Some(EachBinding {
            item: self.stream.text(item).to_string(),
            index: index.map(|t| self.stream.text(t).to_string()),
            span: Span::new(as_token.span.start, end),
        })
    }

    /// `:else if cond` or `:else`, starting a new branch of the open `@if`.
    fn parse_branch(&mut self, tree: &mut Tree, open: Token) {
        let keyword = self.stream.bump();
        let tokens = self.take_run();
        let (span, _) = self.close_mustache(open);
        let word = if keyword.kind == TokenKind::Else {
            ":else"
        } else {
            ":else if"
        };

        let problem = match tree.frames.last() {
            Some(Frame::Directive(frame)) if frame.kind == DirectiveKind::If => {
                frame.has_else.then(|| format!("`{word}` after `:else`"))
            }
            _ => Some(format!("`{word}` outside of an `@if` block")),
        };
        if let Some(message) = problem {
            tracing::debug!(offset = span.start, "stray branch");
            self.error(DiagnosticKind::UnexpectedToken, span, message);
            tree.push(Node::Error(span));
            return;
        }

        let expression = if keyword.kind == TokenKind::Else {
            if let (Some(first), Some(last)) = (tokens.first(), tokens.last()) {
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    first.span.cover(last.span),
                    "`:else` takes no condition",
                );
            }
            None
        } else {
            let expression = self.expression(tokens, true);
            if expression.is_none() {
                self.error(DiagnosticKind::UnexpectedToken, span, "`:else if` needs a condition");
            }
            expression
        };

        if let Some(Frame::Directive(frame)) = tree.frames.last_mut() {
            let head = DirectiveHead {
                keyword: keyword.kind,
                expression,
                binding: None,
                span,
            };
            let previous = std::mem::replace(
                &mut frame.current,
                Branch {
                    head,
                    children: Vec::new(),
                },
            );
            frame.done.push(previous);
            frame.has_else |= keyword.kind == TokenKind::Else;
        }
    }

    /// `/if` or `/each`.
    fn parse_directive_close(&mut self, tree: &mut Tree, open: Token) {
        let keyword = self.stream.bump();
        let kind = if keyword.kind == TokenKind::EndIf {
            DirectiveKind::If
        } else {
            DirectiveKind::Each
        };
        let stray = self.take_run();
        let (span, _) = self.close_mustache(open);
        if let (Some(first), Some(last)) = (stray.first(), stray.last()) {
            self.error(
                DiagnosticKind::UnexpectedToken,
                first.span.cover(last.span),
                format!("`{}` takes no expression", kind.closer()),
            );
        }

        let target = tree
            .frames
            .iter()
            .rposition(|frame| matches!(frame, Frame::Directive(d) if d.kind == kind));
        let on_top = target.is_some_and(|index| index + 1 == tree.frames.len());
        if !on_top {
            let message = match tree.frames.last() {
                Some(frame) => format!("`{}` does not close {}", kind.closer(), frame.describe()),
                None => format!("`{}` without an open `{}`", kind.closer(), kind.keyword()),
            };
            tracing::debug!(closer = kind.closer(), offset = span.start, found = target.is_some(), "mismatched close");
            self.error(DiagnosticKind::MismatchedDirectiveClose, span, message);
        }

        match target {
            Some(index) => {
                self.close_frames(tree, index + 1, span.start);
                tree.close_top(span.end, Some(span));
            }
            None => tree.push(Node::Error(span)),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn at_run_end(&mut self) -> bool {
        matches!(
            self.stream.peek().kind,
            TokenKind::InterpolationClose | TokenKind::TemplateClose | TokenKind::Eof
        )
    }

    /// Tokens up to the `}}` (or the end of the template).
    fn take_run(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while !self.at_run_end() {
            tokens.push(self.stream.bump());
        }
        tokens
    }

    /// Consume `}}` if present. Returns the span of the whole `{{ ... }}`.
    fn close_mustache(&mut self, open: Token) -> (Span, bool) {
        let terminated = self.stream.eat(TokenKind::InterpolationClose).is_some();
        let span = Span::new(open.span.start, self.stream.prev_end());
        if !terminated {
            self.error(DiagnosticKind::UnterminatedInterpolation, span, "`{{` is missing `}}`");
        }
        (span, terminated)
    }

    /// Wrap a token run. The tree is skipped when it is not wanted or when
    /// the run holds anything other than expression tokens, such as
    /// characters that were already reported.
    fn expression(&mut self, tokens: Vec<Token>, build_tree: bool) -> Option<Expression> {
        let (first, last) = (tokens.first()?, tokens.last()?);
        let span = first.span.cover(last.span);

        let clean = tokens.iter().all(|t| t.kind.is_expression());
        let tree = if build_tree && clean && self.options.expression_trees {
            match ExprParser::parse(self.stream.source(), &tokens) {
                Ok(expr) => Some(expr),
                Err(diagnostic) => {
                    self.diagnostics.push(diagnostic);
                    None
                }
            }
        } else {
            None
        };

        Some(Expression { tokens, tree, span })
    }

    /// Close every frame above `depth`, reporting each as never closed.
    fn close_frames(&mut self, tree: &mut Tree, depth: usize, end: usize) {
        while tree.frames.len() > depth {
            let Some(frame) = tree.frames.pop() else {
                break;
            };
            let (kind, span, message) = match &frame {
                Frame::Element(el) => (
                    DiagnosticKind::MissingTagClose,
                    el.start_tag,
                    format!("`<{}>` is never closed", el.name),
                ),
                Frame::Directive(d) => (
                    DiagnosticKind::UnterminatedDirective,
                    d.head_span(),
                    format!("`{}` is missing `{}`", d.kind.keyword(), d.kind.closer()),
                ),
            };
            tracing::debug!(%kind, offset = span.start, end, "closing frame implicitly");
            self.error(kind, span, message);
            tree.push(frame.finish(end, None));
        }
    }

    fn unexpected(&mut self, token: Token, context: &str) {
        let message = match token.kind {
            TokenKind::Eof => format!("unexpected end of input {context}"),
            _ => format!("unexpected `{}` {context}", self.stream.text(token)),
        };
        self.error(DiagnosticKind::UnexpectedToken, token.span, message);
    }

    fn error(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        record(
            &mut self.diagnostics,
            Diagnostic::new(kind, span, message),
            self.stream.source(),
        );
    }
}

// =============================================================================
// Frame stack
// =============================================================================

/// Nodes built so far in one template section.
#[derive(Default)]
struct Tree {
    roots: Vec<Node>,
    frames: Vec<Frame>,
}

impl Tree {
    /// Append a finished node to the innermost open frame.
    fn push(&mut self, node: Node) {
        match self.frames.last_mut() {
            Some(Frame::Element(el)) => el.children.push(node),
            Some(Frame::Directive(d)) => d.current.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn close_top(&mut self, end: usize, close: Option<Span>) {
        if let Some(frame) = self.frames.pop() {
            let node = frame.finish(end, close);
            self.push(node);
        }
    }
}

enum Frame {
    Element(Element),
    Directive(DirectiveFrame),
}

struct DirectiveFrame {
    kind: DirectiveKind,
    done: Vec<Branch>,
    current: Branch,
    has_else: bool,
    start: usize,
}

impl DirectiveFrame {
    fn head_span(&self) -> Span {
        self.done.first().unwrap_or(&self.current).head.span
    }
}

impl Frame {
    fn describe(&self) -> String {
        match self {
            Frame::Element(el) => format!("`<{}>`", el.name),
            Frame::Directive(d) => format!("`{}`", d.kind.keyword()),
        }
    }

    fn finish(self, end: usize, close: Option<Span>) -> Node {
        match self {
            Frame::Element(mut el) => {
                el.span = Span::new(el.span.start, end);
                el.end_tag = close;
                Node::Element(el)
            }
            Frame::Directive(d) => {
                let mut branches = d.done;
                branches.push(d.current);
                Node::Directive(Directive {
                    kind: d.kind,
                    branches,
                    close,
                    span: Span::new(d.start, end),
                })
            }
        }
    }
}
