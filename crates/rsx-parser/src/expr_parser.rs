//! Expression parser for RSX templates.
//!
//! Builds an [`Expr`] tree from the flat token run of a `{{ }}` body using
//! precedence climbing. Binary operators are folded in a loop, so long
//! chains like `a + b + c + ...` do not recurse while parsing, and the
//! left-deep tree they produce is torn down iteratively by `Expr`'s `Drop`.
//! Only genuine nesting (parentheses, unary operators, ternaries, call
//! arguments) recurses, and that is capped at [`MAX_DEPTH`].

use rsx_lexer::{Diagnostic, DiagnosticKind, Span, Token, TokenKind};

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};

/// Deepest nesting accepted before the parser gives up.
pub const MAX_DEPTH: usize = 256;

/// RSX expression parser over a borrowed token run.
pub struct ExprParser<'t> {
    source: &'t str,
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> ExprParser<'t> {
    pub fn new(source: &'t str, tokens: &'t [Token]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(source: &str, tokens: &[Token]) -> Result<Expr, Diagnostic> {
        let mut parser = ExprParser::new(source, tokens);
        let expr = parser.parse_expression()?;
        match parser.peek() {
            Some(token) => Err(parser.unexpected(token, "expected end of expression")),
            None => Ok(expr),
        }
    }

    /// `condition ? consequent : alternate`, right-associative.
    pub fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        let condition = self.parse_binary(1)?;
        if self.eat(TokenKind::Question).is_none() {
            return Ok(condition);
        }
        let consequent = self.nested(Self::parse_expression)?;
        self.expect(TokenKind::Colon, "expected `:` in conditional expression")?;
        let alternate = self.nested(Self::parse_expression)?;
        let span = condition.span.cover(alternate.span);
        Ok(Expr {
            kind: ExprKind::Ternary {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        })
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek().and_then(|t| BinaryOp::from_token(t.kind)) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.parse_binary(precedence + 1)?;
            let span = left.span.cover(right.span);
            left = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Bang) => UnaryOp::Not,
            Some(TokenKind::Minus) => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let Some(token) = self.bump() else {
            return self.parse_postfix();
        };
        let operand = self.nested(Self::parse_unary)?;
        let span = token.span.cover(operand.span);
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        })
    }

    /// Member access, indexing and calls.
    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::Dot).is_some() {
                let property = self.expect(TokenKind::Identifier, "expected property name after `.`")?;
                let span = expr.span.cover(property.span);
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property: Box::new(self.identifier(property)),
                        computed: false,
                    },
                    span,
                };
            } else if self.eat(TokenKind::LBracket).is_some() {
                let index = self.nested(Self::parse_expression)?;
                let close = self.expect(TokenKind::RBracket, "expected `]`")?;
                let span = expr.span.cover(close.span);
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property: Box::new(index),
                        computed: true,
                    },
                    span,
                };
            } else if self.eat(TokenKind::LParen).is_some() {
                let arguments = self.nested(Self::parse_arguments)?;
                let close = self.expect(TokenKind::RParen, "expected `)` after arguments")?;
                let span = expr.span.cover(close.span);
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        arguments,
                    },
                    span,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, Diagnostic> {
        let mut arguments = Vec::new();
        if self.peek().is_some_and(|t| t.kind == TokenKind::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.eat(TokenKind::Comma).is_none() {
                return Ok(arguments);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let Some(token) = self.bump() else {
            return Err(self.unexpected_end());
        };
        let text = token.text(self.source);
        let kind = match token.kind {
            TokenKind::Number => match text.parse::<f64>() {
                Ok(value) => ExprKind::Number(value),
                Err(_) => return Err(self.unexpected(token, "invalid number")),
            },
            TokenKind::String => ExprKind::String(unescape(text)),
            TokenKind::Boolean => ExprKind::Boolean(text == "true"),
            TokenKind::Identifier => ExprKind::Identifier(text.to_string()),
            TokenKind::LParen => {
                let inner = self.nested(Self::parse_expression)?;
                self.expect(TokenKind::RParen, "expected `)`")?;
                // Grouping stays implicit in the tree.
                return Ok(inner);
            }
            _ => return Err(self.unexpected(token, "expected an expression")),
        };
        Ok(Expr {
            kind,
            span: token.span,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Diagnostic>) -> Result<T, Diagnostic> {
        if self.depth >= MAX_DEPTH {
            let span = self.peek().map_or_else(|| self.end_span(), |t| t.span);
            return Err(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                span,
                format!("expression nests deeper than {MAX_DEPTH} levels"),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn identifier(&self, token: Token) -> Expr {
        Expr {
            kind: ExprKind::Identifier(token.text(self.source).to_string()),
            span: token.span,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => self.bump(),
            _ => None,
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(self.unexpected(token, message)),
            None => Err(Diagnostic::new(DiagnosticKind::UnexpectedToken, self.end_span(), message)),
        }
    }

    fn end_span(&self) -> Span {
        Span::at(self.tokens.last().map_or(0, |t| t.span.end))
    }

    fn unexpected(&self, token: Token, message: &str) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::UnexpectedToken,
            token.span,
            format!("{message}, found `{}`", token.text(self.source)),
        )
    }

    fn unexpected_end(&self) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::UnexpectedToken,
            self.end_span(),
            "unexpected end of expression",
        )
    }
}

/// String literal contents with the quotes stripped and escapes resolved.
fn unescape(literal: &str) -> String {
    let mut chars = literal.chars();
    let quote = chars.next();
    let mut body: Vec<char> = chars.collect();
    if body.last().copied() == quote && !ends_with_escape(&body[..body.len().saturating_sub(1)]) {
        body.pop();
    }

    let mut out = String::with_capacity(body.len());
    let mut iter = body.into_iter();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn ends_with_escape(chars: &[char]) -> bool {
    chars.iter().rev().take_while(|&&c| c == '\\').count() % 2 == 1
}
