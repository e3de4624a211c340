//! Syntax tree for RSX files.
//!
//! Contains the section-level tree (front matter, script, template, style),
//! the template node tree (elements, text, interpolations, directives) and
//! the expression tree built from `{{ }}` token runs.
//!
//! Every node keeps the byte span it was built from; opaque sections keep
//! only spans, never copies of their code.

use std::cell::Cell;

use rsx_lexer::{Span, Token, TokenKind};
use serde::{ser, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// A complete RSX file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    /// Sections in document order, duplicates included.
    pub sections: Vec<Section>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    FrontMatter,
    Script,
    Template,
    Style,
}

impl SectionKind {
    pub fn name(self) -> &'static str {
        match self {
            SectionKind::FrontMatter => "front matter",
            SectionKind::Script => "script",
            SectionKind::Template => "template",
            SectionKind::Style => "style",
        }
    }
}

/// One top-level region of the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Section {
    /// `--- ... ---`
    FrontMatter(CodeSection),
    /// `<script> ... </script>`
    Script(CodeSection),
    /// `<template> ... </template>`
    Template(TemplateSection),
    /// `<style> ... </style>`
    Style(CodeSection),
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::FrontMatter(_) => SectionKind::FrontMatter,
            Section::Script(_) => SectionKind::Script,
            Section::Template(_) => SectionKind::Template,
            Section::Style(_) => SectionKind::Style,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Section::FrontMatter(s) | Section::Script(s) | Section::Style(s) => s.span,
            Section::Template(t) => t.span,
        }
    }

    /// Whether the closing delimiter was found.
    pub fn is_terminated(&self) -> bool {
        match self {
            Section::FrontMatter(s) | Section::Script(s) | Section::Style(s) => s.close.is_some(),
            Section::Template(t) => t.close.is_some(),
        }
    }
}

/// A section whose payload is opaque code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeSection {
    pub open: Span,
    /// The code between the delimiters. Empty when there is none.
    pub content: Span,
    pub close: Option<Span>,
    pub span: Span,
}

/// The `<template>` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSection {
    pub open: Span,
    pub children: Vec<Node>,
    pub close: Option<Span>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Template nodes
// ---------------------------------------------------------------------------

/// A template node.
///
/// Dropping and serializing never recurse once per nesting level; see the
/// impls at the end of this module.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element, possibly with children.
    Element(Element),

    /// Text content. Runs separated only by whitespace are merged.
    Text(Text),

    /// A `<!-- ... -->` comment.
    Comment(Span),

    /// `{{ expr }}` or `{{@html expr}}`.
    Interpolation(Interpolation),

    /// `{{@if}}` or `{{@each}}` block.
    Directive(Directive),

    /// Tokens that fit nowhere, such as an end tag with no start tag.
    Error(Span),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(el) => el.span,
            Node::Text(text) => text.span,
            Node::Comment(span) | Node::Error(span) => *span,
            Node::Interpolation(i) => i.span,
            Node::Directive(d) => d.span,
        }
    }

    /// Direct children, across all branches of a directive.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Element(el) => el.children.iter().collect(),
            Node::Directive(d) => d.branches.iter().flat_map(|b| &b.children).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub content: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// `<name ...>` including the closing `>` when present.
    pub start_tag: Span,
    pub end_tag: Option<Span>,
    pub self_closing: bool,
    pub span: Span,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// `name`, `name=value`, `name="value"` or `name={{ expr }}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: Option<AttributeValue>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeValue {
    /// Source text, quotes included.
    pub raw: String,
    /// Parsed contents of a `{{ ... }}` value.
    pub expression: Option<Expression>,
    pub span: Span,
}

impl AttributeValue {
    /// The value with surrounding quotes removed.
    pub fn unquoted(&self) -> &str {
        let raw = self.raw.as_str();
        for quote in ['"', '\''] {
            if let Some(inner) = raw.strip_prefix(quote) {
                return inner.strip_suffix(quote).unwrap_or(inner);
            }
        }
        raw
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpolation {
    /// `{{@html ...}}` inserts markup unescaped.
    pub raw: bool,
    pub expression: Option<Expression>,
    pub span: Span,
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DirectiveKind {
    If,
    Each,
}

impl DirectiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::If => "@if",
            DirectiveKind::Each => "@each",
        }
    }

    pub fn closer(self) -> &'static str {
        match self {
            DirectiveKind::If => "/if",
            DirectiveKind::Each => "/each",
        }
    }
}

/// A block directive. `@if` has one branch per `@if`/`:else if`/`:else`
/// head; `@each` always has exactly one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub branches: Vec<Branch>,
    /// The `{{/if}}` or `{{/each}}` tag.
    pub close: Option<Span>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub head: DirectiveHead,
    pub children: Vec<Node>,
}

/// The `{{keyword ...}}` tag opening a branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveHead {
    pub keyword: TokenKind,
    pub expression: Option<Expression>,
    pub binding: Option<EachBinding>,
    pub span: Span,
}

/// `as item` or `as item, index` in an `@each` head.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EachBinding {
    pub item: String,
    pub index: Option<String>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An expression as written: the flat token run, plus a tree when one was
/// requested and the run parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub tokens: Vec<Token>,
    pub tree: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    /// Numeric literal: `42`, `3.14`
    Number(f64),

    /// String literal with escapes resolved: `"hello"`, `'world'`
    String(String),

    /// Boolean literal: `true`, `false`
    Boolean(bool),

    /// Identifier: `count`, `$store`
    Identifier(String),

    /// Binary operation: `a + b`, `count > 0`
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Unary operation: `!active`, `-count`
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Member access: `user.name`, `items[0]`
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },

    /// Function call: `format(date)`
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },

    /// Ternary: `count > 0 ? 'yes' : 'no'`
    Ternary {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    StrictEq,
    StrictNeq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<BinaryOp> {
        Some(match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Neq,
            TokenKind::StrictEq => BinaryOp::StrictEq,
            TokenKind::StrictNotEq => BinaryOp::StrictNeq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::LtEq => BinaryOp::Lte,
            TokenKind::GtEq => BinaryOp::Gte,
            TokenKind::AndAnd => BinaryOp::And,
            TokenKind::OrOr => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::StrictEq | BinaryOp::StrictNeq => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Lte | BinaryOp::Gte => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

impl Node {
    /// Move the direct children of `self` into `out`.
    fn take_children(&mut self, out: &mut Vec<Node>) {
        match self {
            Node::Element(el) => out.append(&mut el.children),
            Node::Directive(d) => {
                for branch in &mut d.branches {
                    out.append(&mut branch.children);
                }
            }
            _ => {}
        }
    }
}

/// Children are unhooked onto a heap stack first, so each node drops
/// childless and teardown depth stays constant.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.take_children(&mut pending);
        }
    }
}

impl ExprKind {
    /// Move the operands of `self` into `out`, leaving a leaf behind.
    fn take_operands(&mut self, out: &mut Vec<Expr>) {
        match std::mem::replace(self, ExprKind::Boolean(false)) {
            ExprKind::Binary { left, right, .. } => out.extend([*left, *right]),
            ExprKind::Unary { operand, .. } => out.push(*operand),
            ExprKind::Member {
                object, property, ..
            } => out.extend([*object, *property]),
            ExprKind::Call { callee, arguments } => {
                out.push(*callee);
                out.extend(arguments);
            }
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => out.extend([*condition, *consequent, *alternate]),
            _ => {}
        }
    }
}

/// Binary chains are left-deep, one level per operator, so teardown
/// works from a heap stack like [`Node`]'s.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.kind.take_operands(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.kind.take_operands(&mut pending);
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Deepest tree serialization will walk, template and expression levels
/// counted together. Deeper trees fail with an error instead of
/// overflowing the stack.
pub const MAX_SERIALIZE_DEPTH: usize = 256;

thread_local! {
    static SERIALIZE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One level of serializer nesting, released on drop.
struct DepthGuard;

impl DepthGuard {
    fn enter<E: ser::Error>() -> Result<DepthGuard, E> {
        SERIALIZE_DEPTH.with(|depth| {
            if depth.get() >= MAX_SERIALIZE_DEPTH {
                return Err(E::custom(format!(
                    "tree nests deeper than {MAX_SERIALIZE_DEPTH} levels"
                )));
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        SERIALIZE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Serialize)]
#[serde(rename = "Node")]
enum NodeRepr<'a> {
    Element(&'a Element),
    Text(&'a Text),
    Comment(&'a Span),
    Interpolation(&'a Interpolation),
    Directive(&'a Directive),
    Error(&'a Span),
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let _level = DepthGuard::enter::<S::Error>()?;
        let repr = match self {
            Node::Element(el) => NodeRepr::Element(el),
            Node::Text(text) => NodeRepr::Text(text),
            Node::Comment(span) => NodeRepr::Comment(span),
            Node::Interpolation(i) => NodeRepr::Interpolation(i),
            Node::Directive(d) => NodeRepr::Directive(d),
            Node::Error(span) => NodeRepr::Error(span),
        };
        repr.serialize(serializer)
    }
}

#[derive(Serialize)]
#[serde(rename = "Expr")]
struct ExprRepr<'a> {
    kind: &'a ExprKind,
    span: Span,
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let _level = DepthGuard::enter::<S::Error>()?;
        ExprRepr {
            kind: &self.kind,
            span: self.span,
        }
        .serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

impl File {
    /// The first section of `kind`.
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind() == kind)
    }

    /// Top-level nodes of the first template section.
    pub fn template(&self) -> Option<&TemplateSection> {
        self.sections.iter().find_map(|s| match s {
            Section::Template(t) => Some(t),
            _ => None,
        })
    }

    /// Every template node in document order, with its nesting depth.
    ///
    /// Walks with an explicit stack, so arbitrarily deep trees are fine.
    pub fn nodes(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &Node)> = Vec::new();
        for section in self.sections.iter().rev() {
            if let Section::Template(t) = section {
                stack.extend(t.children.iter().rev().map(|n| (0, n)));
            }
        }
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            stack.extend(node.children().into_iter().rev().map(|n| (depth + 1, n)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(content: &str, start: usize) -> Node {
        Node::Text(Text {
            content: content.to_string(),
            span: Span::new(start, start + content.len()),
        })
    }

    #[test]
    fn test_unquoted_value() {
        let value = |raw: &str| AttributeValue {
            raw: raw.to_string(),
            expression: None,
            span: Span::default(),
        };
        assert_eq!(value("\"a b\"").unquoted(), "a b");
        assert_eq!(value("'x'").unquoted(), "x");
        assert_eq!(value("plain").unquoted(), "plain");
        assert_eq!(value("\"open").unquoted(), "open");
    }

    #[test]
    fn test_binary_precedence_order() {
        assert!(BinaryOp::Or.precedence() < BinaryOp::And.precedence());
        assert!(BinaryOp::And.precedence() < BinaryOp::StrictEq.precedence());
        assert!(BinaryOp::Eq.precedence() < BinaryOp::Lte.precedence());
        assert!(BinaryOp::Gt.precedence() < BinaryOp::Add.precedence());
        assert!(BinaryOp::Sub.precedence() < BinaryOp::Mod.precedence());
        assert_eq!(BinaryOp::from_token(TokenKind::Comma), None);
    }

    /// Helper: `depth` elements nested inside each other around one text node.
    fn nested_elements(depth: usize) -> Node {
        let mut node = text("x", 0);
        for _ in 0..depth {
            node = Node::Element(Element {
                name: "div".into(),
                attributes: vec![],
                children: vec![node],
                start_tag: Span::default(),
                end_tag: None,
                self_closing: false,
                span: Span::default(),
            });
        }
        node
    }

    /// Helper: `a + a + ...` as the left-deep tree the parser builds.
    fn chain(terms: usize) -> Expr {
        let leaf = || Expr {
            kind: ExprKind::Identifier("a".into()),
            span: Span::default(),
        };
        let mut expr = leaf();
        for _ in 1..terms {
            expr = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(expr),
                    op: BinaryOp::Add,
                    right: Box::new(leaf()),
                },
                span: Span::default(),
            };
        }
        expr
    }

    #[test]
    fn test_deep_node_tree_drops() {
        let node = nested_elements(100_000);
        assert_eq!(node.children().len(), 1);
        drop(node);
    }

    #[test]
    fn test_long_binary_chain_drops() {
        let expr = chain(200_000);
        assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
        drop(expr);
    }

    #[test]
    fn test_serialize_refuses_deep_trees() {
        let err = serde_json::to_string(&nested_elements(MAX_SERIALIZE_DEPTH + 10)).unwrap_err();
        assert!(err.to_string().contains("nests deeper"), "{err}");
        let err = serde_json::to_string(&chain(MAX_SERIALIZE_DEPTH + 10)).unwrap_err();
        assert!(err.to_string().contains("nests deeper"), "{err}");

        // The depth count unwinds with the error.
        let json = serde_json::to_string(&nested_elements(2)).unwrap();
        assert!(json.starts_with(r#"{"Element":{"name":"div""#), "{json}");
        assert!(serde_json::to_string(&chain(MAX_SERIALIZE_DEPTH - 1)).is_ok());
    }

    #[test]
    fn test_nodes_preorder_with_depth() {
        let inner = Element {
            name: "p".into(),
            attributes: vec![],
            children: vec![text("hi", 8)],
            start_tag: Span::new(5, 8),
            end_tag: None,
            self_closing: false,
            span: Span::new(5, 10),
        };
        let file = File {
            sections: vec![Section::Template(TemplateSection {
                open: Span::new(0, 5),
                children: vec![Node::Element(inner), text("after", 10)],
                close: None,
                span: Span::new(0, 15),
            })],
            span: Span::new(0, 15),
        };
        let outline: Vec<(usize, Span)> = file.nodes().iter().map(|(d, n)| (*d, n.span())).collect();
        assert_eq!(
            outline,
            vec![(0, Span::new(5, 10)), (1, Span::new(8, 10)), (0, Span::new(10, 15))]
        );
        assert!(file.template().is_some());
        assert!(file.section(SectionKind::Style).is_none());
    }
}
