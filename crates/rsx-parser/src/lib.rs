//! RSX Parser
//!
//! Builds a section tree from the `rsx-lexer` token stream: front matter,
//! script and style as opaque code spans, and the template as a node tree
//! of elements, text, interpolations and `@if`/`@each` directives.
//! Expressions inside `{{ }}` keep their token run and, by default, an
//! expression tree.
//!
//! Parsing never fails. Problems come back as [`Diagnostic`]s next to a
//! tree that still covers the whole input.
//!
//! # Example
//!
//! ```
//! use rsx_parser::{Node, Parser};
//!
//! let parse = Parser::parse("<template><p>{{ count + 1 }}</p></template>");
//! assert!(parse.diagnostics.is_empty());
//!
//! let template = parse.file.template().unwrap();
//! assert!(matches!(template.children[0], Node::Element(_)));
//! ```

pub mod ast;
pub mod expr_parser;
pub mod parser;
pub mod stream;

pub use ast::{
    Attribute, AttributeValue, Branch, CodeSection, Directive, DirectiveHead, DirectiveKind,
    EachBinding, Element, Expr, ExprKind, Expression, File, Interpolation, Node, Section,
    SectionKind, TemplateSection, Text,
};
pub use parser::{Parse, ParseOptions, Parser};
pub use rsx_lexer::{Diagnostic, DiagnosticKind};
pub use stream::{Marker, TokenStream};
