//! RSX Lexer
//!
//! Tokenizes `.rsx` files: a `---` front-matter block, a `<script>` block,
//! a `<template>` block with markup, `{{ }}` interpolations and directives,
//! and a `<style>` block. The scanner is a mode machine whose whole state is
//! a small [`LexState`] value, so a host can stop at any token and resume
//! later with identical results.
//!
//! # Example
//!
//! ```
//! use rsx_lexer::{Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("");
//! assert_eq!(tokens.len(), 1); // Just EOF
//! assert_eq!(tokens[0].kind, TokenKind::Eof);
//! ```

pub mod cursor;
pub mod diagnostic;
pub mod line_index;
pub mod scanner;
pub mod tables;
pub mod token;

pub use diagnostic::{lexical_anomaly, Category, Diagnostic, DiagnosticKind};
pub use line_index::LineIndex;
pub use scanner::Scanner;
pub use tables::{classify_word, is_void_element, Language, WordClass};
pub use token::{LexState, Mode, Span, Token, TokenKind};
