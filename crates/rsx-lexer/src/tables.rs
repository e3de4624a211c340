//! Static classification tables.
//!
//! All sets are plain `static` slices; nothing here is mutable or
//! process-global beyond read-only data.

use serde::{Deserialize, Serialize};

use crate::token::TokenKind;

/// The sub-languages of an RSX file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Rust-like code between `---` delimiters.
    FrontMatter,
    /// TypeScript inside `<script>`.
    Script,
    /// CSS inside `<style>`.
    Style,
    /// Template markup.
    Markup,
    /// Expressions inside `{{ }}`.
    Expression,
}

/// What a word means in a given sub-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordClass {
    Keyword,
    PrimitiveType,
    BuiltinType,
    AtRule,
    VoidElement,
}

pub static RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

pub static RUST_PRIMITIVE_TYPES: &[&str] = &[
    "bool", "char", "str", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64",
    "u128", "usize", "f32", "f64",
];

pub static RUST_BUILTIN_TYPES: &[&str] = &[
    "String", "Vec", "Option", "Result", "Box", "Rc", "Arc", "HashMap", "HashSet", "BTreeMap",
    "Some", "None", "Ok", "Err",
];

pub static TS_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "break", "case", "catch", "class", "const", "continue",
    "default", "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "from", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "private", "protected", "public", "readonly", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "type", "typeof", "undefined", "var", "void",
    "while", "yield",
];

pub static TS_PRIMITIVE_TYPES: &[&str] = &[
    "any", "bigint", "boolean", "never", "number", "object", "string", "symbol", "unknown",
];

pub static TS_BUILTIN_TYPES: &[&str] = &[
    "Array", "Date", "Error", "Map", "Promise", "Record", "Partial", "Readonly", "Set", "JSON",
    "Math", "Object", "console", "window", "document",
];

pub static CSS_AT_RULES: &[&str] = &[
    "@charset", "@container", "@font-face", "@import", "@keyframes", "@layer", "@media",
    "@namespace", "@page", "@supports",
];

pub static CSS_KEYWORDS: &[&str] = &[
    "!important", "auto", "inherit", "initial", "none", "revert", "unset",
];

/// Elements that never take children or an end tag.
pub static VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Directive keywords in the order the scanner tries them. `:else if` is
/// matched separately because it spans whitespace.
pub static DIRECTIVE_KEYWORDS: &[(&str, TokenKind)] = &[
    ("@if", TokenKind::If),
    ("@each", TokenKind::Each),
    ("@html", TokenKind::Html),
    (":elseif", TokenKind::ElseIf),
    (":else", TokenKind::Else),
    ("/if", TokenKind::EndIf),
    ("/each", TokenKind::EndEach),
];

/// Expression operators, longest first so a prefix never shadows a longer match.
pub static EXPRESSION_OPERATORS: &[(&str, TokenKind)] = &[
    ("===", TokenKind::StrictEq),
    ("!==", TokenKind::StrictNotEq),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    (">=", TokenKind::GtEq),
    ("<=", TokenKind::LtEq),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    (">", TokenKind::Gt),
    ("<", TokenKind::Lt),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("!", TokenKind::Bang),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    (".", TokenKind::Dot),
    (",", TokenKind::Comma),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
];

/// Keyword folding for identifiers inside `{{ }}`.
pub fn expression_keyword(word: &str) -> Option<TokenKind> {
    match word {
        "true" | "false" => Some(TokenKind::Boolean),
        "as" => Some(TokenKind::As),
        _ => None,
    }
}

/// Void elements are matched case-insensitively, as HTML does.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Classify `word` within `language`.
///
/// ```
/// use rsx_lexer::tables::{classify_word, Language, WordClass};
///
/// assert_eq!(classify_word(Language::FrontMatter, "fn"), Some(WordClass::Keyword));
/// assert_eq!(classify_word(Language::Script, "number"), Some(WordClass::PrimitiveType));
/// assert_eq!(classify_word(Language::Markup, "br"), Some(WordClass::VoidElement));
/// assert_eq!(classify_word(Language::Style, "color"), None);
/// ```
pub fn classify_word(language: Language, word: &str) -> Option<WordClass> {
    let contains = |set: &[&str]| set.contains(&word);
    match language {
        Language::FrontMatter => {
            if contains(RUST_KEYWORDS) {
                Some(WordClass::Keyword)
            } else if contains(RUST_PRIMITIVE_TYPES) {
                Some(WordClass::PrimitiveType)
            } else if contains(RUST_BUILTIN_TYPES) {
                Some(WordClass::BuiltinType)
            } else {
                None
            }
        }
        Language::Script => {
            if contains(TS_KEYWORDS) {
                Some(WordClass::Keyword)
            } else if contains(TS_PRIMITIVE_TYPES) {
                Some(WordClass::PrimitiveType)
            } else if contains(TS_BUILTIN_TYPES) {
                Some(WordClass::BuiltinType)
            } else {
                None
            }
        }
        Language::Style => {
            if contains(CSS_AT_RULES) {
                Some(WordClass::AtRule)
            } else if contains(CSS_KEYWORDS) {
                Some(WordClass::Keyword)
            } else {
                None
            }
        }
        Language::Markup => is_void_element(word).then_some(WordClass::VoidElement),
        Language::Expression => expression_keyword(word).map(|_| WordClass::Keyword),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operators_longest_first() {
        for (i, (op, _)) in EXPRESSION_OPERATORS.iter().enumerate() {
            for (later, _) in &EXPRESSION_OPERATORS[i + 1..] {
                assert!(
                    !later.starts_with(op) || later.len() <= op.len(),
                    "{op} shadows {later}"
                );
            }
        }
    }

    #[test]
    fn test_directive_keywords_prefix_order() {
        let elseif = DIRECTIVE_KEYWORDS.iter().position(|(k, _)| *k == ":elseif");
        let else_ = DIRECTIVE_KEYWORDS.iter().position(|(k, _)| *k == ":else");
        assert!(elseif < else_);
    }

    #[test]
    fn test_void_elements_case_insensitive() {
        assert!(is_void_element("img"));
        assert!(is_void_element("BR"));
        assert!(!is_void_element("div"));
    }

    #[test]
    fn test_expression_keywords() {
        assert_eq!(expression_keyword("true"), Some(TokenKind::Boolean));
        assert_eq!(expression_keyword("as"), Some(TokenKind::As));
        assert_eq!(expression_keyword("asx"), None);
    }

    #[test]
    fn test_classify_per_language() {
        assert_eq!(classify_word(Language::FrontMatter, "u64"), Some(WordClass::PrimitiveType));
        assert_eq!(classify_word(Language::FrontMatter, "Vec"), Some(WordClass::BuiltinType));
        assert_eq!(classify_word(Language::Script, "interface"), Some(WordClass::Keyword));
        assert_eq!(classify_word(Language::Script, "Promise"), Some(WordClass::BuiltinType));
        assert_eq!(classify_word(Language::Style, "@media"), Some(WordClass::AtRule));
        assert_eq!(classify_word(Language::Expression, "false"), Some(WordClass::Keyword));
        assert_eq!(classify_word(Language::Script, "fn"), None);
    }
}
