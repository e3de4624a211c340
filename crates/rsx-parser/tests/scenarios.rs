//! End-to-end behavior of scanner and parser on whole files.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rsx_lexer::{Category, Scanner, TokenKind};
use rsx_parser::{DiagnosticKind, DirectiveKind, Node, Parse, Parser, Section, SectionKind};

fn significant(source: &str) -> Vec<(TokenKind, &str)> {
    Scanner::tokenize(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
        .map(|t| (t.kind, t.text(source)))
        .collect()
}

fn template_children(parse: &Parse) -> &[Node] {
    &parse.file.template().expect("template section").children
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_front_matter_only() {
    let source = "---\nfoo\n---";
    assert_eq!(
        significant(source),
        vec![
            (TokenKind::FrontMatterDelimiter, "---"),
            (TokenKind::FrontMatterCode, "\nfoo\n"),
            (TokenKind::FrontMatterDelimiter, "---"),
        ]
    );

    let parse = Parser::parse(source);
    assert!(parse.diagnostics.is_empty());
    assert_eq!(parse.file.sections.len(), 1);
    let Section::FrontMatter(front) = &parse.file.sections[0] else {
        panic!("expected front matter");
    };
    assert_eq!(front.content.text(source), "\nfoo\n");
}

#[test]
fn test_div_with_text() {
    let parse = Parser::parse("<template><div>hi</div></template>");
    assert!(parse.diagnostics.is_empty());
    let children = template_children(&parse);
    assert_eq!(children.len(), 1);
    let Node::Element(div) = &children[0] else {
        panic!("expected element");
    };
    assert_eq!(div.name, "div");
    assert!(matches!(&div.children[..], [Node::Text(t)] if t.content == "hi"));
}

#[test]
fn test_if_branch() {
    let parse = Parser::parse("<template>{{@if a}}x{{/if}}</template>");
    assert!(parse.diagnostics.is_empty());
    let Node::Directive(d) = &template_children(&parse)[0] else {
        panic!("expected directive");
    };
    assert_eq!(d.kind, DirectiveKind::If);
    assert_eq!(d.branches.len(), 1);
    let head = &d.branches[0].head;
    assert_eq!(head.expression.as_ref().map(|e| e.tokens.len()), Some(1));
    assert!(matches!(&d.branches[0].children[..], [Node::Text(t)] if t.content == "x"));
    assert!(d.close.is_some());
}

#[test]
fn test_missing_end_if() {
    let source = "<template>{{@if a}}x</template>";
    let parse = Parser::parse(source);
    assert_eq!(parse.diagnostics.len(), 1);
    let diagnostic = &parse.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::UnterminatedDirective);
    assert_eq!(diagnostic.category(), Category::UnterminatedConstruct);

    let Node::Directive(d) = &template_children(&parse)[0] else {
        panic!("expected directive");
    };
    assert_eq!(d.close, None);
    assert_eq!(d.span.end, source.len() - "</template>".len());
    assert!(parse.file.sections[0].is_terminated());
}

#[test]
fn test_self_closing_img() {
    let source = "<template><img src=\"a.png\" /></template>";
    assert!(significant(source).contains(&(TokenKind::SelfClose, "/>")));

    let parse = Parser::parse(source);
    assert!(parse.diagnostics.is_empty());
    let Node::Element(img) = &template_children(&parse)[0] else {
        panic!("expected element");
    };
    assert!(img.self_closing);
    assert_eq!(img.attributes.len(), 1);
    assert_eq!(img.attributes[0].name, "src");
    let value = img.attributes[0].value.as_ref().expect("value");
    assert_eq!(value.raw, "\"a.png\"");
    assert_eq!(value.unquoted(), "a.png");
}

#[test]
fn test_expression_run() {
    let parse = Parser::parse("<template>{{ a > b && c <= d }}</template>");
    assert!(parse.diagnostics.is_empty());
    let Node::Interpolation(interp) = &template_children(&parse)[0] else {
        panic!("expected interpolation");
    };
    let expression = interp.expression.as_ref().expect("expression");
    let kinds: Vec<TokenKind> = expression.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier,
            TokenKind::Gt,
            TokenKind::Identifier,
            TokenKind::AndAnd,
            TokenKind::Identifier,
            TokenKind::LtEq,
            TokenKind::Identifier,
        ]
    );
    assert!(expression.tree.is_some());
}

// =============================================================================
// Whole components
// =============================================================================

const COMPONENT: &str = r##"---
let title = "Todos --- today";
let raw = r#"</template>"#;
---
<script lang="ts">
  const items: string[] = [];
</script>

<template>
  <h1 class="title">{{ title }}</h1>
  <!-- list -->
  <ul>
    {{@each items as item, i}}
      <li data-index={{ i }}>{{ item.label ? item.label : 'untitled' }}</li>
    {{/each}}
  </ul>
  {{@if items.length === 0}}
    <p>Nothing to do</p>
  {{:else}}
    <button disabled>Clear</button>
  {{/if}}
  {{@html footer}}
</template>

<style>
  .title { color: red; }
</style>
"##;

#[test]
fn test_component_has_no_diagnostics() {
    let parse = Parser::parse(COMPONENT);
    assert!(parse.diagnostics.is_empty(), "{:?}", parse.diagnostics);
    let kinds: Vec<SectionKind> = parse.file.sections.iter().map(Section::kind).collect();
    assert_eq!(
        kinds,
        vec![
            SectionKind::FrontMatter,
            SectionKind::Script,
            SectionKind::Template,
            SectionKind::Style
        ]
    );
}

#[test]
fn test_component_outline() {
    let parse = Parser::parse(COMPONENT);
    let outline: Vec<(usize, String)> = parse
        .file
        .nodes()
        .into_iter()
        .map(|(depth, node)| {
            let label = match node {
                Node::Element(el) => el.name.clone(),
                Node::Text(t) => format!("'{}'", t.content),
                Node::Comment(_) => "comment".to_string(),
                Node::Interpolation(i) if i.raw => "html".to_string(),
                Node::Interpolation(_) => "{{}}".to_string(),
                Node::Directive(d) => d.kind.keyword().to_string(),
                Node::Error(_) => "error".to_string(),
            };
            (depth, label)
        })
        .collect();

    let expected: Vec<(usize, &str)> = vec![
        (0, "h1"),
        (1, "{{}}"),
        (0, "comment"),
        (0, "ul"),
        (1, "@each"),
        (2, "li"),
        (3, "{{}}"),
        (0, "@if"),
        (1, "p"),
        (2, "'Nothing to do'"),
        (1, "button"),
        (2, "'Clear'"),
        (0, "html"),
    ];
    let expected: Vec<(usize, String)> = expected.into_iter().map(|(d, s)| (d, s.to_string())).collect();
    assert_eq!(outline, expected);
}

#[test]
fn test_unclosed_string_in_front_matter_keeps_later_sections() {
    let parse = Parser::parse("---\nlet s = \"oops;\n---\n<template><div>hi</div></template>");
    let kinds: Vec<SectionKind> = parse.file.sections.iter().map(Section::kind).collect();
    assert_eq!(kinds, vec![SectionKind::FrontMatter, SectionKind::Template]);
    assert!(parse.diagnostics.is_empty(), "{:?}", parse.diagnostics);
    assert!(matches!(&template_children(&parse)[..], [Node::Element(div)] if div.name == "div"));
}

#[test]
fn test_sections_do_not_overlap() {
    let parse = Parser::parse(COMPONENT);
    let spans: Vec<_> = parse.file.sections.iter().map(Section::span).collect();
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start, "{pair:?}");
    }
    for section in &parse.file.sections {
        assert!(section.is_terminated());
    }
}

// =============================================================================
// Directive balance
// =============================================================================

mod strategies {
    use proptest::prelude::*;

    fn piece() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("{{@if a}}"),
            Just("{{@each xs as x}}"),
            Just("{{:else if b}}"),
            Just("{{:else}}"),
            Just("{{/if}}"),
            Just("{{/each}}"),
            Just("<div>"),
            Just("</div>"),
            Just("<br>"),
            Just("text"),
            Just("{{ v }}"),
        ]
    }

    pub fn template() -> impl Strategy<Value = String> {
        prop::collection::vec(piece(), 0..24)
            .prop_map(|pieces| format!("<template>{}</template>", pieces.concat()))
    }
}

proptest! {
    #[test]
    fn test_directive_balance(source in strategies::template()) {
        let tokens = Scanner::tokenize(&source);
        let opened = tokens.iter().filter(|t| matches!(t.kind, TokenKind::If | TokenKind::Each)).count();
        let closers = tokens.iter().filter(|t| matches!(t.kind, TokenKind::EndIf | TokenKind::EndEach)).count();

        let parse = Parser::parse(&source);
        let directives: Vec<_> = parse
            .file
            .nodes()
            .into_iter()
            .filter_map(|(_, node)| match node {
                Node::Directive(d) => Some(d),
                _ => None,
            })
            .collect();
        let closed = directives.iter().filter(|d| d.close.is_some()).count();
        let left_open = directives.len() - closed;
        let count = |kind: DiagnosticKind| parse.diagnostics.iter().filter(|d| d.kind == kind).count();

        // Every push is popped by a closer or at the end of the section.
        prop_assert_eq!(directives.len(), opened);
        prop_assert_eq!(count(DiagnosticKind::UnterminatedDirective), left_open);
        // Closers that closed nothing were reported.
        prop_assert!(closers - closed <= count(DiagnosticKind::MismatchedDirectiveClose));
        prop_assert!(parse
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::MismatchedDirectiveClose)
            .all(|d| d.category() == Category::StructuralMismatch));
    }

    #[test]
    fn test_parse_is_total(source in any::<String>()) {
        let parse = Parser::parse(&source);
        prop_assert_eq!(parse.file.span.end, source.len());
        for diagnostic in &parse.diagnostics {
            prop_assert!(diagnostic.span.end <= source.len());
        }
    }
}
