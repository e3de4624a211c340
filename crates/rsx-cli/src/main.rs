use clap::{Parser, Subcommand};
use rsx_lexer::{LineIndex, Scanner, TokenKind};
use rsx_parser::{File, Node, Parse};
use serde::Serialize;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rsx")]
#[command(about = "Inspect RSX component files: tokens, syntax trees and diagnostics")]
#[command(version)]
struct Cli {
    /// Log parser decisions to stderr; ignored when `RUST_LOG` is set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the token stream of an .rsx file
    Tokens {
        /// Input .rsx file
        path: String,

        /// Emit JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Print the syntax tree of an .rsx file
    Tree {
        /// Input .rsx file
        path: String,

        /// Emit the full tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report diagnostics; exits with status 1 if there are any
    Check {
        /// Input .rsx file
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Tokens { path, json } => cmd_tokens(&path, json),
        Command::Tree { path, json } => cmd_tree(&path, json),
        Command::Check { path } => cmd_check(&path),
    }
}

fn init_tracing(verbose: u8) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(verbose, rust_log.as_deref()))
        .init();
}

/// A usable `RUST_LOG` wins; otherwise `-v` picks the level.
fn env_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    if let Some(filter) = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return filter;
    }
    EnvFilter::new(match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    })
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => {
            debug!(path, bytes = source.len(), "read source");
            source
        }
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error encoding JSON: {e}");
            std::process::exit(1);
        }
    }
}

/// One token as printed by `rsx tokens --json`.
#[derive(Serialize)]
struct TokenRow<'a> {
    kind: TokenKind,
    start: usize,
    end: usize,
    line: usize,
    column: usize,
    text: &'a str,
}

fn cmd_tokens(path: &str, json: bool) {
    let source = read_source(path);
    let index = LineIndex::new(&source);

    let rows: Vec<TokenRow> = Scanner::tokenize(&source)
        .into_iter()
        .map(|token| {
            let (line, column) = index.line_col(token.span.start);
            TokenRow {
                kind: token.kind,
                start: token.span.start,
                end: token.span.end,
                line,
                column,
                text: token.text(&source),
            }
        })
        .collect();

    if json {
        print_json(&rows);
        return;
    }
    for row in &rows {
        println!(
            "{:>4}:{:<3} {:<22} {:?}",
            row.line,
            row.column,
            format!("{:?}", row.kind),
            row.text
        );
    }
}

fn cmd_tree(path: &str, json: bool) {
    let source = read_source(path);
    let parse = rsx_parser::Parser::parse(&source);

    if json {
        print_json(&parse);
        return;
    }

    for section in &parse.file.sections {
        let span = section.span();
        let state = if section.is_terminated() { "" } else { " (unterminated)" };
        println!("{} {}..{}{state}", section.kind().name(), span.start, span.end);
    }
    print_outline(&parse.file, &source);
    print_diagnostics(path, &source, &parse);
}

/// Indented outline of the template, one node per line.
fn print_outline(file: &File, source: &str) {
    for (depth, node) in file.nodes() {
        let indent = "  ".repeat(depth + 1);
        let label = match node {
            Node::Element(el) if el.self_closing => format!("<{} />", el.name),
            Node::Element(el) => format!("<{}>", el.name),
            Node::Text(text) => format!("{:?}", text.content),
            Node::Comment(_) => "<!-- -->".to_string(),
            Node::Interpolation(i) => {
                let body = i.expression.as_ref().map_or("", |e| e.span.text(source));
                if i.raw {
                    format!("{{{{@html {body}}}}}")
                } else {
                    format!("{{{{ {body} }}}}")
                }
            }
            Node::Directive(d) => format!("{} ({} branches)", d.kind.keyword(), d.branches.len()),
            Node::Error(span) => format!("error {:?}", span.text(source)),
        };
        println!("{indent}{label}");
    }
}

fn print_diagnostics(path: &str, source: &str, parse: &Parse) {
    let index = LineIndex::new(source);
    for diagnostic in &parse.diagnostics {
        let (line, column) = index.line_col(diagnostic.span.start);
        eprintln!(
            "{path}:{line}:{column}: {}: {}",
            diagnostic.kind, diagnostic.message
        );
    }
}

fn cmd_check(path: &str) {
    let source = read_source(path);
    let parse = rsx_parser::Parser::parse(&source);

    if parse.diagnostics.is_empty() {
        eprintln!("OK: {path} ({} lines)", LineIndex::new(&source).line_count());
        return;
    }

    print_diagnostics(path, &source, &parse);
    eprintln!("{path}: {} problem(s)", parse.diagnostics.len());
    std::process::exit(1);
}
