//! WASM bindings for the RSX tokenizer and parser.
//!
//! Editor hosts call `tokenize()` incrementally: they keep the returned
//! `state` next to the offset it belongs to and pass it back to resume
//! from that point. `parse()` returns the whole tree with diagnostics.

use rsx_lexer::{classify_word, Language, LexState, Scanner, Token};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Tokens of one scanned range and where the scan stopped.
#[derive(Debug, Serialize)]
pub struct TokenBatch {
    pub tokens: Vec<Token>,
    pub state: LexState,
    pub offset: usize,
}

/// Scan `start..end` of `source` beginning in `state`.
pub fn scan(source: &str, start: usize, end: usize, state: LexState) -> TokenBatch {
    let mut scanner = Scanner::with_range(source, start..end, state);
    let tokens: Vec<Token> = scanner.by_ref().collect();
    TokenBatch {
        tokens,
        state: scanner.state(),
        offset: scanner.offset(),
    }
}

/// Tokenize `start..end` of `source`.
///
/// `state` is a state object returned by an earlier call, or `undefined`
/// to start between sections. Returns `{ tokens, state, offset }`.
///
/// `start`, `end`, `offset` and every token span are UTF-8 byte offsets,
/// not the UTF-16 indices JS strings use. Offsets inside a multi-byte
/// character are moved back to its first byte. Hosts with non-ASCII text
/// convert at their side, for example by encoding with `TextEncoder`.
#[wasm_bindgen]
pub fn tokenize(source: &str, start: usize, end: usize, state: JsValue) -> Result<JsValue, JsError> {
    let state: LexState = if state.is_undefined() || state.is_null() {
        LexState::default()
    } else {
        serde_wasm_bindgen::from_value(state).map_err(|e| JsError::new(&e.to_string()))?
    };

    let batch = scan(source, start, end, state);

    let js_obj = js_sys::Object::new();
    let set = |key: &str, value: JsValue| {
        js_sys::Reflect::set(&js_obj, &key.into(), &value)
            .map_err(|_| JsError::new(&format!("Failed to set {key} property")))
    };
    set("tokens", to_js(&batch.tokens)?)?;
    set("state", to_js(&batch.state)?)?;
    set("offset", JsValue::from(batch.offset as u32))?;

    Ok(js_obj.into())
}

/// Parse a whole file. Returns `{ file, diagnostics }`, with spans in
/// UTF-8 byte offsets as for [`tokenize`].
#[wasm_bindgen]
pub fn parse(source: &str) -> Result<JsValue, JsError> {
    to_js(&rsx_parser::Parser::parse(source))
}

/// Classify `word` in one of the sub-languages (`"FrontMatter"`,
/// `"Script"`, `"Style"`, `"Markup"`, `"Expression"`), for highlighting.
#[wasm_bindgen]
pub fn classify(language: JsValue, word: &str) -> Result<JsValue, JsError> {
    let language: Language =
        serde_wasm_bindgen::from_value(language).map_err(|e| JsError::new(&e.to_string()))?;
    to_js(&classify_word(language, word))
}

/// Get the crate version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsError::new(&e.to_string()))
}
