//! Marker decoder.
//!
//! Turns raw marker text (`{{loop messages as=msg}}`) into a [`Marker`]: a
//! lower-cased command name, an ordered list of [`Param`]s and a
//! [`MarkerKind`].
//!
//! | Content shape            | Result                                        |
//! |--------------------------|-----------------------------------------------|
//! | `name a b`               | start tag, positional `a`, `b`                |
//! | `name key=value`         | named parameter `key` → `value`               |
//! | `name key="two words"`   | quotes (`"` or `'`) group whitespace          |
//! | `name a\ b`              | backslash escapes the next character          |
//! | `name a /`, `name a/`    | self-contained tag                            |
//! | `/name`                  | end tag (no parameters allowed)               |

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::error::{Result, ScriptError};
use super::tokenize::{Delimiters, RawMarker};

// ── Public types ──────────────────────────────────────────────────────────────

/// Whether a marker opens a block, stands alone, or closes a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `{{name …}}`, may expect a matching end tag.
    Start,
    /// `{{name … /}}`, never has an end tag.
    SelfClosing,
    /// `{{/name}}`
    End,
}

/// One marker parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Positional(String),
    Named { key: String, value: String },
}

/// A decoded marker occurrence.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    raw: String,
    name: String,
    params: Vec<Param>,
    span: Range<usize>,
    kind: MarkerKind,
}

impl Marker {
    /// Full marker text, delimiters included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lower-cased command name (without the `/` of an end tag).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Byte range of the marker in the buffer it was scanned from.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    /// Positional parameters, in order.
    pub fn positional(&self) -> impl Iterator<Item = &str> {
        self.params.iter().filter_map(|p| match p {
            Param::Positional(v) => Some(v.as_str()),
            Param::Named { .. } => None,
        })
    }

    /// Named parameters, in order.
    pub fn named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().filter_map(|p| match p {
            Param::Named { key, value } => Some((key.as_str(), value.as_str())),
            Param::Positional(_) => None,
        })
    }

    /// Value of the last occurrence of option `key`, compared without
    /// regard to ASCII case.
    pub fn get_named(&self, key: &str) -> Option<&str> {
        self.named()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
            .last()
    }
}

// ── Names ─────────────────────────────────────────────────────────────────────

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*$").expect("path pattern compiles")
    })
}

/// `name` or `name.child.0`.
pub(crate) fn is_path(s: &str) -> bool {
    path_re().is_match(s)
}

/// A plain variable name (a path with no dots).
pub(crate) fn is_ident(s: &str) -> bool {
    !s.contains('.') && is_path(s)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode a complete marker string (delimiters included).
///
/// The resulting marker's span covers `0..raw.len()`.
pub fn decode(raw: &str, delims: &Delimiters) -> Result<Marker> {
    let inner = delims
        .strip(raw)
        .ok_or_else(|| ScriptError::malformed(raw, "not framed by marker delimiters"))?;
    decode_parts(raw, inner, 0..raw.len())
}

/// Decode a marker found by the tokenizer, keeping its buffer span.
pub fn decode_at(found: &RawMarker<'_>) -> Result<Marker> {
    decode_parts(found.text, found.inner, found.span.clone())
}

fn decode_parts(raw: &str, inner: &str, span: Range<usize>) -> Result<Marker> {
    let mut tokens = split_tokens(inner).map_err(|reason| ScriptError::malformed(raw, reason))?;

    // Self-closing indicator: a bare trailing `/` token or a `/` glued to the
    // last token.
    let many = tokens.len() > 1;
    let mut self_closing = false;
    let mut drop_last = false;
    if let Some(last) = tokens.last_mut().filter(|t| !t.quoted) {
        if last.text == "/" && many {
            drop_last = true;
        } else if last.text.len() > 1 && last.text.ends_with('/') {
            last.text.pop();
            self_closing = true;
        }
    }
    if drop_last {
        tokens.pop();
        self_closing = true;
    }

    let mut tokens = tokens.into_iter();
    let Some(head) = tokens.next() else {
        return Err(ScriptError::malformed(raw, "empty marker"));
    };
    if head.quoted {
        return Err(ScriptError::malformed(raw, "command name cannot be quoted"));
    }

    let (name, is_end) = match head.text.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (head.text.as_str(), false),
    };
    if name.is_empty() {
        return Err(ScriptError::malformed(raw, "missing command name"));
    }
    let name = name.to_ascii_lowercase();

    let mut params = Vec::new();
    for tok in tokens {
        params.push(match tok.eq_at {
            Some(0) => return Err(ScriptError::malformed(raw, "named parameter without a key")),
            Some(i) if !is_path(&tok.text[..i]) => {
                return Err(ScriptError::malformed(
                    raw,
                    format!("`{}` is not a parameter name", &tok.text[..i]),
                ));
            }
            Some(i) => Param::Named {
                key: tok.text[..i].to_owned(),
                value: tok.text[i + 1..].to_owned(),
            },
            None => Param::Positional(tok.text),
        });
    }

    let kind = match (is_end, self_closing) {
        (true, true) => {
            return Err(ScriptError::malformed(raw, "end tag cannot be self-closing"));
        }
        (true, false) if !params.is_empty() => {
            return Err(ScriptError::malformed(raw, "end tag takes no parameters"));
        }
        (true, false) => MarkerKind::End,
        (false, true) => MarkerKind::SelfClosing,
        (false, false) => MarkerKind::Start,
    };

    Ok(Marker {
        raw: raw.to_owned(),
        name,
        params,
        span,
        kind,
    })
}

// ── Token splitter ────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Token {
    /// Unquoted, unescaped text.
    text: String,
    /// Byte index in `text` of the first `=` that was neither quoted nor
    /// escaped.
    eq_at: Option<usize>,
    /// Whether any part of the token was quoted.
    quoted: bool,
}

/// Split marker content into whitespace-delimited tokens, honouring `"…"` and
/// `'…'` quoting and backslash escapes.
fn split_tokens(s: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut cur: Option<Token> = None;
    let mut quote: Option<char> = None;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let escaped = chars.next().ok_or("dangling `\\` at end of marker")?;
                start(&mut cur).text.push(escaped);
            }
            q if quote == Some(q) => quote = None,
            '"' | '\'' if quote.is_none() => {
                quote = Some(ch);
                start(&mut cur).quoted = true;
            }
            c if c.is_whitespace() && quote.is_none() => {
                if let Some(tok) = cur.take() {
                    tokens.push(tok);
                }
            }
            '=' if quote.is_none() => {
                let tok = start(&mut cur);
                if tok.eq_at.is_none() {
                    tok.eq_at = Some(tok.text.len());
                }
                tok.text.push('=');
            }
            c => start(&mut cur).text.push(c),
        }
    }
    if let Some(q) = quote {
        return Err(format!("unclosed {q} quote"));
    }
    if let Some(tok) = cur {
        tokens.push(tok);
    }
    Ok(tokens)
}

fn start(cur: &mut Option<Token>) -> &mut Token {
    cur.get_or_insert_with(|| Token {
        text: String::new(),
        eq_at: None,
        quoted: false,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
