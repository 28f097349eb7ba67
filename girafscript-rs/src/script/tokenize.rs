//! Marker tokenizer.
//!
//! Finds the next `OPEN … CLOSE` marker in a buffer and reports its raw text
//! and byte span.  It knows nothing about command names or parameters; inside
//! marker content a backslash escapes the following character so that a
//! quoted parameter can carry a literal closing delimiter.

use std::fmt;
use std::ops::Range;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use super::error::{Result, ScriptError};

const OPEN: usize = 0;
const CLOSE: usize = 1;
const ESCAPE: usize = 2;

// ── Delimiters ────────────────────────────────────────────────────────────────

/// The opening/closing delimiter pair that frames a marker.
#[derive(Clone)]
pub struct Delimiters {
    open: String,
    close: String,
    finder: AhoCorasick,
}

impl Delimiters {
    pub const DEFAULT_OPEN: &'static str = "{{";
    pub const DEFAULT_CLOSE: &'static str = "}}";

    /// Build a delimiter pair.  Both must be non-empty and free of
    /// backslashes, and neither may contain the other.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> std::result::Result<Self, String> {
        let (open, close) = (open.into(), close.into());
        if open.is_empty() || close.is_empty() {
            return Err("delimiters cannot be empty".into());
        }
        if open == close {
            return Err(format!("opening and closing delimiters are both `{open}`"));
        }
        if open.contains(close.as_str()) || close.contains(open.as_str()) {
            return Err(format!("delimiters `{open}` and `{close}` overlap"));
        }
        if open.contains('\\') || close.contains('\\') {
            return Err("delimiters cannot contain `\\`".into());
        }
        Ok(Self::build(open, close))
    }

    fn build(open: String, close: String) -> Self {
        let finder = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build([open.as_str(), close.as_str(), "\\"]);
        Delimiters { open, close, finder }
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    /// The literal closing tag for command `name`, e.g. `{{/loop}}`.
    pub fn end_tag(&self, name: &str) -> String {
        format!("{}/{}{}", self.open, name, self.close)
    }

    /// Strip the delimiters from a raw marker, if it is framed by them.
    pub fn strip<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let inner = raw.strip_prefix(self.open.as_str())?;
        inner.strip_suffix(self.close.as_str())
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::build(Self::DEFAULT_OPEN.to_owned(), Self::DEFAULT_CLOSE.to_owned())
    }
}

impl PartialEq for Delimiters {
    fn eq(&self, other: &Self) -> bool {
        self.open == other.open && self.close == other.close
    }
}

impl Eq for Delimiters {}

impl fmt::Debug for Delimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delimiters")
            .field("open", &self.open)
            .field("close", &self.close)
            .finish()
    }
}

// ── RawMarker ─────────────────────────────────────────────────────────────────

/// One marker occurrence as found in the buffer, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMarker<'a> {
    /// Full marker text, delimiters included.
    pub text: &'a str,
    /// Content between the delimiters.
    pub inner: &'a str,
    /// Byte range of `text` in the scanned buffer.
    pub span: Range<usize>,
}

// ── Scanning ──────────────────────────────────────────────────────────────────

/// Find the next marker starting at or after byte `from`.
///
/// Returns `Ok(None)` when the rest of the buffer holds no opening delimiter.
/// An opening delimiter with no closing delimiter before the end of the
/// buffer (or before another opening delimiter) is an
/// [`UnterminatedMarker`](ScriptError::UnterminatedMarker) at the offset of
/// the dangling opening delimiter.
pub fn next_marker<'a>(
    buffer: &'a str,
    from: usize,
    delims: &Delimiters,
) -> Result<Option<RawMarker<'a>>> {
    if from >= buffer.len() {
        return Ok(None);
    }
    let Some(start) = delims
        .finder
        .find_iter(&buffer[from..])
        .find(|m| m.pattern() == OPEN)
        .map(|m| from + m.start())
    else {
        return Ok(None);
    };

    let content_start = start + delims.open.len();
    let mut pos = content_start;
    loop {
        let Some(m) = delims.finder.find(&buffer[pos..]) else {
            return Err(ScriptError::UnterminatedMarker { offset: start });
        };
        match m.pattern() {
            CLOSE => {
                let end = pos + m.end();
                return Ok(Some(RawMarker {
                    text: &buffer[start..end],
                    inner: &buffer[content_start..pos + m.start()],
                    span: start..end,
                }));
            }
            ESCAPE => {
                pos += m.end();
                match buffer[pos..].chars().next() {
                    Some(c) => pos += c.len_utf8(),
                    None => return Err(ScriptError::UnterminatedMarker { offset: start }),
                }
            }
            _ => return Err(ScriptError::UnterminatedMarker { offset: start }),
        }
    }
}

/// Iterate over every marker in `buffer`, in order.
///
/// Stops after the first error.
pub fn markers<'a>(
    buffer: &'a str,
    delims: &'a Delimiters,
) -> impl Iterator<Item = Result<RawMarker<'a>>> + 'a {
    let mut cursor = Some(0);
    std::iter::from_fn(move || {
        let from = cursor?;
        match next_marker(buffer, from, delims) {
            Ok(Some(m)) => {
                cursor = Some(m.span.end);
                Some(Ok(m))
            }
            Ok(None) => {
                cursor = None;
                None
            }
            Err(e) => {
                cursor = None;
                Some(Err(e))
            }
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
