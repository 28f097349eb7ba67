//! Command capability set.
//!
//! Each marker occurrence the engine recognises becomes one [`Command`]: a
//! [`CommandKind`] tag plus the marker it was built from and the typed
//! parameters extracted from that marker.  Commands are single-use:
//!
//! ```text
//! Constructed ─set_marker─▶ MarkerSet ─(params ok)─▶ ParametersExtracted
//!                                                        │ invoke
//!                                                        ▼
//!                                              Invoked ─▶ Done
//! ```
//!
//! | Command   | Aliases   | Paired | Parameters                                        |
//! |-----------|-----------|--------|---------------------------------------------------|
//! | `loop`    | `foreach` | yes    | `<list> [as=] [index=]` or `<var> from= to=`      |
//! | `if`      |           | yes    | `<path>`, `!<path>`, `<path>=<value>` …           |
//! | `unless`  |           | yes    | same as `if`                                      |
//! | `var`     | `echo`    | no     | `<path> [default=] [escape=html\|none] [sep=]`    |
//! | `set`     |           | no     | `<name>=<value> …`                                |
//! | `comment` |           | yes    | none                                              |

use std::fmt;

use super::engine::Session;
use super::error::{Result, ScriptError};
use super::marker::{decode, decode_at, is_ident, is_path, Marker, MarkerKind, Param};
use super::tokenize::{markers, Delimiters};

mod cond;
mod loops;
mod set;
mod var;

use cond::CondParams;
use loops::LoopParams;
use set::SetParams;
use var::VarParams;

/// Branch separator inside `if`/`unless`.  Not a command of its own.
pub(crate) const ELSE: &str = "else";

// ── CommandKind ───────────────────────────────────────────────────────────────

/// The closed set of supported directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Loop,
    If,
    Unless,
    Var,
    Set,
    Comment,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        CommandKind::Loop,
        CommandKind::If,
        CommandKind::Unless,
        CommandKind::Var,
        CommandKind::Set,
        CommandKind::Comment,
    ];

    /// Map a lower-cased marker name (or alias) to its kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "loop" | "foreach" => Some(CommandKind::Loop),
            "if" => Some(CommandKind::If),
            "unless" => Some(CommandKind::Unless),
            "var" | "echo" => Some(CommandKind::Var),
            "set" => Some(CommandKind::Set),
            "comment" => Some(CommandKind::Comment),
            _ => None,
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Loop => "loop",
            CommandKind::If => "if",
            CommandKind::Unless => "unless",
            CommandKind::Var => "var",
            CommandKind::Set => "set",
            CommandKind::Comment => "comment",
        }
    }

    /// Whether an `{{else}}` may sit directly inside a block of this kind.
    /// A comment accepts one so that an else-branch can be commented out.
    pub fn accepts_else(self) -> bool {
        matches!(self, CommandKind::If | CommandKind::Unless | CommandKind::Comment)
    }

    /// Whether a start tag of this kind expects a matching end tag.
    pub fn is_paired(self) -> bool {
        matches!(
            self,
            CommandKind::Loop | CommandKind::If | CommandKind::Unless | CommandKind::Comment
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Lifecycle state of a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Constructed,
    MarkerSet,
    ParametersExtracted,
    Invoked,
    Done,
}

#[derive(Debug)]
enum Params {
    Loop(LoopParams),
    Cond(CondParams),
    Var(VarParams),
    Set(SetParams),
    Comment,
}

// ── Command ───────────────────────────────────────────────────────────────────

/// One live command instance, bound to one marker occurrence.
#[derive(Debug)]
pub struct Command {
    kind: CommandKind,
    marker: Option<Marker>,
    params: Option<Params>,
    state: State,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Command {
            kind,
            marker: None,
            params: None,
            state: State::Constructed,
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    /// Attach an already decoded marker and extract its parameters.
    ///
    /// End tags are never turned into live commands, and the marker must name
    /// this command (or one of its aliases).
    pub fn set_marker(&mut self, marker: Marker) -> Result<()> {
        if matches!(self.state, State::Invoked | State::Done) {
            return Err(ScriptError::AlreadyInvoked {
                command: self.kind.name().to_owned(),
            });
        }
        if marker.kind() == MarkerKind::End {
            return Err(ScriptError::InvalidMarkerKind {
                marker: marker.raw().to_owned(),
                reason: "end tags cannot start a command".into(),
            });
        }
        if CommandKind::from_name(marker.name()) != Some(self.kind) {
            return Err(ScriptError::InvalidMarkerKind {
                marker: marker.raw().to_owned(),
                reason: format!("marker does not name the `{}` command", self.kind),
            });
        }
        self.params = None;
        self.marker = Some(marker);
        self.state = State::MarkerSet;
        self.extract_params()
    }

    /// Decode `raw` (delimiters included) and attach it as with
    /// [`set_marker`](Self::set_marker).
    pub fn set_marker_text(&mut self, raw: &str, delims: &Delimiters) -> Result<()> {
        self.set_marker(decode(raw, delims)?)
    }

    fn extract_params(&mut self) -> Result<()> {
        let Some(marker) = self.marker.as_ref() else {
            return Err(no_marker(self.kind));
        };
        let params = match self.kind {
            CommandKind::Loop => Params::Loop(LoopParams::extract(marker)?),
            CommandKind::If => Params::Cond(CondParams::extract(marker, false)?),
            CommandKind::Unless => Params::Cond(CondParams::extract(marker, true)?),
            CommandKind::Var => Params::Var(VarParams::extract(marker)?),
            CommandKind::Set => Params::Set(SetParams::extract(marker)?),
            CommandKind::Comment => {
                if let Some(p) = marker.params().first() {
                    let name = match p {
                        Param::Positional(v) => v.as_str(),
                        Param::Named { key, .. } => key.as_str(),
                    };
                    return Err(ScriptError::invalid_param(
                        marker.name(),
                        name,
                        "comment takes no parameters",
                    ));
                }
                Params::Comment
            }
        };
        self.params = Some(params);
        self.state = State::ParametersExtracted;
        Ok(())
    }

    /// The exact closing tag this instance expects, or `None` when the
    /// command is single-tag (or a paired command written self-closed).
    pub fn end_marker(&self, delims: &Delimiters) -> Option<String> {
        let marker = self.marker.as_ref()?;
        (self.kind.is_paired() && marker.kind() == MarkerKind::Start)
            .then(|| delims.end_tag(marker.name()))
    }

    /// Run the command over `body` and return the replacement text.
    ///
    /// `body` is the whole captured span: the marker itself for single-tag
    /// commands, start tag through end tag for paired ones.
    pub fn invoke(&mut self, body: &str, session: &mut Session<'_>) -> Result<String> {
        match self.state {
            State::ParametersExtracted => {}
            State::Invoked | State::Done => {
                return Err(ScriptError::AlreadyInvoked {
                    command: self.kind.name().to_owned(),
                });
            }
            State::Constructed | State::MarkerSet => return Err(no_marker(self.kind)),
        }
        self.state = State::Invoked;

        let (Some(marker), Some(params)) = (self.marker.as_ref(), self.params.as_ref()) else {
            return Err(no_marker(self.kind));
        };
        let end = self.end_marker(session.delimiters());
        let inner = inner_body(marker, end.as_deref(), body, session.delimiters())?;
        let cmd = marker.name();

        let out = match params {
            Params::Loop(p) => p.invoke(cmd, inner, session)?,
            Params::Cond(p) => p.invoke(inner, session)?,
            Params::Var(p) => p.invoke(session),
            Params::Set(p) => p.invoke(session),
            Params::Comment => String::new(),
        };
        self.state = State::Done;
        Ok(out)
    }
}

fn no_marker(kind: CommandKind) -> ScriptError {
    ScriptError::InvalidMarkerKind {
        marker: String::new(),
        reason: format!("`{kind}` has no marker with valid parameters"),
    }
}

/// Strip the start tag (and the end tag, for paired commands) from `body`.
fn inner_body<'b>(
    marker: &Marker,
    end: Option<&str>,
    body: &'b str,
    delims: &Delimiters,
) -> Result<&'b str> {
    let rest = body
        .strip_prefix(marker.raw())
        .ok_or_else(|| ScriptError::InvalidMarkerKind {
            marker: marker.raw().to_owned(),
            reason: "body does not start with the command's marker".into(),
        })?;
    let Some(end) = end else {
        return Ok(rest);
    };

    let unmatched = |detail: String| ScriptError::UnmatchedEndMarker {
        offset: marker.span().start,
        detail,
    };
    let mut last = None;
    for found in markers(rest, delims) {
        last = Some(found?);
    }
    let Some(found) = last.filter(|f| f.span.end == rest.len()) else {
        return Err(unmatched(format!("`{}` is never closed by `{end}`", marker.raw())));
    };
    let closing = decode_at(&found)?;
    if closing.kind() != MarkerKind::End || delims.end_tag(closing.name()) != end {
        return Err(unmatched(format!(
            "found `{}` while expecting `{end}`",
            closing.raw()
        )));
    }
    Ok(&rest[..found.span.start])
}

// ── Parameter helpers ─────────────────────────────────────────────────────────

fn require_path(cmd: &str, param: &str, value: &str) -> Result<()> {
    if is_path(value) {
        Ok(())
    } else {
        Err(ScriptError::invalid_param(
            cmd,
            param,
            format!("`{value}` is not a variable path"),
        ))
    }
}

fn require_ident(cmd: &str, param: &str, value: &str) -> Result<()> {
    if is_ident(value) {
        Ok(())
    } else {
        Err(ScriptError::invalid_param(
            cmd,
            param,
            format!("`{value}` is not a variable name"),
        ))
    }
}

/// Reject named parameters outside `allowed` (any ASCII case).
fn check_named(marker: &Marker, allowed: &[&str]) -> Result<()> {
    match marker
        .named()
        .find(|(k, _)| !allowed.iter().any(|a| a.eq_ignore_ascii_case(k)))
    {
        Some((key, _)) => Err(ScriptError::invalid_param(
            marker.name(),
            key,
            "unknown parameter",
        )),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
