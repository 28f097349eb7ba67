//! `if` / `unless`: keep one of two branches.
//!
//! Every parameter is a test and all tests must hold:
//!
//! | Parameter        | Holds when                                           |
//! |------------------|------------------------------------------------------|
//! | `path`           | `path` is bound and truthy                           |
//! | `!path`          | `path` is unbound or falsy                           |
//! | `path=value`     | `path` is bound and renders exactly as `value`       |
//!
//! An `{{else}}` at nesting depth zero splits the body into the then- and
//! else-branches.  The chosen branch is returned unexpanded; the engine
//! re-scans it in the caller's scope.

use super::{require_path, ELSE};
use crate::script::context::Context;
use crate::script::engine::Session;
use crate::script::error::{Result, ScriptError};
use crate::script::marker::{decode_at, Marker, MarkerKind, Param};
use crate::script::tokenize::markers;

#[derive(Debug)]
enum Test {
    Truthy { path: String, negate: bool },
    Equals { path: String, value: String },
}

impl Test {
    fn holds(&self, ctx: &Context) -> bool {
        match self {
            Test::Truthy { path, negate } => {
                ctx.resolve(path).is_some_and(|v| v.as_bool()) != *negate
            }
            Test::Equals { path, value } => ctx.resolve(path).is_some_and(|v| v.to_string() == *value),
        }
    }
}

#[derive(Debug)]
pub(super) struct CondParams {
    tests: Vec<Test>,
    negate: bool,
}

impl CondParams {
    pub(super) fn extract(marker: &Marker, negate: bool) -> Result<Self> {
        let cmd = marker.name();
        let mut tests = Vec::new();
        for param in marker.params() {
            let test = match param {
                Param::Positional(p) => {
                    let (path, negate) = match p.strip_prefix('!') {
                        Some(rest) => (rest, true),
                        None => (p.as_str(), false),
                    };
                    require_path(cmd, p, path)?;
                    Test::Truthy { path: path.to_owned(), negate }
                }
                Param::Named { key, value } => {
                    require_path(cmd, key, key)?;
                    Test::Equals { path: key.clone(), value: value.clone() }
                }
            };
            tests.push(test);
        }
        if tests.is_empty() {
            return Err(ScriptError::missing(cmd, "condition"));
        }
        Ok(CondParams { tests, negate })
    }

    pub(super) fn invoke(&self, body: &str, session: &mut Session<'_>) -> Result<String> {
        let (then_branch, else_branch) = split_else(body, session)?;
        let holds = self.tests.iter().all(|t| t.holds(session.context()));
        let branch = if holds != self.negate { then_branch } else { else_branch };
        Ok(branch.to_owned())
    }
}

/// Split `body` at the first `{{else}}` that is not inside a nested paired
/// block.  Without one, the else-branch is empty.
fn split_else<'b>(body: &'b str, session: &Session<'_>) -> Result<(&'b str, &'b str)> {
    let mut depth = 0usize;
    for found in markers(body, session.delimiters()) {
        let found = found?;
        let marker = decode_at(&found)?;
        let paired = session.registry().is_paired(marker.name());
        match marker.kind() {
            MarkerKind::Start if paired => depth += 1,
            MarkerKind::End if paired => depth = depth.saturating_sub(1),
            MarkerKind::Start | MarkerKind::SelfClosing if depth == 0 && marker.name() == ELSE => {
                if let Some(p) = marker.params().first() {
                    let name = match p {
                        Param::Positional(v) => v,
                        Param::Named { key, .. } => key,
                    };
                    return Err(ScriptError::invalid_param(ELSE, name, "else takes no parameters"));
                }
                return Ok((&body[..found.span.start], &body[found.span.end..]));
            }
            _ => {}
        }
    }
    Ok((body, ""))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
