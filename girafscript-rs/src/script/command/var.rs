//! `var` / `echo`: emit a context value.

use super::{check_named, require_path};
use crate::script::engine::Session;
use crate::script::error::{Result, ScriptError};
use crate::script::marker::Marker;

const DEFAULT_SEP: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    Html,
    None,
}

#[derive(Debug)]
pub(super) struct VarParams {
    path: String,
    default: Option<String>,
    escape: Escape,
    sep: String,
}

impl VarParams {
    pub(super) fn extract(marker: &Marker) -> Result<Self> {
        let cmd = marker.name();
        check_named(marker, &["default", "escape", "sep"])?;

        let mut positional = marker.positional();
        let path = positional
            .next()
            .ok_or_else(|| ScriptError::missing(cmd, "name"))?;
        require_path(cmd, "name", path)?;
        if let Some(extra) = positional.next() {
            return Err(ScriptError::invalid_param(
                cmd,
                extra,
                "unexpected positional parameter",
            ));
        }

        let escape = match marker.get_named("escape") {
            None | Some("html") => Escape::Html,
            Some("none") | Some("raw") => Escape::None,
            Some(other) => {
                return Err(ScriptError::invalid_param(
                    cmd,
                    "escape",
                    format!("`{other}` is not one of html, none"),
                ));
            }
        };

        Ok(VarParams {
            path: path.to_owned(),
            default: marker.get_named("default").map(str::to_owned),
            escape,
            sep: marker.get_named("sep").unwrap_or(DEFAULT_SEP).to_owned(),
        })
    }

    pub(super) fn invoke(&self, session: &Session<'_>) -> String {
        let text = match session.context().resolve(&self.path) {
            Some(value) => value.render_joined(&self.sep),
            None => self.default.clone().unwrap_or_default(),
        };
        match self.escape {
            Escape::Html => html_escape::encode_safe(&text).into_owned(),
            Escape::None => text,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
