//! `set`: bind string variables in the innermost scope.

use super::require_ident;
use crate::script::engine::Session;
use crate::script::error::{Result, ScriptError};
use crate::script::marker::{Marker, Param};

#[derive(Debug)]
pub(super) struct SetParams {
    bindings: Vec<(String, String)>,
}

impl SetParams {
    pub(super) fn extract(marker: &Marker) -> Result<Self> {
        let cmd = marker.name();
        let mut bindings = Vec::new();
        for param in marker.params() {
            match param {
                Param::Named { key, value } => {
                    require_ident(cmd, key, key)?;
                    bindings.push((key.clone(), value.clone()));
                }
                Param::Positional(p) => {
                    return Err(ScriptError::invalid_param(cmd, p, "expected name=value"));
                }
            }
        }
        if bindings.is_empty() {
            return Err(ScriptError::missing(cmd, "name=value"));
        }
        Ok(SetParams { bindings })
    }

    pub(super) fn invoke(&self, session: &mut Session<'_>) -> String {
        for (name, value) in &self.bindings {
            session.context_mut().set_local(name.as_str(), value.as_str());
        }
        String::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
