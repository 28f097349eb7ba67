//! Command registry: the lookup from marker name to command variant.
//!
//! Every [`CommandKind`] is registered by default; the rc file can switch
//! individual commands off with `/disable`, after which their markers are
//! reported as unknown.

use std::collections::HashSet;

use super::command::{Command, CommandKind};
use super::error::{Result, ScriptError};
use super::marker::{decode, Marker};
use super::tokenize::Delimiters;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    disabled: HashSet<CommandKind>,
}

impl Registry {
    /// A registry with every command enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an enabled command by (lower-cased) name or alias.
    pub fn resolve(&self, name: &str) -> Option<CommandKind> {
        CommandKind::from_name(name).filter(|k| !self.disabled.contains(k))
    }

    /// Whether `name` is an enabled command whose start tag expects an end tag.
    pub fn is_paired(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(CommandKind::is_paired)
    }

    /// Disable the command `name` names (aliases included).  Returns the
    /// disabled kind, or `None` if `name` is not a command.
    pub fn disable(&mut self, name: &str) -> Option<CommandKind> {
        let kind = CommandKind::from_name(&name.to_lowercase())?;
        self.disabled.insert(kind);
        Some(kind)
    }

    /// Build a command from a decoded marker.
    pub fn construct(&self, marker: Marker) -> Result<Command> {
        let kind = self
            .resolve(marker.name())
            .ok_or_else(|| ScriptError::UnknownCommand {
                name: marker.name().to_owned(),
                offset: marker.span().start,
            })?;
        let mut command = Command::new(kind);
        command.set_marker(marker)?;
        Ok(command)
    }

    /// Build a command from raw marker text (delimiters included).
    pub fn construct_from_text(&self, raw: &str, delims: &Delimiters) -> Result<Command> {
        self.construct(decode(raw, delims)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
