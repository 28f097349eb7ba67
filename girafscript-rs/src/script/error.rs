//! Error type shared by every stage of marker expansion.
//!
//! Any of these aborts the whole [`Engine::process`](super::Engine::process)
//! call; the engine never returns a partially expanded buffer.

use thiserror::Error;

/// Convenience alias used throughout the `script` module.
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Everything that can go wrong while expanding a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// An opening delimiter with no closing delimiter after it.
    #[error("unterminated marker at byte {offset}")]
    UnterminatedMarker { offset: usize },

    /// Marker content that cannot be split into a name and parameters.
    #[error("malformed parameter in marker `{marker}`: {reason}")]
    MalformedParameter { marker: String, reason: String },

    /// A marker handed to a command that cannot accept it (an end tag, or
    /// a tag naming some other command).
    #[error("invalid marker `{marker}`: {reason}")]
    InvalidMarkerKind { marker: String, reason: String },

    /// A required parameter was not supplied.
    #[error("{command}: missing parameter `{param}`")]
    MissingParameter { command: String, param: String },

    /// A parameter was supplied but has the wrong shape or resolves to the
    /// wrong kind of value.
    #[error("{command}: invalid parameter `{param}`: {reason}")]
    InvalidParameterType {
        command: String,
        param: String,
        reason: String,
    },

    /// The marker names a command that is not registered.
    #[error("unknown command `{name}` at byte {offset}")]
    UnknownCommand { name: String, offset: usize },

    /// A paired tag whose closing tag never appears, a stray closing tag, or a
    /// closing tag naming the wrong command.
    #[error("unmatched end marker at byte {offset}: {detail}")]
    UnmatchedEndMarker { offset: usize, detail: String },

    /// The expansion budget or the nesting ceiling was exhausted.
    #[error("expansion limit of {limit} exceeded")]
    ExpansionLimitExceeded { limit: usize },

    /// A command instance was invoked more than once.
    #[error("{command}: command instance already invoked")]
    AlreadyInvoked { command: String },
}

/// Field-less discriminant of [`ScriptError`], handy for matching in callers
/// and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnterminatedMarker,
    MalformedParameter,
    InvalidMarkerKind,
    MissingParameter,
    InvalidParameterType,
    UnknownCommand,
    UnmatchedEndMarker,
    ExpansionLimitExceeded,
    AlreadyInvoked,
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::UnterminatedMarker { .. } => ErrorKind::UnterminatedMarker,
            ScriptError::MalformedParameter { .. } => ErrorKind::MalformedParameter,
            ScriptError::InvalidMarkerKind { .. } => ErrorKind::InvalidMarkerKind,
            ScriptError::MissingParameter { .. } => ErrorKind::MissingParameter,
            ScriptError::InvalidParameterType { .. } => ErrorKind::InvalidParameterType,
            ScriptError::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            ScriptError::UnmatchedEndMarker { .. } => ErrorKind::UnmatchedEndMarker,
            ScriptError::ExpansionLimitExceeded { .. } => ErrorKind::ExpansionLimitExceeded,
            ScriptError::AlreadyInvoked { .. } => ErrorKind::AlreadyInvoked,
        }
    }

    pub(crate) fn malformed(marker: &str, reason: impl Into<String>) -> Self {
        ScriptError::MalformedParameter {
            marker: marker.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(command: &str, param: &str) -> Self {
        ScriptError::MissingParameter {
            command: command.to_owned(),
            param: param.to_owned(),
        }
    }

    pub(crate) fn invalid_param(command: &str, param: &str, reason: impl Into<String>) -> Self {
        ScriptError::InvalidParameterType {
            command: command.to_owned(),
            param: param.to_owned(),
            reason: reason.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let e = ScriptError::UnterminatedMarker { offset: 3 };
        assert_eq!(e.kind(), ErrorKind::UnterminatedMarker);
        let e = ScriptError::missing("loop", "list");
        assert_eq!(e.kind(), ErrorKind::MissingParameter);
    }

    #[test]
    fn display_mentions_offset() {
        let e = ScriptError::UnknownCommand { name: "bogus".into(), offset: 12 };
        assert_eq!(e.to_string(), "unknown command `bogus` at byte 12");
    }

    #[test]
    fn display_invalid_param() {
        let e = ScriptError::invalid_param("loop", "from", "not an integer");
        assert_eq!(e.to_string(), "loop: invalid parameter `from`: not an integer");
    }
}
