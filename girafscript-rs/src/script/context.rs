//! Rendering context: the variables commands resolve their parameters against.
//!
//! Globals come from the view layer (and the rc file).  Block commands push a
//! local [`Frame`] for the duration of a nested expansion; bindings in inner
//! frames shadow outer ones and disappear when the frame is popped.

use std::collections::HashMap;

use super::value::Value;

// ── Variable scope frame ──────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct Frame {
    locals: HashMap<String, Value>,
}

// ── Context ───────────────────────────────────────────────────────────────────

/// Variable store consulted while expanding a buffer.
#[derive(Debug, Default, Clone)]
pub struct Context {
    globals: HashMap<String, Value>,
    /// Local scopes, innermost last.
    frames: Vec<Frame>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set_global`](Self::set_global).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_global(name, value);
        self
    }

    /// Set (or overwrite) a global variable.
    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(name.into(), value.into());
    }

    /// Bind a variable in the innermost scope (globals when no frame is open).
    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let (name, value) = (name.into(), value.into());
        match self.frames.last_mut() {
            Some(frame) => {
                frame.locals.insert(name, value);
            }
            None => {
                self.globals.insert(name, value);
            }
        }
    }

    /// Look up a plain variable name, innermost scope first.
    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.locals.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Resolve a dotted path such as `message.poster.name` or `rows.0`.
    ///
    /// The first segment is a variable name; the rest step into maps by key
    /// and into lists by index.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.get_var(segments.next()?)?;
        for seg in segments {
            current = current.child(seg)?;
        }
        Some(current)
    }

    /// Open a new innermost scope.
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Discard the innermost scope and everything bound in it.
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Number of open local scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
