//! Script engine: the scan → decode → construct → invoke → splice loop.
//!
//! [`Engine::process`] walks a buffer marker by marker.  For each one it
//! builds the command the marker names, captures the command's span (the
//! marker alone, or start tag through matching end tag), invokes it, and
//! splices the result over the span.  Scanning resumes at the start of the
//! replacement, so markers a command emits are themselves expanded.
//!
//! Commands re-enter the engine through the [`Session`] they are handed:
//! [`Session::expand`] runs the loop over a nested body and
//! [`Session::scoped`] brackets work in a fresh local variable frame.  Both
//! count against the call's [`Limits`].

use std::ops::Range;

use super::command::{CommandKind, ELSE};
use super::context::Context;
use super::error::{Result, ScriptError};
use super::marker::{decode_at, Marker, MarkerKind};
use super::registry::Registry;
use super::tokenize::{next_marker, Delimiters};

// ── Limits ────────────────────────────────────────────────────────────────────

/// Ceilings on a single [`Engine::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Command invocations plus nested expansions, summed over the call.
    pub max_expansions: usize,
    /// Maximum nesting of [`Session::expand`].
    pub max_depth: usize,
}

impl Limits {
    pub const DEFAULT_MAX_EXPANSIONS: usize = 10_000;
    pub const DEFAULT_MAX_DEPTH: usize = 64;
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_expansions: Self::DEFAULT_MAX_EXPANSIONS,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Marker expansion engine.  Holds settings only; every call to
/// [`process`](Self::process) brings its own buffer and context.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    registry: Registry,
    delimiters: Delimiters,
    limits: Limits,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Expand every marker in `buffer` against `ctx`.
    ///
    /// Variables bound by `set` at the top level live in a frame that is
    /// discarded when the call returns, so `ctx` comes back with the same
    /// bindings it went in with.  On error nothing is returned but the error.
    pub fn process(&self, buffer: &str, ctx: &mut Context) -> Result<String> {
        self.with_session(ctx, |s| s.scoped(|s| s.run(buffer)))
    }

    /// Open a [`Session`] over `ctx` and hand it to `f`.
    pub fn with_session<T>(
        &self,
        ctx: &mut Context,
        f: impl FnOnce(&mut Session<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut session = Session {
            engine: self,
            ctx,
            expansions: 0,
            depth: 0,
        };
        f(&mut session)
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// The state of one `process` call, lent to each command it invokes.
pub struct Session<'a> {
    engine: &'a Engine,
    ctx: &'a mut Context,
    expansions: usize,
    depth: usize,
}

impl<'a> Session<'a> {
    pub fn context(&self) -> &Context {
        self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        self.ctx
    }

    pub fn delimiters(&self) -> &'a Delimiters {
        &self.engine.delimiters
    }

    pub fn registry(&self) -> &'a Registry {
        &self.engine.registry
    }

    /// Units of the expansion budget used so far.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Expand `text` as a nested buffer in the current scope.
    pub fn expand(&mut self, text: &str) -> Result<String> {
        let max_depth = self.engine.limits.max_depth;
        if self.depth >= max_depth {
            return Err(ScriptError::ExpansionLimitExceeded { limit: max_depth });
        }
        self.charge()?;
        self.depth += 1;
        let out = self.run(text);
        self.depth -= 1;
        out
    }

    /// Run `f` inside a fresh local frame.  The frame is popped whether `f`
    /// succeeds or not.
    pub fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.ctx.push_frame();
        let out = f(self);
        self.ctx.pop_frame();
        out
    }

    fn charge(&mut self) -> Result<()> {
        self.expansions += 1;
        let limit = self.engine.limits.max_expansions;
        if self.expansions > limit {
            return Err(ScriptError::ExpansionLimitExceeded { limit });
        }
        Ok(())
    }

    fn run(&mut self, text: &str) -> Result<String> {
        let delims = self.delimiters();
        let registry = self.registry();
        let mut buf = text.to_owned();
        let mut cursor = 0;

        while let Some(found) = next_marker(&buf, cursor, delims)? {
            let marker = decode_at(&found)?;
            if marker.kind() == MarkerKind::End {
                return Err(ScriptError::UnmatchedEndMarker {
                    offset: marker.span().start,
                    detail: format!("`{}` closes nothing", marker.raw()),
                });
            }

            let start = marker.span();
            let mut command = registry.construct(marker)?;
            let span = match command.end_marker(delims) {
                None => start,
                Some(end) => match command.marker() {
                    Some(m) => self.find_matching_end(&buf, m, &end)?,
                    None => start,
                },
            };

            self.charge()?;
            let out = command.invoke(&buf[span.clone()], self)?;
            buf.replace_range(span.clone(), &out);
            cursor = span.start;
        }
        Ok(buf)
    }

    /// Span from `open`'s start through the end tag that closes it.
    ///
    /// Paired start tags seen on the way are pushed on a stack and must be
    /// closed in order; only an end tag met with the stack empty can close
    /// `open`, and it must be `expected`.  Every marker passed must name a
    /// registered command, except an `{{else}}` directly inside a block that
    /// accepts one.
    fn find_matching_end(&self, buf: &str, open: &Marker, expected: &str) -> Result<Range<usize>> {
        let delims = self.delimiters();
        let registry = self.registry();
        let mut pending: Vec<String> = Vec::new();
        let mut cursor = open.span().end;

        loop {
            let Some(found) = next_marker(buf, cursor, delims)? else {
                return Err(ScriptError::UnmatchedEndMarker {
                    offset: open.span().start,
                    detail: format!("`{}` is never closed by `{expected}`", open.raw()),
                });
            };
            cursor = found.span.end;
            let inner = decode_at(&found)?;
            match inner.kind() {
                MarkerKind::Start | MarkerKind::SelfClosing if inner.name() == ELSE => {
                    let frame = pending.last().map_or(open.name(), String::as_str);
                    if !registry.resolve(frame).is_some_and(CommandKind::accepts_else) {
                        return Err(ScriptError::UnknownCommand {
                            name: ELSE.to_owned(),
                            offset: found.span.start,
                        });
                    }
                }
                MarkerKind::Start | MarkerKind::SelfClosing => match registry.resolve(inner.name()) {
                    None => {
                        return Err(ScriptError::UnknownCommand {
                            name: inner.name().to_owned(),
                            offset: found.span.start,
                        });
                    }
                    Some(kind) if kind.is_paired() && inner.kind() == MarkerKind::Start => {
                        pending.push(inner.name().to_owned());
                    }
                    Some(_) => {}
                },
                MarkerKind::End => {
                    if registry.resolve(inner.name()).is_none() {
                        return Err(ScriptError::UnknownCommand {
                            name: inner.name().to_owned(),
                            offset: found.span.start,
                        });
                    }
                    let wanted = match pending.last() {
                        Some(top) if top == inner.name() => {
                            pending.pop();
                            continue;
                        }
                        Some(top) => delims.end_tag(top),
                        None if delims.end_tag(inner.name()) == expected => {
                            return Ok(open.span().start..found.span.end);
                        }
                        None => expected.to_owned(),
                    };
                    return Err(ScriptError::UnmatchedEndMarker {
                        offset: found.span.start,
                        detail: format!("found `{}` while expecting `{wanted}`", inner.raw()),
                    });
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::error::ErrorKind;
    use crate::script::value::Value;

    fn run(src: &str, ctx: &mut Context) -> Result<String> {
        Engine::new().process(src, ctx)
    }

    #[test]
    fn identity_without_markers() {
        let mut ctx = Context::new();
        for src in ["", "plain text", "a } b }} c", "héllo wörld"] {
            assert_eq!(run(src, &mut ctx).unwrap(), src);
        }
    }

    #[test]
    fn nested_same_name_loops() {
        let mut ctx = Context::new()
            .with("a", vec!["x", "y"])
            .with("b", vec![1i64, 2]);
        let src = "{{loop a as=p}}{{loop b as=q}}{{var p}}{{var q}} {{/loop}}{{/loop}}";
        assert_eq!(run(src, &mut ctx).unwrap(), "x1 x2 y1 y2 ");
    }

    #[test]
    fn end_tag_matches_alias_used() {
        let mut ctx = Context::new().with("a", vec!["x"]);
        assert_eq!(run("{{foreach a}}{{var item}}{{/foreach}}", &mut ctx).unwrap(), "x");
        let err = run("{{foreach a}}x{{/loop}}", &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmatchedEndMarker);
    }

    #[test]
    fn unclosed_start_tag() {
        let err = run("before {{loop a}} never closed", &mut Context::new()).unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnmatchedEndMarker {
                offset: 7,
                detail: "`{{loop a}}` is never closed by `{{/loop}}`".into()
            }
        );
    }

    #[test]
    fn stray_end_tag() {
        let err = run("text {{/if}}", &mut Context::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmatchedEndMarker);
    }

    #[test]
    fn crossed_tags() {
        let mut ctx = Context::new().with("a", vec!["x"]).with("c", true);
        let err = run("{{loop a}}{{if c}}{{/loop}}{{/if}}", &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmatchedEndMarker);
    }

    #[test]
    fn unknown_end_tag_inside_body() {
        let mut ctx = Context::new().with("c", true);
        let err = run("{{if c}}{{/wat}}{{/if}}", &mut ctx).unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownCommand {
                name: "wat".into(),
                offset: 8
            }
        );
    }

    #[test]
    fn unknown_start_tag_in_skipped_branch() {
        let mut ctx = Context::new().with("off", false);
        let err = run("{{if off}}{{blink}}{{/if}}", &mut ctx).unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownCommand {
                name: "blink".into(),
                offset: 10
            }
        );
        let err = run("{{comment}}{{blink /}}{{/comment}}", &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
    }

    #[test]
    fn else_only_inside_conditional_blocks() {
        let mut ctx = Context::new().with("on", true).with("rows", vec!["r"]);
        assert_eq!(run("{{if on}}a{{else}}b{{/if}}", &mut ctx).unwrap(), "a");
        let err = run("{{loop rows}}a{{else}}b{{/loop}}", &mut ctx).unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownCommand {
                name: "else".into(),
                offset: 14
            }
        );
    }

    #[test]
    fn self_closed_paired_command_is_single() {
        let mut ctx = Context::new();
        assert_eq!(run("a{{comment /}}b", &mut ctx).unwrap(), "ab");
    }

    #[test]
    fn comment_body_dropped() {
        let mut ctx = Context::new();
        let src = "a{{comment}}{{var x}} {{loop y}}{{/loop}}{{/comment}}b";
        assert_eq!(run(src, &mut ctx).unwrap(), "ab");
    }

    #[test]
    fn self_reproducing_output_hits_budget() {
        let mut ctx = Context::new().with("x", "{{var x escape=none}}");
        let err = run("{{var x escape=none}}", &mut ctx).unwrap_err();
        assert_eq!(
            err,
            ScriptError::ExpansionLimitExceeded {
                limit: Limits::DEFAULT_MAX_EXPANSIONS
            }
        );
    }

    #[test]
    fn custom_limits() {
        let engine = Engine::new().with_limits(Limits {
            max_expansions: 3,
            max_depth: 64,
        });
        let mut ctx = Context::new().with("v", 1i64);
        assert_eq!(engine.process("{{var v}}{{var v}}{{var v}}", &mut ctx).unwrap(), "111");
        let err = engine.process("{{var v}}{{var v}}{{var v}}{{var v}}", &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpansionLimitExceeded);
    }

    #[test]
    fn range_loops_share_the_budget() {
        let engine = Engine::new().with_limits(Limits {
            max_expansions: 50,
            max_depth: 64,
        });
        let err = engine
            .process("{{loop n from=1 to=1000000}}.{{/loop}}", &mut Context::new())
            .unwrap_err();
        assert_eq!(err, ScriptError::ExpansionLimitExceeded { limit: 50 });
    }

    #[test]
    fn depth_ceiling() {
        let engine = Engine::new().with_limits(Limits {
            max_expansions: 10_000,
            max_depth: 2,
        });
        let mut ctx = Context::new().with("r", vec![1i64]);
        let two = "{{loop r}}{{loop r}}ok{{/loop}}{{/loop}}";
        assert_eq!(engine.process(two, &mut ctx).unwrap(), "ok");
        let three = "{{loop r}}{{loop r}}{{loop r}}ok{{/loop}}{{/loop}}{{/loop}}";
        let err = engine.process(three, &mut ctx).unwrap_err();
        assert_eq!(err, ScriptError::ExpansionLimitExceeded { limit: 2 });
    }

    #[test]
    fn custom_delimiters() {
        let engine = Engine::new().with_delimiters(Delimiters::new("<%", "%>").unwrap());
        let mut ctx = Context::new().with("rows", vec!["a", "b"]);
        let src = "{{kept}} <%loop rows%><%var item%><%/loop%>";
        assert_eq!(engine.process(src, &mut ctx).unwrap(), "{{kept}} ab");
    }

    #[test]
    fn context_restored_after_error() {
        let mut ctx = Context::new().with("rows", vec!["a"]);
        let err = run("{{loop rows}}{{set z=1 /}}{{var}}{{/loop}}", &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.get_var("z").is_none());
        assert_eq!(ctx.get_var("rows"), Some(&Value::from(vec!["a"])));
    }

    #[test]
    fn session_counts_expansions() {
        let engine = Engine::new();
        let mut ctx = Context::new().with("x", "1");
        let used = engine
            .with_session(&mut ctx, |s| {
                let out = s.expand("{{var x}}{{var x}}")?;
                assert_eq!(out, "11");
                Ok(s.expansions())
            })
            .unwrap();
        // one for the expansion itself, one per invocation
        assert_eq!(used, 3);
    }
}
