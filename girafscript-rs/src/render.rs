//! View-layer entry point: expand a fragment, never fail.
//!
//! The engine aborts on the first error and returns nothing.  A page being
//! rendered still needs *something* in that slot, so [`render_fragment`]
//! logs the failure and substitutes a fallback fragment instead.

use crate::script::{Context, Engine, ScriptError};

/// Shown in place of a fragment whose expansion failed.
pub const DEFAULT_FAILURE_FRAGMENT: &str =
    r#"<div class="render-error">This content could not be displayed.</div>"#;

/// Expand `buffer`; on error, log it and return `fallback`
/// (or [`DEFAULT_FAILURE_FRAGMENT`]).
pub fn render_fragment(
    engine: &Engine,
    buffer: &str,
    ctx: &mut Context,
    fallback: Option<&str>,
) -> String {
    match try_render(engine, buffer, ctx) {
        Ok(out) => out,
        Err(e) => {
            log::warn!("fragment expansion failed: {e}");
            fallback.unwrap_or(DEFAULT_FAILURE_FRAGMENT).to_owned()
        }
    }
}

/// Expand `buffer`, logging the outcome at debug level.
pub fn try_render(engine: &Engine, buffer: &str, ctx: &mut Context) -> Result<String, ScriptError> {
    log::debug!("expanding {} bytes against {} variables", buffer.len(), ctx.len());
    let out = engine.process(buffer, ctx)?;
    log::debug!("expanded to {} bytes", out.len());
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ErrorKind;

    #[test]
    fn success_passes_through() {
        let mut ctx = Context::new().with("who", "world");
        let out = render_fragment(&Engine::new(), "hello {{var who}}", &mut ctx, None);
        assert_eq!(out, "hello world");
    }

    #[test]
    fn failure_uses_default_fragment() {
        let mut ctx = Context::new();
        let out = render_fragment(&Engine::new(), "{{loop rows}}", &mut ctx, None);
        assert_eq!(out, DEFAULT_FAILURE_FRAGMENT);
    }

    #[test]
    fn failure_uses_given_fallback() {
        let mut ctx = Context::new();
        let out = render_fragment(&Engine::new(), "{{nope}}", &mut ctx, Some("[x]"));
        assert_eq!(out, "[x]");
    }

    #[test]
    fn try_render_reports_error() {
        let err = try_render(&Engine::new(), "{{var", &mut Context::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnterminatedMarker);
    }
}
