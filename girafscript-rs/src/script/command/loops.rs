//! `loop` / `foreach`: repeat a body once per list item or integer.
//!
//! ```text
//! {{loop messages as=msg index=i}} … {{/loop}}
//! {{loop n from=1 to=3}} … {{/loop}}
//! {{loop n from=1 to=count}} … {{/loop}}
//! ```
//!
//! A range bound is an integer literal or a variable path read when the loop
//! runs.

use super::{check_named, require_ident, require_path};
use crate::script::engine::Session;
use crate::script::error::{Result, ScriptError};
use crate::script::marker::{is_path, Marker};
use crate::script::value::Value;

const DEFAULT_ITEM: &str = "item";

#[derive(Debug)]
enum Source {
    List {
        list: String,
        item: String,
        index: Option<String>,
    },
    Range {
        var: String,
        from: Bound,
        to: Bound,
    },
}

#[derive(Debug)]
enum Bound {
    Literal(i64),
    Var(String),
}

impl Bound {
    fn parse(cmd: &str, param: &str, raw: &str) -> Result<Self> {
        if let Ok(n) = raw.trim().parse() {
            return Ok(Bound::Literal(n));
        }
        if is_path(raw) {
            return Ok(Bound::Var(raw.to_owned()));
        }
        Err(ScriptError::invalid_param(
            cmd,
            param,
            format!("`{raw}` is not an integer or a variable path"),
        ))
    }

    fn value(&self, cmd: &str, session: &Session<'_>) -> Result<i64> {
        match self {
            Bound::Literal(n) => Ok(*n),
            Bound::Var(path) => session
                .context()
                .resolve(path)
                .and_then(Value::as_int)
                .ok_or_else(|| {
                    ScriptError::invalid_param(cmd, path, "not bound to an integer")
                }),
        }
    }
}

#[derive(Debug)]
pub(super) struct LoopParams {
    source: Source,
}

impl LoopParams {
    pub(super) fn extract(marker: &Marker) -> Result<Self> {
        let cmd = marker.name();
        check_named(marker, &["as", "index", "from", "to"])?;

        let mut positional = marker.positional();
        let first = positional
            .next()
            .ok_or_else(|| ScriptError::missing(cmd, "list"))?;
        if let Some(extra) = positional.next() {
            return Err(ScriptError::invalid_param(
                cmd,
                extra,
                "unexpected positional parameter",
            ));
        }

        let source = match (marker.get_named("from"), marker.get_named("to")) {
            (None, None) => {
                require_path(cmd, "list", first)?;
                let item = marker.get_named("as").unwrap_or(DEFAULT_ITEM);
                require_ident(cmd, "as", item)?;
                let index = marker.get_named("index");
                if let Some(index) = index {
                    require_ident(cmd, "index", index)?;
                }
                Source::List {
                    list: first.to_owned(),
                    item: item.to_owned(),
                    index: index.map(str::to_owned),
                }
            }
            (Some(from), Some(to)) => {
                require_ident(cmd, "var", first)?;
                if marker.get_named("as").is_some() {
                    return Err(ScriptError::invalid_param(
                        cmd,
                        "as",
                        "not allowed with from/to",
                    ));
                }
                Source::Range {
                    var: first.to_owned(),
                    from: Bound::parse(cmd, "from", from)?,
                    to: Bound::parse(cmd, "to", to)?,
                }
            }
            (Some(_), None) => return Err(ScriptError::missing(cmd, "to")),
            (None, Some(_)) => return Err(ScriptError::missing(cmd, "from")),
        };
        Ok(LoopParams { source })
    }

    pub(super) fn invoke(&self, cmd: &str, body: &str, session: &mut Session<'_>) -> Result<String> {
        let mut out = String::new();
        match &self.source {
            Source::List { list, item, index } => {
                let Some(value) = session.context().resolve(list) else {
                    return Err(ScriptError::invalid_param(cmd, list, "not bound to a variable"));
                };
                let items = value.as_list().map(<[Value]>::to_vec).ok_or_else(|| {
                    ScriptError::invalid_param(
                        cmd,
                        list,
                        format!("expected a list, found {}", value.type_name()),
                    )
                })?;
                for (i, value) in items.into_iter().enumerate() {
                    let chunk = session.scoped(|s| {
                        s.context_mut().set_local(item.as_str(), value);
                        if let Some(index) = index {
                            s.context_mut().set_local(index.as_str(), i as i64);
                        }
                        s.expand(body)
                    })?;
                    out.push_str(&chunk);
                }
            }
            Source::Range { var, from, to } => {
                let (from, to) = (from.value(cmd, session)?, to.value(cmd, session)?);
                let step = if from <= to { 1 } else { -1 };
                let mut n = from;
                loop {
                    let chunk = session.scoped(|s| {
                        s.context_mut().set_local(var.as_str(), n);
                        s.expand(body)
                    })?;
                    out.push_str(&chunk);
                    if n == to {
                        break;
                    }
                    n += step;
                }
            }
        }
        Ok(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
