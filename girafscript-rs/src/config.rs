//! `girafscript.rc` configuration file parser.
//!
//! The rc file seeds the rendering context and tunes the engine:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>…` | set a global string variable |
//! | `/list <name> <item>…` | set a global list variable |
//! | `/limit expansions=<n> depth=<n>` | override the expansion ceilings |
//! | `/delimiters <open> <close>` | change the marker delimiters |
//! | `/disable <command>…` | unregister commands (their markers become unknown) |
//! | `/fallback <text>…` | fragment shown when expansion fails |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |

use std::path::Path;

use crate::script::marker::is_ident;
use crate::script::{Context, Delimiters, Engine, Limits, Registry, Value};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Parsed configuration: initial variables plus engine settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub vars: Context,
    pub delimiters: Delimiters,
    pub limits: Limits,
    pub registry: Registry,
    pub fallback: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an rc string.
    ///
    /// Returns the config and a list of any errors on recognised lines; the
    /// offending lines are otherwise ignored.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let errors = config.apply_str(s);
        (config, errors)
    }

    /// Read and parse an rc file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Apply further rc lines on top of this config.
    pub fn apply_str(&mut self, s: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let tokens = split_args(args_str.trim());

            let result = match cmd {
                "set" => parse_set(&tokens, &mut self.vars),
                "list" => parse_list(&tokens, &mut self.vars),
                "limit" => parse_limit(&tokens, &mut self.limits),
                "delimiters" => parse_delimiters(&tokens).map(|d| self.delimiters = d),
                "disable" => parse_disable(&tokens, &mut self.registry),
                "fallback" => {
                    self.fallback = Some(tokens.join(" "));
                    Ok(())
                }
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }
        errors
    }

    /// Apply a `name=value` definition (the CLI's `-D`).
    pub fn define(&mut self, def: &str) -> Result<(), String> {
        parse_set(&[def.to_owned()], &mut self.vars)
    }

    /// An engine with this config's delimiters, limits and command set.
    pub fn engine(&self) -> Engine {
        Engine::new()
            .with_delimiters(self.delimiters.clone())
            .with_limits(self.limits)
            .with_registry(self.registry.clone())
    }

    /// A fresh rendering context holding the configured variables.
    pub fn context(&self) -> Context {
        self.vars.clone()
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                // `""` is an empty argument, not nothing
                if !cur.is_empty() || quoted {
                    args.push(std::mem::take(&mut cur));
                }
                quoted = false;
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() || quoted {
        args.push(cur);
    }
    args
}

fn require_name(directive: &str, name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("/{directive}: variable name cannot be empty"));
    }
    if !is_ident(name) {
        return Err(format!("/{directive}: invalid variable name '{name}'"));
    }
    Ok(())
}

// ── /set, /list ───────────────────────────────────────────────────────────────

/// Parse `/set <name>=<value>` or `/set <name> <value>…`.
fn parse_set(tokens: &[String], vars: &mut Context) -> Result<(), String> {
    if tokens.is_empty() {
        return Err("/set: requires an argument".into());
    }

    let (name, value) = if let Some((name, value)) = tokens[0].split_once('=') {
        (name.to_owned(), value.to_owned())
    } else if tokens.len() >= 2 {
        (tokens[0].clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{}'", tokens[0]));
    };

    require_name("set", &name)?;
    vars.set_global(name, value);
    Ok(())
}

/// Parse `/list <name> <item>…`.  No items makes an empty list.
fn parse_list(tokens: &[String], vars: &mut Context) -> Result<(), String> {
    let Some((name, items)) = tokens.split_first() else {
        return Err("/list: requires a name".into());
    };
    require_name("list", name)?;
    let items: Vec<Value> = items.iter().map(|s| Value::Str(s.clone())).collect();
    vars.set_global(name.as_str(), Value::List(items));
    Ok(())
}

// ── Engine settings ───────────────────────────────────────────────────────────

/// Parse `/limit expansions=<n> depth=<n>` (either or both).
fn parse_limit(tokens: &[String], limits: &mut Limits) -> Result<(), String> {
    if tokens.is_empty() {
        return Err("/limit: requires expansions=<n> and/or depth=<n>".into());
    }
    let mut next = *limits;
    for tok in tokens {
        let Some((key, value)) = tok.split_once('=') else {
            return Err(format!("/limit: expected key=value, got '{tok}'"));
        };
        let n: usize = value
            .parse()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("/limit: '{value}' is not a positive integer"))?;
        match key {
            "expansions" => next.max_expansions = n,
            "depth" => next.max_depth = n,
            other => return Err(format!("/limit: unknown limit '{other}'")),
        }
    }
    *limits = next;
    Ok(())
}

/// Parse `/delimiters <open> <close>`.
fn parse_delimiters(tokens: &[String]) -> Result<Delimiters, String> {
    match tokens {
        [open, close] => Delimiters::new(open.as_str(), close.as_str())
            .map_err(|e| format!("/delimiters: {e}")),
        _ => Err(format!("/delimiters: expected 2 arguments, got {}", tokens.len())),
    }
}

/// Parse `/disable <command>…`.
fn parse_disable(tokens: &[String], registry: &mut Registry) -> Result<(), String> {
    if tokens.is_empty() {
        return Err("/disable: requires a command name".into());
    }
    for name in tokens {
        if registry.disable(name).is_none() {
            return Err(format!("/disable: unknown command '{name}'"));
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
