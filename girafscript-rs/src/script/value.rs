//! Rendering-context value type.
//!
//! Values are dynamically typed.  Data handed over by the view layer is mostly
//! strings and numbers, plus lists of records (rows) that `loop` iterates
//! over; everything coerces to a string when it lands in the output.

use std::collections::BTreeMap;
use std::fmt;

/// A value bound in a [`Context`](super::Context).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => f.write_str(&self.join_items(items, ", ")),
            Value::Map(entries) => {
                let mut first = true;
                for (k, v) in entries {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{k}={v}")?;
                }
                Ok(())
            }
        }
    }
}

impl Value {
    /// Coerce to boolean.
    ///
    /// Falsy: `0`, `0.0`, `false`, `""`, `"0"`, `"false"` (any case), and
    /// empty lists or maps.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }

    /// Coerce to `i64` (returns `None` when the value has no integer reading).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(x) => Some(*x as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Str(s) => s.trim().parse().ok(),
            Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Borrow the items of a list value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Name of the type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "real",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Render with a custom list separator.  Non-list values render exactly
    /// as [`Display`](fmt::Display).
    pub fn render_joined(&self, sep: &str) -> String {
        match self {
            Value::List(items) => self.join_items(items, sep),
            other => other.to_string(),
        }
    }

    fn join_items(&self, items: &[Value], sep: &str) -> String {
        items.iter().map(Value::to_string).collect::<Vec<_>>().join(sep)
    }

    /// Step into a map entry or list index.
    ///
    /// `segment` is a key for maps and a decimal index for lists; scalars have
    /// no children.
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(segment),
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_int() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Int(-7).to_string(), "-7");
    }

    #[test]
    fn display_float() {
        assert_eq!(Value::Float(3.25).to_string(), "3.25");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn display_bool_and_str() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("hello".into()).to_string(), "hello");
    }

    #[test]
    fn display_list_and_map() {
        let list = Value::from(vec!["a", "b", "c"]);
        assert_eq!(list.to_string(), "a, b, c");
        assert_eq!(list.render_joined("|"), "a|b|c");

        let map: Value = [("id", Value::Int(1)), ("name", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(map.to_string(), "id=1, name=x");
    }

    #[test]
    fn as_bool() {
        assert!(Value::Int(1).as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(Value::Bool(true).as_bool());
        assert!(!Value::Bool(false).as_bool());
        assert!(Value::Str("hello".into()).as_bool());
        assert!(!Value::Str("".into()).as_bool());
        assert!(!Value::Str("0".into()).as_bool());
        assert!(!Value::Str("FALSE".into()).as_bool());
        assert!(!Value::List(Vec::new()).as_bool());
        assert!(Value::from(vec![1i64]).as_bool());
    }

    #[test]
    fn as_int_coercions() {
        assert_eq!(Value::Int(5).as_int(), Some(5));
        assert_eq!(Value::Float(3.9).as_int(), Some(3));
        assert_eq!(Value::Str(" 42 ".into()).as_int(), Some(42));
        assert_eq!(Value::Str("abc".into()).as_int(), None);
        assert_eq!(Value::List(Vec::new()).as_int(), None);
    }

    #[test]
    fn child_lookup() {
        let row: Value = [("subject", "Hi")].into_iter().collect();
        assert_eq!(row.child("subject"), Some(&Value::from("Hi")));
        assert_eq!(row.child("nope"), None);

        let list = Value::from(vec!["x", "y"]);
        assert_eq!(list.child("1"), Some(&Value::from("y")));
        assert_eq!(list.child("5"), None);
        assert_eq!(list.child("first"), None);
        assert_eq!(Value::Int(3).child("0"), None);
    }

    #[test]
    fn type_name() {
        assert_eq!(Value::Int(0).type_name(), "integer");
        assert_eq!(Value::Float(0.0).type_name(), "real");
        assert_eq!(Value::Str("".into()).type_name(), "string");
        assert_eq!(Value::List(Vec::new()).type_name(), "list");
    }
}
