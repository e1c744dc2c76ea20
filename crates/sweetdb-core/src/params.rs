//! Parameter binding
//!
//! Callers hand a query plus a [`Params`] value. The binder checks that the
//! shape of the parameters matches the placeholders in the query and
//! produces a [`BoundStatement`]: SQL that only uses positional `?`
//! placeholders and the values in placeholder order. Drivers only ever see
//! bound statements.
//!
//! Placeholders are recognised outside string literals, quoted identifiers
//! and comments. `::` (cast) and `:=` (assignment) are not placeholders.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use crate::{Dialect, Result, SweetError, Value};

/// Parameters for one statement
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// Run the query text verbatim
    #[default]
    None,
    /// Bind to `?` placeholders in order
    Positional(Vec<Value>),
    /// Bind to `:name` placeholders by name. Keys are stored without the
    /// leading colon.
    Named(IndexMap<String, Value>),
}

impl Params {
    /// Positional parameters from any sequence of values
    pub fn positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Named parameters from `(name, value)` pairs. Names may be given with
    /// or without the leading `:`.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (normalize_name(k.as_ref()).to_string(), v.into()))
                .collect(),
        )
    }

    /// Number of bound values
    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Positional(values) => values.len(),
            Params::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binding mode, for logging
    pub fn mode(&self) -> &'static str {
        match self {
            Params::None => "none",
            Params::Positional(_) => "positional",
            Params::Named(_) => "named",
        }
    }
}

fn normalize_name(name: &str) -> &str {
    name.strip_prefix(':').unwrap_or(name)
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::None
    }
}

macro_rules! impl_scalar_params {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Params {
                fn from(value: $ty) -> Self {
                    Params::Positional(vec![value.into()])
                }
            }
        )*
    };
}

impl_scalar_params!(
    Value,
    &Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    &str,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
);

impl<T: Into<Value>> From<Option<T>> for Params {
    fn from(value: Option<T>) -> Self {
        Params::Positional(vec![value.into()])
    }
}

impl<T: Into<Value>> From<Vec<T>> for Params {
    fn from(values: Vec<T>) -> Self {
        Params::positional(values)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Params {
    fn from(values: [T; N]) -> Self {
        Params::positional(values)
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Params {
    fn from(values: &[T]) -> Self {
        Params::positional(values.iter().cloned())
    }
}

impl<K: AsRef<str>, V: Into<Value>> From<IndexMap<K, V>> for Params {
    fn from(map: IndexMap<K, V>) -> Self {
        Params::named(map)
    }
}

impl<K: AsRef<str>, V: Into<Value>, S> From<HashMap<K, V, S>> for Params {
    fn from(map: HashMap<K, V, S>) -> Self {
        Params::named(map)
    }
}

impl<K: AsRef<str>, V: Into<Value>> From<BTreeMap<K, V>> for Params {
    fn from(map: BTreeMap<K, V>) -> Self {
        Params::named(map)
    }
}

/// A statement ready for a driver: `?` placeholders only, values in order
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl BoundStatement {
    /// A statement without parameters
    pub fn verbatim(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            values: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder<'a> {
    Positional,
    Named(&'a str),
}

/// Find placeholders in `sql`, skipping quoted text and comments
fn scan_placeholders(sql: &str, dialect: Dialect) -> Vec<(Range<usize>, Placeholder<'_>)> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut found = Vec::new();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i = skip_quoted(bytes, i, quote, dialect);
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = skip_line(bytes, i);
            }
            b'#' if dialect == Dialect::MySql => {
                i = skip_line(bytes, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = match sql[i + 2..].find("*/") {
                    Some(end) => i + 2 + end + 2,
                    None => len,
                };
            }
            b'?' => {
                found.push((i..i + 1, Placeholder::Positional));
                i += 1;
            }
            b':' => match bytes.get(i + 1) {
                Some(b':') => i += 2,
                Some(c) if c.is_ascii_alphabetic() || *c == b'_' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < len && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                        end += 1;
                    }
                    found.push((i..end, Placeholder::Named(&sql[start..end])));
                    i = end;
                }
                _ => i += 1,
            },
            _ => i += 1,
        }
    }

    found
}

/// Returns the index just past the closing quote
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, dialect: Dialect) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        let c = bytes[j];
        if c == b'\\' && quote != b'`' && dialect.backslash_escapes() {
            j += 2;
        } else if c == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
            } else {
                return j + 1;
            }
        } else {
            j += 1;
        }
    }
    bytes.len()
}

fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&c| c == b'\n')
        .map(|p| start + p + 1)
        .unwrap_or(bytes.len())
}

/// Bind `params` against the placeholders of `sql`.
///
/// - [`Params::None`]: the query is passed through untouched.
/// - [`Params::Positional`]: the query must use only `?` placeholders, one
///   per value.
/// - [`Params::Named`]: the query must use only `:name` placeholders; every
///   placeholder needs a value and every key must appear in the query. A
///   name used several times binds the same value at each occurrence.
///
/// Any mismatch is a [`SweetError::Logic`].
pub fn bind(sql: &str, params: Params, dialect: Dialect) -> Result<BoundStatement> {
    let values = match params {
        Params::None => return Ok(BoundStatement::verbatim(sql)),
        Params::Positional(values) => values,
        Params::Named(map) => return bind_named(sql, map, dialect),
    };

    let placeholders = scan_placeholders(sql, dialect);
    if let Some(name) = placeholders.iter().find_map(|(_, p)| match p {
        Placeholder::Named(name) => Some(*name),
        Placeholder::Positional => None,
    }) {
        return Err(SweetError::Logic(format!(
            "query uses named placeholder :{} but positional parameters were given",
            name
        )));
    }

    if placeholders.len() != values.len() {
        return Err(SweetError::Logic(format!(
            "query has {} positional placeholder(s) but {} value(s) were given",
            placeholders.len(),
            values.len()
        )));
    }

    Ok(BoundStatement {
        sql: sql.to_string(),
        values,
    })
}

fn bind_named(sql: &str, map: IndexMap<String, Value>, dialect: Dialect) -> Result<BoundStatement> {
    let placeholders = scan_placeholders(sql, dialect);

    let mut rewritten = String::with_capacity(sql.len());
    let mut values = Vec::with_capacity(placeholders.len());
    let mut used = HashSet::new();
    let mut last = 0;

    for (range, placeholder) in placeholders {
        let name = match placeholder {
            Placeholder::Named(name) => name,
            Placeholder::Positional => {
                return Err(SweetError::Logic(
                    "query uses positional placeholder ? but named parameters were given".into(),
                ));
            }
        };
        let value = map.get(name).ok_or_else(|| {
            SweetError::Logic(format!("no value bound for placeholder :{}", name))
        })?;

        rewritten.push_str(&sql[last..range.start]);
        rewritten.push('?');
        last = range.end;
        values.push(value.clone());
        used.insert(name);
    }
    rewritten.push_str(&sql[last..]);

    if let Some(unused) = map.keys().find(|k| !used.contains(k.as_str())) {
        return Err(SweetError::Logic(format!(
            "parameter :{} does not appear in the query",
            unused
        )));
    }

    Ok(BoundStatement {
        sql: rewritten,
        values,
    })
}
