//! SQL dialect rules needed by the binder and the INSERT helper

use serde::{Deserialize, Serialize};

use crate::{Result, SweetError, Value};

/// SQL dialect of a session.
///
/// Only the lexical rules this crate relies on live here: how identifiers
/// are quoted, how string literals are escaped, and whether backslash is an
/// escape character inside quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// Standard SQL quoting (`"ident"`, `'it''s'`)
    #[default]
    Ansi,
    /// MySQL / MariaDB (`` `ident` ``, backslash escapes in strings)
    MySql,
    /// SQLite
    Sqlite,
}

impl Dialect {
    /// Dialect identifier (e.g. "mysql", "sqlite")
    pub fn id(&self) -> &'static str {
        match self {
            Dialect::Ansi => "ansi",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Whether a backslash escapes the next character inside quoted text
    pub fn backslash_escapes(&self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// The character used to quote identifiers
    pub fn identifier_quote(&self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Ansi | Dialect::Sqlite => '"',
        }
    }

    /// Quote a possibly schema-qualified identifier (`db.table`), quoting
    /// each part separately.
    pub fn quote_identifier(&self, ident: &str) -> Result<String> {
        let q = self.identifier_quote();
        let mut parts = Vec::new();
        for part in ident.split('.') {
            if part.is_empty() {
                return Err(SweetError::Logic(format!("invalid identifier '{}'", ident)));
            }
            let escaped = part.replace(q, &format!("{q}{q}"));
            parts.push(format!("{q}{escaped}{q}"));
        }
        Ok(parts.join("."))
    }

    /// Escape and quote a string literal
    pub fn quote_string(&self, s: &str) -> String {
        let escaped = if self.backslash_escapes() {
            s.replace('\\', "\\\\").replace('\'', "''").replace('\0', "\\0")
        } else {
            s.replace('\'', "''")
        };
        format!("'{}'", escaped)
    }

    /// Render a value as an SQL literal.
    ///
    /// Non-finite floats have no literal form and are rejected.
    pub fn literal(&self, value: &Value) -> Result<String> {
        let literal = match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => match self {
                Dialect::Sqlite => if *v { "1" } else { "0" }.to_string(),
                Dialect::Ansi | Dialect::MySql => if *v { "TRUE" } else { "FALSE" }.to_string(),
            },
            Value::Int64(v) => v.to_string(),
            Value::UInt64(v) => v.to_string(),
            Value::Float64(v) => {
                if !v.is_finite() {
                    return Err(SweetError::Logic(format!(
                        "{} cannot be written as an SQL literal",
                        v
                    )));
                }
                v.to_string()
            }
            Value::Decimal(v) => {
                if is_numeric_literal(v) {
                    v.clone()
                } else {
                    self.quote_string(v)
                }
            }
            Value::String(v) => self.quote_string(v),
            Value::Bytes(v) => {
                let hex: String = v.iter().map(|b| format!("{:02x}", b)).collect();
                format!("X'{}'", hex)
            }
            Value::Date(v) => format!("'{}'", v.format("%Y-%m-%d")),
            Value::Time(v) => format!("'{}'", v.format("%H:%M:%S%.f")),
            Value::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Json(v) => self.quote_string(&v.to_string()),
        };
        Ok(literal)
    }
}

fn is_numeric_literal(s: &str) -> bool {
    !s.is_empty()
        && s.parse::<f64>().is_ok()
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}
