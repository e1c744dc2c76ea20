//! INSERT statement builders

use crate::{Dialect, Result, SweetError, Value};

/// Build an `INSERT` with every value rendered as an escaped literal.
///
/// Columns keep the order of `values`. The statement is only built, never
/// executed.
pub fn insert<I, K, V>(dialect: Dialect, table: &str, values: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut columns = Vec::new();
    let mut literals = Vec::new();
    for (column, value) in values {
        columns.push(dialect.quote_identifier(column.as_ref())?);
        literals.push(dialect.literal(&value.into())?);
    }

    if columns.is_empty() {
        return Err(SweetError::Logic(format!(
            "cannot build an INSERT into {} without columns",
            table
        )));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_identifier(table)?,
        columns.join(", "),
        literals.join(", ")
    ))
}

/// Build an `INSERT` with one `?` placeholder per column
pub fn insert_parameterized<I, K>(dialect: Dialect, table: &str, columns: I) -> Result<String>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let columns = columns
        .into_iter()
        .map(|c| dialect.quote_identifier(c.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    if columns.is_empty() {
        return Err(SweetError::Logic(format!(
            "cannot build an INSERT into {} without columns",
            table
        )));
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_identifier(table)?,
        columns.join(", "),
        placeholders
    ))
}
