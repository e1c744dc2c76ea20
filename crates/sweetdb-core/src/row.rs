//! A single materialized row of a recordset

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

use crate::{FromValue, Result, SweetError, Value};

/// One row of a query result with field access by column name.
///
/// Column names are shared between all rows of the same recordset. Asking
/// for a column the query did not return is a [`SweetError::Logic`]: the
/// calling code named a field that does not exist, which is different from
/// a field that exists and holds NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordsetRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl RecordsetRow {
    /// Create a new row.
    ///
    /// `values` is truncated or padded with NULL so it always lines up with
    /// `columns`.
    pub fn new(columns: Arc<[String]>, mut values: Vec<Value>) -> Self {
        values.resize(columns.len(), Value::Null);
        Self { columns, values }
    }

    /// Get a field by column name.
    ///
    /// When a result carries the same column name twice (e.g. a join
    /// selecting `a.id` and `b.id`) the last one wins.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.position(name)
            .map(|idx| &self.values[idx])
            .ok_or_else(|| {
                SweetError::Logic(format!(
                    "field '{}' does not exist in this row (available: {})",
                    name,
                    self.columns.join(", ")
                ))
            })
    }

    /// Get a field by column name converted to `T`
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        T::from_value(self.get(name)?)
    }

    /// Check whether the row has a column with this name
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Get a value by column index
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Column names, in result order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values, in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(column, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Convert to an ordered map keyed by column name
    pub fn to_map(&self) -> IndexMap<String, Value> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().rposition(|c| c == name)
    }
}

/// Panics if the column does not exist. Use [`RecordsetRow::get`] to handle
/// the missing-field case as an error.
impl std::ops::Index<&str> for RecordsetRow {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}

/// Serializes as a map of column name to plain value: `{"id": 1, "field1": "Test 1"}`.
///
/// Decimals stay strings, dates and times use their ISO forms, and JSON
/// columns are embedded as-is.
impl Serialize for RecordsetRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &FieldValue(value))?;
        }
        map.end()
    }
}

struct FieldValue<'a>(&'a Value);

impl Serialize for FieldValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int64(i) => serializer.serialize_i64(*i),
            Value::UInt64(u) => serializer.serialize_u64(*u),
            Value::Float64(f) => serializer.serialize_f64(*f),
            Value::Decimal(s) | Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Date(d) => d.serialize(serializer),
            Value::Time(t) => t.serialize(serializer),
            Value::DateTime(dt) => dt.serialize(serializer),
            Value::Json(j) => j.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row() -> RecordsetRow {
        let columns: Arc<[String]> = vec!["id".to_string(), "field1".into(), "field2".into()].into();
        RecordsetRow::new(
            columns,
            vec![Value::Int64(1), Value::String("Test 1".into()), Value::Int64(10)],
        )
    }

    #[test]
    fn get_by_name() {
        let row = row();
        assert_eq!(row.get("field1").unwrap(), &Value::String("Test 1".into()));
        assert_eq!(row.get_as::<i64>("field2").unwrap(), 10);
        assert_eq!(row["id"], Value::Int64(1));
    }

    #[test]
    fn missing_field_is_logic_error() {
        let err = row().get("fieldInexistent").unwrap_err();
        assert!(matches!(err, SweetError::Logic(_)));
        assert!(err.to_string().contains("fieldInexistent"));
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn index_panics_on_missing_field() {
        let _ = &row()["nope"];
    }

    #[test]
    fn null_field_is_not_missing() {
        let columns: Arc<[String]> = vec!["a".to_string()].into();
        let row = RecordsetRow::new(columns, vec![Value::Null]);
        assert_eq!(row.get("a").unwrap(), &Value::Null);
        assert_eq!(row.get_as::<Option<i64>>("a").unwrap(), None);
    }

    #[test]
    fn duplicate_column_last_wins() {
        let columns: Arc<[String]> = vec!["id".to_string(), "id".into()].into();
        let row = RecordsetRow::new(columns, vec![Value::Int64(1), Value::Int64(2)]);
        assert_eq!(row.get("id").unwrap(), &Value::Int64(2));
        assert_eq!(row.value_at(0), Some(&Value::Int64(1)));
    }

    #[test]
    fn values_are_aligned_with_columns() {
        let columns: Arc<[String]> = vec!["a".to_string(), "b".into()].into();
        let row = RecordsetRow::new(columns, vec![Value::Int64(1)]);
        assert_eq!(row.values(), &[Value::Int64(1), Value::Null]);
    }

    #[test]
    fn map_keeps_column_order() {
        let keys: Vec<String> = row().to_map().into_keys().collect();
        assert_eq!(keys, vec!["id", "field1", "field2"]);
    }

    #[test]
    fn serializes_as_object() {
        let json = serde_json::to_value(row()).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "field1": "Test 1", "field2": 10}));
    }

    #[test]
    fn serializes_plain_field_values() {
        let columns: Arc<[String]> =
            ["n", "flag", "price", "born", "at", "doc", "raw"].map(String::from).into();
        let born = chrono::NaiveDate::from_ymd_opt(2011, 4, 30).unwrap();
        let row = RecordsetRow::new(
            columns,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Decimal("12.50".into()),
                Value::Date(born),
                Value::DateTime(born.and_hms_opt(22, 44, 39).unwrap()),
                Value::Json(serde_json::json!({"a": [1, 2]})),
                Value::Bytes(vec![0, 255]),
            ],
        );

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "n": null,
                "flag": true,
                "price": "12.50",
                "born": "2011-04-30",
                "at": "2011-04-30T22:44:39",
                "doc": {"a": [1, 2]},
                "raw": [0, 255],
            })
        );
    }
}
