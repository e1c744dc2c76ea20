//! Connection tests for all database drivers.
//!
//! Each test runs against SQLite and, when configured, MySQL.
//!
//! Test categories:
//! - Recordset shape and row count
//! - Single value and single row helpers
//! - Stored procedures with session variables
//! - Insert helpers and closing

use crate::fixtures::{TEST_PROCEDURE, TEST_TABLE, TestDriver, test_database};
use anyhow::Result;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sweetdb_connection::Value;

/// Select everything and walk the recordset
#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_select_returns_recordset(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };
    assert_eq!(db.conn.driver_name(), driver.name());

    let rs = db
        .conn
        .select(&format!("SELECT * FROM {TEST_TABLE} ORDER BY field1 ASC"), ())?;
    assert!(std::any::type_name_of_val(&rs).ends_with("Recordset"));
    assert_eq!(rs.row_count(), 2);
    assert_eq!(rs.columns(), &["id", "field1", "field2"]);

    let mut seen = Vec::new();
    for (expected_id, row) in (1..).zip(rs) {
        let row = row?;
        assert!(std::any::type_name_of_val(&row).ends_with("RecordsetRow"));
        assert_eq!(row.get_as::<i64>("id")?, expected_id);
        seen.push(row.get_as::<String>("field1")?);
    }
    assert_eq!(seen, ["Test 1", "Test 2"]);

    Ok(())
}

/// The count is known before any row is read and does not change while
/// iterating
#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_count_is_stable_while_iterating(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let mut rs = db.conn.select(&format!("SELECT field1 FROM {TEST_TABLE}"), ())?;
    assert_eq!(rs.row_count(), 2);
    assert!(rs.next().is_some());
    assert_eq!(rs.row_count(), 2);
    assert!(rs.next().is_some());
    assert!(rs.next().is_none());
    assert!(rs.is_exhausted());
    assert_eq!(rs.row_count(), 2);

    Ok(())
}

/// An empty result is a recordset with zero rows, not an error
#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_empty_select(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let mut rs = db
        .conn
        .select(&format!("SELECT * FROM {TEST_TABLE} WHERE id = 300"), ())?;
    assert_eq!(rs.row_count(), 0);
    assert!(rs.is_empty());
    assert!(rs.next().is_none());

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_get_one_value(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let value = db.conn.get_one_value_as::<i64>(
        &format!("SELECT field2 FROM {TEST_TABLE} ORDER BY field1 DESC LIMIT 1"),
        (),
    )?;
    assert_eq!(value, Some(20));

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_get_one_value_without_rows(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let value = db
        .conn
        .get_one_value(&format!("SELECT field2 FROM {TEST_TABLE} WHERE id = 300"), ())?;
    assert_eq!(value, None);

    Ok(())
}

/// A NULL in the first column is a value, distinct from "no rows"
#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_get_one_value_null(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    db.conn.insert(TEST_TABLE, [("field1", Value::Null), ("field2", Value::from(30))])?;
    let value = db.conn.get_one_value(
        &format!("SELECT field1 FROM {TEST_TABLE} WHERE field2 = 30"),
        (),
    )?;
    assert_eq!(value, Some(Value::Null));

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_get_one_row(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let row = db
        .conn
        .get_one_row(
            &format!("SELECT * FROM {TEST_TABLE} ORDER BY field1 ASC LIMIT 1"),
            (),
        )?
        .expect("fixture has rows");
    assert!(std::any::type_name_of_val(&row).ends_with("RecordsetRow"));
    assert_eq!(row.get_as::<String>("field1")?, "Test 1");
    assert_eq!(row.get_as::<i64>("field2")?, 10);
    assert_eq!(row.get_as::<i64>("id")?, 1);

    let none = db
        .conn
        .get_one_row(&format!("SELECT * FROM {TEST_TABLE} WHERE id = 300"), ())?;
    assert!(none.is_none());

    Ok(())
}

/// OUT parameters are read back through a session variable
#[rstest]
#[case::mysql(TestDriver::Mysql)]
fn test_call_procedure_with_session_variable(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    db.conn.execute(&format!("CALL {TEST_PROCEDURE}(@test)"), ())?;
    let value = db.conn.get_one_value_as::<i64>("SELECT @test", ())?;
    assert_eq!(value, Some(2));

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_insert_helper(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let result = db.conn.insert(
        TEST_TABLE,
        [("field1", Value::from("Test 3")), ("field2", Value::from(30))],
    )?;
    assert_eq!(result.affected_rows, 1);
    assert_eq!(result.last_insert_id, Some(3));

    let statement = db
        .conn
        .insert_sql(TEST_TABLE, [("field1", "it's"), ("field2", "40")])?;
    db.conn.execute(&statement, ())?;
    let value = db.conn.get_one_value_as::<String>(
        &format!("SELECT field1 FROM {TEST_TABLE} WHERE field2 = ?"),
        40,
    )?;
    assert_eq!(value.as_deref(), Some("it's"));

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_update_reports_affected_rows(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let result = db
        .conn
        .execute(&format!("UPDATE {TEST_TABLE} SET field2 = field2 + 1"), ())?;
    assert_eq!(result.affected_rows, 2);
    assert_eq!(result.last_insert_id, None);

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_close(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    assert!(!db.conn.is_closed());
    db.conn.close()?;

    Ok(())
}
