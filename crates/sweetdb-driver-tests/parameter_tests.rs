//! Parameter binding tests for all database drivers.
//!
//! Positional `?` and named `:name` placeholders must bind identically on
//! every driver, and every binding mistake must surface as a logic error
//! before anything reaches the server.

use crate::fixtures::{TEST_TABLE, TestDriver, test_database};
use anyhow::Result;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sweetdb_connection::{Params, SweetError, Value};

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_positional_single_value(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let value = db.conn.get_one_value_as::<i64>(
        &format!("SELECT field2 FROM {TEST_TABLE} WHERE id=?"),
        1,
    )?;
    assert_eq!(value, Some(10));

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_positional_sequence(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let value = db.conn.get_one_value_as::<i64>(
        &format!("SELECT field2 FROM {TEST_TABLE} WHERE id=? AND field2<>?"),
        [1, 300],
    )?;
    assert_eq!(value, Some(10));

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_named_single_value(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let value = db.conn.get_one_value_as::<i64>(
        &format!("SELECT field2 FROM {TEST_TABLE} WHERE id=:id"),
        Params::named([(":id", 1)]),
    )?;
    assert_eq!(value, Some(10));

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_named_map(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let value = db.conn.get_one_value_as::<i64>(
        &format!("SELECT field2 FROM {TEST_TABLE} WHERE id=:id AND field2<>:idd"),
        Params::named([("idd", 300), ("id", 1)]),
    )?;
    assert_eq!(value, Some(10));

    Ok(())
}

/// One name used twice binds the same value at both places
#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_named_repeated(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let rs = db.conn.select(
        &format!("SELECT id FROM {TEST_TABLE} WHERE field2 = :v OR field2 = :v + 10"),
        Params::named([("v", 10)]),
    )?;
    assert_eq!(rs.row_count(), 2);

    Ok(())
}

/// Placeholder characters inside string literals are data, not parameters
#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_placeholders_in_literals_are_ignored(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    let row = db
        .conn
        .get_one_row(
            &format!("SELECT 'what?' AS q, ':id' AS n, field1 FROM {TEST_TABLE} WHERE id = ?"),
            2,
        )?
        .expect("row 2 exists");
    assert_eq!(row.get_as::<String>("q")?, "what?");
    assert_eq!(row.get_as::<String>("n")?, ":id");
    assert_eq!(row.get_as::<String>("field1")?, "Test 2");

    Ok(())
}

#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_null_parameter(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };

    db.conn.execute(
        &format!("UPDATE {TEST_TABLE} SET field1 = ? WHERE id = ?"),
        [Value::Null, Value::from(1)],
    )?;
    let value = db
        .conn
        .get_one_value(&format!("SELECT field1 FROM {TEST_TABLE} WHERE id = 1"), ())?;
    assert_eq!(value, Some(Value::Null));

    Ok(())
}

/// Binding mistakes are logic errors raised before the query runs
#[rstest]
#[case::sqlite(TestDriver::Sqlite)]
#[case::mysql(TestDriver::Mysql)]
fn test_binding_mismatches_are_logic_errors(#[case] driver: TestDriver) -> Result<()> {
    let Some(db) = test_database(driver)? else {
        return Ok(());
    };
    let positional = format!("SELECT field2 FROM {TEST_TABLE} WHERE id=?");
    let named = format!("SELECT field2 FROM {TEST_TABLE} WHERE id=:id");

    let cases = [
        db.conn.select(&positional, [1, 2]).err(),
        db.conn.select(&positional, Params::Positional(Vec::new())).err(),
        db.conn.select(&positional, Params::named([("id", 1)])).err(),
        db.conn.select(&named, 1).err(),
        db.conn.select(&named, Params::named([("other", 1)])).err(),
        db.conn
            .select(&named, Params::named([("id", 1), ("extra", 2)]))
            .err(),
    ];

    for (i, err) in cases.into_iter().enumerate() {
        let err = err.unwrap_or_else(|| panic!("case {i} should fail"));
        assert!(
            matches!(err, SweetError::Logic(_)),
            "case {i}: expected logic error, got {err}"
        );
    }

    Ok(())
}
