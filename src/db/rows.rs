use crate::db::models::Row;
use serde_json::{Number, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// Convert an engine row into a column-ordered JSON map.
///
/// Values are decoded by their runtime storage class rather than the declared
/// column type, so console queries over expressions come back with natural types.
pub fn normalize_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(row.len());
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" => Number::from_f64(row.try_get_unchecked::<f64, _>(idx)?)
                    .map_or(Value::Null, Value::Number),
                "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}
