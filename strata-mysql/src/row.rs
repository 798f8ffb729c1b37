//! Row decoding for MySQL.

use mysql_async::Value;
use serde_json::Value as JsonValue;
use strata_core::Row;

use crate::types::from_mysql_value;

/// Decode a MySQL row into column name to JSON value, in select order.
pub fn decode_row(row: &mysql_async::Row) -> Row {
    row.columns_ref()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value: Option<Value> = row.get(i);
            (
                column.name_str().into_owned(),
                value.map_or(JsonValue::Null, |v| {
                    from_mysql_value(v, column.column_type(), column.decimals())
                }),
            )
        })
        .collect()
}
