use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgColumn, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::warn;

use etl_core::{Cell, RecordSet};

use super::SourceError;

/// Read-only extraction from the relational source. The pool is opened
/// once per run and closed before the transform stages begin.
pub struct RelationalSource {
    pool: PgPool,
}

impl RelationalSource {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SourceError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|error| SourceError::Connection { error })?;

        Ok(Self { pool })
    }

    /// `SELECT *` over one table, decoded column by column into cells.
    /// An empty table yields an empty record set with no columns.
    pub async fn fetch_table(&self, table: &str) -> Result<RecordSet, SourceError> {
        let query = format!(r#"SELECT * FROM "{}""#, table.replace('"', "\"\""));
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| SourceError::TableRead {
                table: table.to_string(),
                error,
            })?;

        let Some(first) = rows.first() else {
            return Ok(RecordSet::default());
        };

        let columns = first
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let mut set = RecordSet::new(columns);

        for row in &rows {
            let cells = row
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, column)| decode_cell(row, idx, column))
                .collect();
            set.push_row(cells);
        }

        Ok(set)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn decode_cell(row: &PgRow, idx: usize, column: &PgColumn) -> Cell {
    let type_name = column.type_info().name();
    let decoded = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .map(|v| v.map(Cell::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(|v| Cell::Int(i64::from(v)))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(|v| Cell::Int(i64::from(v)))),
        "INT8" => row.try_get::<Option<i64>, _>(idx).map(|v| v.map(Cell::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map(|v| Cell::Float(f64::from(v)))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.map(Cell::Float)),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(idx)
            .map(|v| v.map(|v| numeric_cell(&v))),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.map(Cell::Date)),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(|v| Cell::Timestamp(DateTime::<Utc>::from_naive_utc_and_offset(v, Utc)))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map(Cell::Timestamp)),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .map(|v| v.map(Cell::Nested)),
        // TEXT, VARCHAR, CHAR and friends, plus a last-resort attempt for
        // anything we don't know how to decode.
        _ => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(Cell::Text)),
    };

    match decoded {
        Ok(Some(cell)) => cell,
        Ok(None) => Cell::Null,
        Err(error) => {
            warn!(
                column = column.name(),
                column_type = type_name,
                "could not decode value, storing null: {}",
                error
            );
            Cell::Null
        }
    }
}

fn numeric_cell(value: &BigDecimal) -> Cell {
    match value.to_f64() {
        Some(v) => Cell::Float(v),
        None => Cell::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn numeric_values_become_floats() {
        let value = BigDecimal::from_str("7.25").unwrap();
        assert_eq!(numeric_cell(&value), Cell::Float(7.25));
    }
}
