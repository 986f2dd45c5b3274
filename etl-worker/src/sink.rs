use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;
use tracing::info;

use etl_core::{Cell, RecordSet};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("warehouse connection failed with: {error}")]
    Connection { error: sqlx::Error },

    #[error("{command} query failed with: {error}")]
    Query { command: String, error: sqlx::Error },
}

/// Destination for the unified record set. The table schema is derived
/// from the data at write time and the write replaces any existing table
/// of the same name.
#[async_trait]
pub trait WarehouseSink {
    async fn replace_table(&self, table: &str, set: &RecordSet) -> Result<(), SinkError>;
}

pub struct PostgresWarehouse {
    url: String,
    insert_chunk_size: usize,
}

impl PostgresWarehouse {
    pub fn new(url: impl Into<String>, insert_chunk_size: usize) -> Self {
        Self {
            url: url.into(),
            insert_chunk_size: insert_chunk_size.max(1),
        }
    }
}

#[async_trait]
impl WarehouseSink for PostgresWarehouse {
    async fn replace_table(&self, table: &str, set: &RecordSet) -> Result<(), SinkError> {
        // The destination connection lives only for the duration of this
        // write; nothing else in the run touches the warehouse.
        let pool = PgPoolOptions::new()
            .connect(&self.url)
            .await
            .map_err(|error| SinkError::Connection { error })?;

        let types = column_types(set);

        let drop_sql = format!("DROP TABLE IF EXISTS {}", quote_ident(table));
        sqlx::query(&drop_sql)
            .execute(&pool)
            .await
            .map_err(|error| SinkError::Query {
                command: "DROP TABLE".to_string(),
                error,
            })?;

        let create_sql = create_table_sql(table, set.columns(), &types);
        sqlx::query(&create_sql)
            .execute(&pool)
            .await
            .map_err(|error| SinkError::Query {
                command: "CREATE TABLE".to_string(),
                error,
            })?;

        for chunk in set.rows().chunks(self.insert_chunk_size) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(insert_prefix(table, set.columns()));
            qb.push_values(chunk, |mut b, row| {
                for (cell, ty) in row.iter().zip(&types) {
                    push_cell(&mut b, cell, *ty);
                }
            });
            qb.build()
                .execute(&pool)
                .await
                .map_err(|error| SinkError::Query {
                    command: "INSERT".to_string(),
                    error,
                })?;
        }

        info!(table = table, rows = set.len(), "replaced warehouse table");
        pool.close().await;
        Ok(())
    }
}

/// SQL column types, unified per column over the cells actually present.
/// Integer and float cells unify to double precision; any other mixture
/// falls back to text, as does an all-null column.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SqlType {
    Bigint,
    Double,
    Boolean,
    Date,
    Timestamptz,
    Text,
}

impl SqlType {
    fn ddl(self) -> &'static str {
        match self {
            SqlType::Bigint => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Date => "DATE",
            SqlType::Timestamptz => "TIMESTAMPTZ",
            SqlType::Text => "TEXT",
        }
    }
}

fn column_types(set: &RecordSet) -> Vec<SqlType> {
    (0..set.columns().len())
        .map(|idx| {
            let mut unified: Option<SqlType> = None;
            for row in set.rows() {
                let ty = match &row[idx] {
                    Cell::Absent | Cell::Null => continue,
                    Cell::Bool(_) => SqlType::Boolean,
                    Cell::Int(_) => SqlType::Bigint,
                    Cell::Float(_) => SqlType::Double,
                    Cell::Date(_) => SqlType::Date,
                    Cell::Timestamp(_) => SqlType::Timestamptz,
                    _ => SqlType::Text,
                };
                unified = Some(match unified {
                    None => ty,
                    Some(prev) if prev == ty => prev,
                    Some(SqlType::Bigint) if ty == SqlType::Double => SqlType::Double,
                    Some(SqlType::Double) if ty == SqlType::Bigint => SqlType::Double,
                    Some(_) => SqlType::Text,
                });
                if unified == Some(SqlType::Text) {
                    break;
                }
            }
            unified.unwrap_or(SqlType::Text)
        })
        .collect()
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str, columns: &[String], types: &[SqlType]) -> String {
    let definitions = columns
        .iter()
        .zip(types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.ddl()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), definitions)
}

fn insert_prefix(table: &str, columns: &[String]) -> String {
    let names = columns
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) ", quote_ident(table), names)
}

fn push_cell<'qb, 'args>(
    b: &mut Separated<'qb, 'args, Postgres, &'static str>,
    cell: &Cell,
    ty: SqlType,
) {
    match ty {
        SqlType::Bigint => {
            b.push_bind(match cell {
                Cell::Int(v) => Some(*v),
                _ => None,
            });
        }
        SqlType::Double => {
            b.push_bind(match cell {
                Cell::Float(v) => Some(*v),
                Cell::Int(v) => Some(*v as f64),
                _ => None,
            });
        }
        SqlType::Boolean => {
            b.push_bind(match cell {
                Cell::Bool(v) => Some(*v),
                _ => None,
            });
        }
        SqlType::Date => {
            b.push_bind(match cell {
                Cell::Date(v) => Some(*v),
                _ => None,
            });
        }
        SqlType::Timestamptz => {
            b.push_bind(match cell {
                Cell::Timestamp(v) => Some(*v),
                _ => None,
            });
        }
        SqlType::Text => {
            b.push_bind(cell.as_display_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_numeric_columns_unify_to_double() {
        let mut set = RecordSet::new(vec!["v".to_string()]);
        set.push_row(vec![Cell::Int(1)]);
        set.push_row(vec![Cell::Float(2.5)]);
        assert_eq!(column_types(&set), [SqlType::Double]);
    }

    #[test]
    fn nulls_do_not_influence_the_column_type() {
        let mut set = RecordSet::new(vec!["v".to_string()]);
        set.push_row(vec![Cell::Null]);
        set.push_row(vec![Cell::Int(3)]);
        assert_eq!(column_types(&set), [SqlType::Bigint]);
    }

    #[test]
    fn incompatible_mixtures_and_all_null_columns_fall_back_to_text() {
        let mut set = RecordSet::new(vec!["a".to_string(), "b".to_string()]);
        set.push_row(vec![Cell::Int(1), Cell::Null]);
        set.push_row(vec![Cell::Bool(true), Cell::Null]);
        assert_eq!(column_types(&set), [SqlType::Text, SqlType::Text]);
    }

    #[test]
    fn ddl_quotes_identifiers() {
        let sql = create_table_sql(
            "integrated_data",
            &["pais".to_string(), "precio_big_mac_usd".to_string()],
            &[SqlType::Text, SqlType::Double],
        );
        assert_eq!(
            sql,
            r#"CREATE TABLE "integrated_data" ("pais" TEXT, "precio_big_mac_usd" DOUBLE PRECISION)"#
        );
    }
}
