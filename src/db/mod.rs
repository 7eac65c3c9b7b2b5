//! Database backends
//!
//! The SQL loop only sees [`Database`]: a dialect, a way to run a query into a
//! DataFrame, and schema lookup for prompt context.

pub mod connection;
pub mod local;
pub mod postgres;

use crate::error::Result;
use crate::validate::SqlDialect;
use async_trait::async_trait;
use polars::prelude::DataFrame;
use serde::Serialize;

pub use connection::{init_pool, DbPool};
pub use local::LocalDatabase;
pub use postgres::PostgresDatabase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Ordered column list of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Render as `CREATE TABLE t (\n    col type NULL,\n ...\n);`
    pub fn to_create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                format!(
                    "    {} {} {}",
                    c.name,
                    c.data_type,
                    if c.nullable { "NULL" } else { "NOT NULL" }
                )
            })
            .collect::<Vec<_>>()
            .join(",\n");

        format!("CREATE TABLE {} (\n{}\n);", self.table, columns)
    }
}

#[async_trait]
pub trait Database: Send + Sync {
    fn dialect(&self) -> SqlDialect;

    /// Run one statement and collect its rows
    async fn run(&self, sql: &str) -> Result<DataFrame>;

    async fn table_schema(&self, table: &str) -> Result<TableSchema>;

    async fn list_tables(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_statement_rendering() {
        let schema = TableSchema {
            table: "people".to_string(),
            columns: vec![
                ColumnSchema {
                    name: "city".to_string(),
                    data_type: "text".to_string(),
                    nullable: true,
                },
                ColumnSchema {
                    name: "income".to_string(),
                    data_type: "integer".to_string(),
                    nullable: false,
                },
            ],
        };
        assert_eq!(
            schema.to_create_statement(),
            "CREATE TABLE people (\n    city text NULL,\n    income integer NOT NULL\n);"
        );
    }
}
