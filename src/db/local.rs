//! Local CSV-backed database
//!
//! Each CSV file becomes one table named after its file stem. Queries run
//! through the Polars SQL context, which speaks a generic ANSI dialect.

use crate::db::{ColumnSchema, Database, TableSchema};
use crate::error::{CopilotError, Result};
use crate::validate::SqlDialect;
use async_trait::async_trait;
use polars::prelude::*;
use polars::sql::SQLContext;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Default, Clone)]
pub struct LocalDatabase {
    tables: BTreeMap<String, DataFrame>,
}

impl LocalDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_csv_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut db = Self::new();
        for path in paths {
            db.load_csv(path.as_ref())?;
        }
        Ok(db)
    }

    /// Load one CSV file; returns the table name it was registered under
    pub fn load_csv(&mut self, path: &Path) -> Result<String> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CopilotError::Config(format!("Cannot derive a table name from {}", path.display()))
            })?
            .to_string();

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()?
            .collect()?;

        info!("Loaded table '{}' ({} rows) from {}", name, df.height(), path.display());
        self.register(name.clone(), df);
        Ok(name)
    }

    pub fn register(&mut self, name: impl Into<String>, df: DataFrame) {
        self.tables.insert(name.into(), df);
    }

    fn table(&self, name: &str) -> Result<&DataFrame> {
        self.tables
            .get(name)
            .ok_or_else(|| CopilotError::Schema(format!("Table '{}' not found", name)))
    }
}

fn sql_type_name(dtype: &DataType) -> String {
    match dtype {
        DataType::Boolean => "boolean".to_string(),
        DataType::Int8 | DataType::Int16 | DataType::UInt8 => "smallint".to_string(),
        DataType::Int32 | DataType::UInt16 => "integer".to_string(),
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => "bigint".to_string(),
        DataType::Float32 => "real".to_string(),
        DataType::Float64 => "double precision".to_string(),
        DataType::String => "text".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Database for LocalDatabase {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Generic
    }

    async fn run(&self, sql: &str) -> Result<DataFrame> {
        let tables = self.tables.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || -> Result<DataFrame> {
            let mut ctx = SQLContext::new();
            for (name, df) in tables {
                ctx.register(&name, df.lazy());
            }
            Ok(ctx.execute(&sql)?.collect()?)
        })
        .await
        .map_err(|e| CopilotError::Execution(format!("Query task failed: {}", e)))?
    }

    async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        let df = self.table(table)?;
        Ok(TableSchema {
            table: table.to_string(),
            columns: df
                .get_columns()
                .iter()
                .map(|s| ColumnSchema {
                    name: s.name().to_string(),
                    data_type: sql_type_name(s.dtype()),
                    nullable: true,
                })
                .collect(),
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_db() -> LocalDatabase {
        let mut db = LocalDatabase::new();
        db.register(
            "people",
            df! {
                "city" => &["Oslo", "Lima", "Oslo"],
                "income" => &[52000i64, 31000, 48000],
            }
            .unwrap(),
        );
        db
    }

    #[tokio::test]
    async fn test_run_filters_rows() {
        let db = people_db();
        let df = db
            .run("SELECT city, income FROM people WHERE income > 40000")
            .await
            .unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names(), vec!["city", "income"]);
    }

    #[tokio::test]
    async fn test_unknown_table_is_an_error() {
        let db = people_db();
        assert!(db.run("SELECT * FROM missing").await.is_err());
        assert!(db.table_schema("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_schema_from_dtypes() {
        let schema = people_db().table_schema("people").await.unwrap();
        assert_eq!(
            schema.to_create_statement(),
            "CREATE TABLE people (\n    city text NULL,\n    income bigint NULL\n);"
        );
        assert_eq!(people_db().list_tables().await.unwrap(), vec!["people"]);
        assert_eq!(people_db().dialect(), SqlDialect::Generic);
    }

    #[tokio::test]
    async fn test_load_csv_uses_file_stem() {
        let dir = std::env::temp_dir().join(format!("query-copilot-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sales.csv");
        std::fs::write(&path, "region,amount\nnorth,10\nsouth,32\n").unwrap();

        let db = LocalDatabase::from_csv_files(&[&path]).unwrap();
        assert_eq!(db.list_tables().await.unwrap(), vec!["sales"]);
        let df = db.run("SELECT SUM(amount) AS total FROM sales").await.unwrap();
        assert_eq!(df.height(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
