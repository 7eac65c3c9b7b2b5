//! PostgreSQL backend
//!
//! Generated SQL is sent over the simple query protocol, so every value comes
//! back in text format. Columns are rebuilt as typed Polars series from the
//! reported type names.

use crate::db::connection::{init_pool, DbPool};
use crate::db::{ColumnSchema, Database, TableSchema};
use crate::error::{CopilotError, Result};
use crate::validate::SqlDialect;
use async_trait::async_trait;
use polars::prelude::*;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use sqlx::postgres::PgRow;
use sqlx::{Column, Executor, Row, TypeInfo};
use std::collections::HashSet;
use tracing::debug;

const SCHEMA_QUERY: &str = r#"
SELECT column_name::text, data_type::text, is_nullable::text
FROM information_schema.columns
WHERE table_schema = 'public' AND table_name = $1
ORDER BY ordinal_position
"#;

const TABLES_QUERY: &str = r#"
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = 'public'
ORDER BY table_name
"#;

pub struct PostgresDatabase {
    pool: DbPool,
}

impl PostgresDatabase {
    /// Connect and verify; an unreachable database is a setup error
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = init_pool(database_url)
            .await
            .map_err(|e| CopilotError::Database(format!("Failed to connect to database: {}", e)))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::PostgreSql
    }

    async fn run(&self, sql: &str) -> Result<DataFrame> {
        // The simple protocol returns every result set's rows in one list
        let statements = statement_count(sql);
        if statements > 1 {
            return Err(CopilotError::Database(format!(
                "Expected a single SQL statement, got {}",
                statements
            )));
        }

        // One connection per attempt, returned to the pool on drop
        let mut conn = self.pool.acquire().await?;
        let rows = conn.fetch_all(sql).await?;
        debug!("Query returned {} rows", rows.len());
        rows_to_dataframe(&rows)
    }

    async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(SCHEMA_QUERY)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(CopilotError::Schema(format!(
                "Table '{}' not found or has no columns",
                table
            )));
        }

        Ok(TableSchema {
            table: table.to_string(),
            columns: rows
                .into_iter()
                .map(|(name, data_type, is_nullable)| ColumnSchema {
                    name,
                    data_type,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                })
                .collect(),
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(TABLES_QUERY).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

/// Statements separated by top-level semicolons; text that fails to tokenize counts as one
fn statement_count(sql: &str) -> usize {
    let dialect = PostgreSqlDialect {};
    let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(_) => return 1,
    };

    tokens
        .split(|t| matches!(t, Token::SemiColon))
        .filter(|part| part.iter().any(|t| !matches!(t, Token::Whitespace(_))))
        .count()
        .max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "INT2" | "INT4" | "INT8" | "OID" => ColumnKind::Integer,
        "FLOAT4" | "FLOAT8" | "NUMERIC" => ColumnKind::Float,
        "BOOL" => ColumnKind::Boolean,
        _ => ColumnKind::Text,
    }
}

/// Polars needs unique column names; repeated ones get a numeric suffix
fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|name| {
            let mut candidate = name.to_string();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}_{}", name, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

fn text_to_series(name: &str, kind: ColumnKind, values: &[Option<String>]) -> Series {
    match kind {
        ColumnKind::Integer => {
            let parsed: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse().ok()))
                .collect();
            Series::new(name, parsed)
        }
        ColumnKind::Float => {
            let parsed: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse().ok()))
                .collect();
            Series::new(name, parsed)
        }
        ColumnKind::Boolean => {
            let parsed: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v.as_deref() {
                    Some("t") | Some("true") => Some(true),
                    Some("f") | Some("false") => Some(false),
                    _ => None,
                })
                .collect();
            Series::new(name, parsed)
        }
        ColumnKind::Text => Series::new(name, values.to_vec()),
    }
}

fn rows_to_dataframe(rows: &[PgRow]) -> Result<DataFrame> {
    let Some(first) = rows.first() else {
        return Ok(DataFrame::empty());
    };

    let names = unique_names(first.columns().iter().map(|c| c.name()));
    let mut series = Vec::with_capacity(names.len());

    for (idx, (column, name)) in first.columns().iter().zip(&names).enumerate() {
        let values = rows
            .iter()
            .map(|row| row.try_get_unchecked::<Option<String>, _>(idx))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        series.push(text_to_series(name, column_kind(column.type_info().name()), &values));
    }

    Ok(DataFrame::new(series)?)
}
