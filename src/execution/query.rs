//! Query executor - runs generated SQL against a database backend

use crate::db::Database;
use crate::execution_loop::{ArtifactExecutor, ExecutionOutcome};
use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::debug;

pub struct QueryExecutor {
    db: Arc<dyn Database>,
}

impl QueryExecutor {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ArtifactExecutor for QueryExecutor {
    type Output = DataFrame;

    async fn execute(&self, sql: &str) -> ExecutionOutcome<DataFrame> {
        match self.db.run(sql).await {
            Ok(df) => {
                debug!("Query produced {} rows x {} columns", df.height(), df.width());
                ExecutionOutcome::Success(df)
            }
            Err(e) => ExecutionOutcome::Failure(format!("Database execution error: {}", e)),
        }
    }
}
