use crate::db::Database;
use crate::execution::QueryExecutor;
use crate::execution_loop::{LoopResult, RetryLoop};
use crate::llm::GenerationModel;
use crate::prompts::SqlPrompt;
use crate::validate::SqlSyntaxValidator;
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::info;

/// Wording used in the exhaustion report
pub const SQL_ARTIFACT: &str = "a valid SQL query";

/// Question → SQL → rows, with syntax validation before every execution
pub struct SqlService {
    retry: RetryLoop<SqlPrompt, QueryExecutor>,
}

impl SqlService {
    pub fn new(model: Arc<dyn GenerationModel>, db: Arc<dyn Database>, max_attempts: u32) -> Self {
        let dialect = db.dialect();
        let retry = RetryLoop::new("sql", model, SqlPrompt::new(dialect), QueryExecutor::new(db))
            .with_validator(SqlSyntaxValidator::new(dialect))
            .with_max_attempts(max_attempts);
        Self { retry }
    }

    /// `schema` is the rendered `CREATE TABLE` context for the target table
    pub async fn generate_sql_query(&self, question: &str, schema: &str) -> LoopResult<DataFrame> {
        info!("Generating SQL for: {}", question);
        self.retry.run(question, schema).await
    }
}
