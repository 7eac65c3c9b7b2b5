//! Request pipeline
//!
//! schema lookup → SQL loop → empty-result gate → analysis loop. Each loop
//! invocation runs under the configured wall-clock timeout.

use crate::config::CopilotConfig;
use crate::db::{Database, TableSchema};
use crate::error::{CopilotError, Result};
use crate::execution::AnalysisOutput;
use crate::execution_loop::LoopResult;
use crate::llm::GenerationModel;
use crate::services::{AnalysisService, SqlService};
use polars::prelude::DataFrame;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const NO_DATA_NOTE: &str = "No data retrieved from SQL query. Cannot perform analysis.";
pub const SQL_FAILED_NOTE: &str = "Analysis skipped because no SQL query succeeded.";

/// Everything produced for one question
#[derive(Debug)]
pub struct CopilotReport {
    pub table: String,
    pub question: String,
    pub schema: TableSchema,
    pub sql: LoopResult<DataFrame>,
    pub analysis: Option<LoopResult<AnalysisOutput>>,
    /// Why the analysis stage did not run
    pub note: Option<String>,
}

pub struct Copilot {
    db: Arc<dyn Database>,
    sql: SqlService,
    analysis: AnalysisService,
    timeout: Duration,
}

impl Copilot {
    pub fn new(config: &CopilotConfig, model: Arc<dyn GenerationModel>, db: Arc<dyn Database>) -> Self {
        let sql = SqlService::new(Arc::clone(&model), Arc::clone(&db), config.max_attempts);
        let analysis = AnalysisService::new(model)
            .with_max_attempts(config.max_attempts)
            .with_sample_rows(config.sample_rows)
            .with_policy(config.missing_result);

        Self {
            db,
            sql,
            analysis,
            timeout: config.request_timeout,
        }
    }

    pub async fn tables(&self) -> Result<Vec<String>> {
        self.db.list_tables().await
    }

    pub async fn schema(&self, table: &str) -> Result<TableSchema> {
        self.db.table_schema(table).await
    }

    pub async fn ask(&self, table: &str, question: &str) -> Result<CopilotReport> {
        let schema = self.db.table_schema(table).await?;
        let context = schema.to_create_statement();

        let sql = self
            .bounded(self.sql.generate_sql_query(question, &context))
            .await?;

        let (analysis, note) = match sql.result() {
            None => {
                warn!("SQL generation exhausted after {} attempts", sql.attempts_used());
                (None, Some(SQL_FAILED_NOTE.to_string()))
            }
            Some(df) if df.height() == 0 => {
                info!("Query returned no rows; skipping analysis");
                (None, Some(NO_DATA_NOTE.to_string()))
            }
            Some(df) => {
                let analysis = self
                    .bounded(self.analysis.generate_analysis(question, df))
                    .await??;
                (Some(analysis), None)
            }
        };

        Ok(CopilotReport {
            table: table.to_string(),
            question: question.to_string(),
            schema,
            sql,
            analysis,
            note,
        })
    }

    async fn bounded<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CopilotError::Timeout(self.timeout))
    }
}
