//! Code executor - runs generated analysis JavaScript with boa_engine
//!
//! Every attempt gets a fresh interpreter context with three bindings:
//! `df` (the retrieved rows as objects), `columns` and `chart`. The routine
//! reports its answer through a top-level `result` binding.

use crate::error::Result;
use crate::execution::result::{column_names, dataframe_to_rows};
use crate::execution_loop::{ArtifactExecutor, ExecutionOutcome};
use async_trait::async_trait;
use boa_engine::{Context, Source};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What to do when the routine finishes without assigning `result`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MissingResultPolicy {
    /// Succeed with [`AnalysisValue::NothingComputed`]
    #[default]
    Accept,
    /// Treat as an execution failure so the model is asked to fix it
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AnalysisValue {
    Computed(Value),
    NothingComputed,
}

/// Everything a successful routine produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutput {
    pub value: AnalysisValue,
    /// Chart specifications in `chart.attach` call order
    pub charts: Vec<Value>,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CodeLimits {
    pub max_code_bytes: usize,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for CodeLimits {
    fn default() -> Self {
        Self {
            max_code_bytes: 100 * 1024,
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
            timeout: Duration::from_secs(30),
            max_output_bytes: 1024 * 1024,
        }
    }
}

const PRELUDE: &str = r#"
var __console_logs = [];
var __log = function() {
    var args = [];
    for (var i = 0; i < arguments.length; i++) {
        if (typeof arguments[i] === 'object') {
            args.push(JSON.stringify(arguments[i]));
        } else {
            args.push(String(arguments[i]));
        }
    }
    __console_logs.push(args.join(' '));
};
var console = { log: __log, info: __log, warn: __log, error: __log };
var __charts = [];
var chart = {
    attach: function(spec) { __charts.push(spec); }
};
"#;

const EPILOGUE: &str = r#"
(function() {
    var __has_result = typeof result !== 'undefined';
    return JSON.stringify({
        "has_result": __has_result,
        "result": __has_result ? result : null,
        "charts": __charts,
        "logs": __console_logs
    });
})();
"#;

#[derive(Debug, Deserialize)]
struct ScriptReport {
    has_result: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    charts: Vec<Value>,
    #[serde(default)]
    logs: Vec<String>,
}

/// Executes analysis code against one fixed result set
pub struct CodeExecutor {
    columns_json: Arc<str>,
    rows_json: Arc<str>,
    policy: MissingResultPolicy,
    limits: CodeLimits,
}

impl CodeExecutor {
    /// Bind the executor to `df`; the rows are serialized once here
    pub fn new(df: &DataFrame) -> Result<Self> {
        let columns_json = serde_json::to_string(&column_names(df))?;
        let rows_json = serde_json::to_string(&dataframe_to_rows(df)?)?;
        Ok(Self {
            columns_json: columns_json.into(),
            rows_json: rows_json.into(),
            policy: MissingResultPolicy::default(),
            limits: CodeLimits::default(),
        })
    }

    pub fn with_policy(mut self, policy: MissingResultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limits(mut self, limits: CodeLimits) -> Self {
        self.limits = limits;
        self
    }

    fn interpret(&self, report: ScriptReport) -> ExecutionOutcome<AnalysisOutput> {
        let value = if report.has_result {
            AnalysisValue::Computed(report.result)
        } else {
            match self.policy {
                MissingResultPolicy::Accept => AnalysisValue::NothingComputed,
                MissingResultPolicy::Reject => {
                    return ExecutionOutcome::Failure(
                        "Error executing code: the code did not assign a value to `result`".to_string(),
                    )
                }
            }
        };

        ExecutionOutcome::Success(AnalysisOutput {
            value,
            charts: report.charts,
            logs: report.logs,
        })
    }
}

/// Run one script to completion on the current thread; returns the epilogue JSON
fn run_script(
    code: &str,
    columns_json: &str,
    rows_json: &str,
    limits: &CodeLimits,
) -> std::result::Result<String, String> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(limits.loop_iteration_limit);
    context.runtime_limits_mut().set_recursion_limit(limits.recursion_limit);

    // A JSON string is a valid JS string literal, so the data needs no extra escaping
    let bindings = format!(
        "var columns = JSON.parse({});\nvar df = JSON.parse({});\n",
        serde_json::to_string(columns_json).map_err(|e| e.to_string())?,
        serde_json::to_string(rows_json).map_err(|e| e.to_string())?,
    );

    let full_code = format!("{}{}\n{}\n;\n{}", PRELUDE, bindings, code, EPILOGUE);

    let value = match context.eval(Source::from_bytes(&full_code)) {
        Ok(value) => value,
        Err(e) => {
            let message = match e.try_native(&mut context) {
                Ok(native) => native.to_string(),
                Err(_) => e.to_string(),
            };
            return Err(message);
        }
    };

    value
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| "analysis wrapper did not return a string".to_string())
}

#[async_trait]
impl ArtifactExecutor for CodeExecutor {
    type Output = AnalysisOutput;

    async fn execute(&self, code: &str) -> ExecutionOutcome<AnalysisOutput> {
        if code.trim().is_empty() {
            return ExecutionOutcome::Failure("Error executing code: no code was generated".to_string());
        }
        if code.len() > self.limits.max_code_bytes {
            return ExecutionOutcome::Failure(format!(
                "Error executing code: code is {} bytes, limit is {}",
                code.len(),
                self.limits.max_code_bytes
            ));
        }

        let code = code.to_string();
        let columns_json = Arc::clone(&self.columns_json);
        let rows_json = Arc::clone(&self.rows_json);
        let limits = self.limits.clone();

        // boa is synchronous; the loop-iteration limit stops runaway scripts after a timeout
        let task = tokio::task::spawn_blocking(move || run_script(&code, &columns_json, &rows_json, &limits));

        let raw = match tokio::time::timeout(self.limits.timeout, task).await {
            Err(_) => {
                return ExecutionOutcome::Failure(format!(
                    "Error executing code: execution timed out after {}s",
                    self.limits.timeout.as_secs()
                ))
            }
            Ok(Err(join_error)) => {
                return ExecutionOutcome::Failure(format!("Error executing code: {}", join_error))
            }
            Ok(Ok(Err(message))) => return ExecutionOutcome::Failure(format!("Error executing code: {}", message)),
            Ok(Ok(Ok(raw))) => raw,
        };

        if raw.len() > self.limits.max_output_bytes {
            return ExecutionOutcome::Failure(format!(
                "Error executing code: output is {} bytes, limit is {}",
                raw.len(),
                self.limits.max_output_bytes
            ));
        }

        match serde_json::from_str::<ScriptReport>(&raw) {
            Ok(report) => {
                debug!(
                    "Analysis code finished: result={}, charts={}, logs={}",
                    report.has_result,
                    report.charts.len(),
                    report.logs.len()
                );
                self.interpret(report)
            }
            Err(e) => ExecutionOutcome::Failure(format!("Error executing code: unreadable output: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use serde_json::json;

    fn executor() -> CodeExecutor {
        let df = df! {
            "city" => &["Oslo", "Lima", "Oslo"],
            "income" => &[52000i64, 31000, 48000],
        }
        .unwrap();
        CodeExecutor::new(&df).unwrap()
    }

    async fn success(executor: &CodeExecutor, code: &str) -> AnalysisOutput {
        match executor.execute(code).await {
            ExecutionOutcome::Success(output) => output,
            ExecutionOutcome::Failure(e) => panic!("unexpected failure: {}", e),
        }
    }

    async fn failure(executor: &CodeExecutor, code: &str) -> String {
        match executor.execute(code).await {
            ExecutionOutcome::Failure(e) => e,
            ExecutionOutcome::Success(output) => panic!("expected failure, got {:?}", output),
        }
    }

    #[tokio::test]
    async fn test_result_is_computed_from_df() {
        let output = success(
            &executor(),
            r#"
var total = 0;
for (var i = 0; i < df.length; i++) { total += df[i].income; }
var result = { rows: df.length, total: total, columns: columns };
"#,
        )
        .await;
        assert_eq!(
            output.value,
            AnalysisValue::Computed(json!({"rows": 3, "total": 131000, "columns": ["city", "income"]}))
        );
        assert!(output.charts.is_empty());
    }

    #[tokio::test]
    async fn test_let_binding_is_seen() {
        let output = success(&executor(), "let result = df.filter(r => r.city === 'Oslo').length;").await;
        assert_eq!(output.value, AnalysisValue::Computed(json!(2)));
    }

    #[tokio::test]
    async fn test_exception_becomes_failure() {
        let message = failure(&executor(), "throw new Error('boom');").await;
        assert!(message.starts_with("Error executing code:"));
        assert!(message.contains("boom"));

        let message = failure(&executor(), "var result = df[0].missing.field;").await;
        assert!(message.contains("TypeError"));
    }

    #[tokio::test]
    async fn test_missing_result_policy() {
        let output = success(&executor(), "var x = 1;").await;
        assert_eq!(output.value, AnalysisValue::NothingComputed);

        let strict = executor().with_policy(MissingResultPolicy::Reject);
        let message = failure(&strict, "var x = 1;").await;
        assert!(message.contains("`result`"));
    }

    #[tokio::test]
    async fn test_charts_and_logs_are_collected_in_order() {
        let output = success(
            &executor(),
            r#"
chart.attach({ mark: 'bar', n: 1 });
console.log('rows', df.length);
chart.attach({ mark: 'line', n: 2 });
var result = 'done';
"#,
        )
        .await;
        assert_eq!(output.charts, vec![json!({"mark": "bar", "n": 1}), json!({"mark": "line", "n": 2})]);
        assert_eq!(output.logs, vec!["rows 3".to_string()]);
    }

    #[tokio::test]
    async fn test_limits() {
        let limited = executor().with_limits(CodeLimits {
            loop_iteration_limit: 1_000,
            max_code_bytes: 64,
            max_output_bytes: 128,
            ..CodeLimits::default()
        });

        let message = failure(&limited, "while (true) {}").await;
        assert!(message.starts_with("Error executing code:"));

        let message = failure(&limited, &format!("var result = '{}';", "x".repeat(80))).await;
        assert!(message.contains("limit is 64"));

        let message = failure(&limited, "var result = 'y'.repeat(500);").await;
        assert!(message.contains("limit is 128"));
    }

    #[tokio::test]
    async fn test_quotes_in_data_survive() {
        let df = df! { "name" => &["O'Brien \"Jr\"\\"] }.unwrap();
        let executor = CodeExecutor::new(&df).unwrap();
        let output = success(&executor, "var result = df[0].name;").await;
        assert_eq!(output.value, AnalysisValue::Computed(json!("O'Brien \"Jr\"\\")));
    }
}
