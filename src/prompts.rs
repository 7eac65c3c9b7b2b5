//! Prompt construction
//!
//! Pure renderers for the two generation tasks. A request carries at most one
//! piece of feedback (the previous artifact together with its diagnostic), so
//! a correction block is either rendered in full or not at all.

use crate::execution_loop::error_classifier::ErrorClassifier;
use crate::execution_loop::{Diagnostic, FailureKind};
use crate::extract;
use crate::validate::SqlDialect;

/// The previous attempt and why it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub artifact: String,
    pub diagnostic: Diagnostic,
}

/// Everything needed to render one attempt's prompt
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub question: &'a str,
    pub context: &'a str,
    pub feedback: Option<&'a Feedback>,
    pub attempt_index: u32,
}

impl<'a> GenerationRequest<'a> {
    pub fn first(question: &'a str, context: &'a str) -> Self {
        Self {
            question,
            context,
            feedback: None,
            attempt_index: 0,
        }
    }
}

/// Prompt shape plus the matching response extraction for one artifact kind
pub trait PromptTemplate: Send + Sync {
    fn render(&self, request: &GenerationRequest<'_>) -> String;

    fn extract(&self, raw: &str) -> String;
}

/// SQL generation prompt for a given dialect
pub struct SqlPrompt {
    dialect: SqlDialect,
    classifier: ErrorClassifier,
}

impl SqlPrompt {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            classifier: ErrorClassifier::new(),
        }
    }
}

impl PromptTemplate for SqlPrompt {
    fn render(&self, request: &GenerationRequest<'_>) -> String {
        let db_type = self.dialect.display_name();
        let mut prompt = format!(
            r#"You are an expert {db_type} data analyst. Write one {db_type} SQL query that answers the user's question using the table schema below.

Database schema:
```sql
{schema}
```

User question: "{question}"

Rules:
1. Read the question and the schema carefully.
2. Return a SINGLE, syntactically valid {db_type} statement that answers the question.
3. Output ONLY the SQL text: no explanations, no comments, no markdown fences.
4. Use only the table and columns that appear in the schema.
5. If the schema cannot answer the question, reply exactly: Error: Cannot answer question with the provided schema.
"#,
            db_type = db_type,
            schema = request.context,
            question = request.question,
        );

        match request.feedback {
            Some(feedback) => {
                prompt.push_str(&format!(
                    r#"
Correction attempt:
The previous query failed.
Previous query:
```sql
{artifact}
```
Error message: "{error}"
"#,
                    artifact = feedback.artifact,
                    error = feedback.diagnostic.message,
                ));

                if feedback.diagnostic.kind == FailureKind::Execution {
                    if let Some(hint) = self.classifier.classify(&feedback.diagnostic.message).hint() {
                        prompt.push_str(&format!("Hint: {}\n", hint));
                    }
                }

                prompt.push_str(&format!(
                    "\nAddress the error above and return a corrected {} query that still answers the original question. Output ONLY the corrected SQL.\n",
                    db_type
                ));
            }
            None => {
                prompt.push_str(&format!("\nWrite the {} SQL query now:\n", db_type));
            }
        }

        prompt
    }

    fn extract(&self, raw: &str) -> String {
        extract::clean_sql(raw)
    }
}

/// Analysis code prompt; the generated routine is JavaScript run against the retrieved rows
pub struct AnalysisPrompt;

impl PromptTemplate for AnalysisPrompt {
    fn render(&self, request: &GenerationRequest<'_>) -> String {
        let mut prompt = format!(
            r#"You are a data analysis assistant. Write JavaScript that performs the analysis the user asks for, using the retrieved data described below.

Runtime available to your code:
- `df` is an array of row objects (one per retrieved row), keyed by column name.
- `columns` is the array of column names, in order.
- `chart.attach(spec)` attaches a chart; pass a Vega-Lite specification object whose data values come from `df`.
- Assign the main answer to a variable named `result` (a number, string, object, or array of row objects).
- Do not print anything. There is no file system, network, or module loader.
- Output ONLY the JavaScript code.

USER INPUT: {question}

TABLE INFORMATION:
{context}
"#,
            question = request.question,
            context = request.context,
        );

        if let Some(feedback) = request.feedback {
            prompt.push_str(&format!(
                r#"
The previous code failed when executed. Modify it to fix the error while keeping the original intent.
Execution error: {error}
Previous code:
```javascript
{artifact}
```
"#,
                error = feedback.diagnostic.message,
                artifact = feedback.artifact,
            ));
        }

        prompt.push_str("\nWrite the JavaScript code now:\n");
        prompt
    }

    fn extract(&self, raw: &str) -> String {
        extract::extract_javascript(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "CREATE TABLE people (\n    city text NULL,\n    income integer NOT NULL\n);";

    fn feedback(kind_message: Diagnostic) -> Feedback {
        Feedback {
            artifact: "SELECT cty FROM people".to_string(),
            diagnostic: kind_message,
        }
    }

    #[test]
    fn test_first_attempt_has_no_correction_block() {
        let prompt = SqlPrompt::new(SqlDialect::PostgreSql)
            .render(&GenerationRequest::first("average income by city", SCHEMA));
        assert!(prompt.contains("PostgreSQL"));
        assert!(prompt.contains(SCHEMA));
        assert!(prompt.contains("\"average income by city\""));
        assert!(!prompt.contains("Correction attempt"));
        assert!(!prompt.contains("Error message"));
        assert!(prompt.ends_with("Write the PostgreSQL SQL query now:\n"));
    }

    #[test]
    fn test_correction_embeds_artifact_and_error_verbatim() {
        let fb = feedback(Diagnostic::execution(
            "Database execution error: column \"cty\" does not exist",
        ));
        let request = GenerationRequest {
            question: "average income by city",
            context: SCHEMA,
            feedback: Some(&fb),
            attempt_index: 1,
        };
        let prompt = SqlPrompt::new(SqlDialect::PostgreSql).render(&request);
        assert!(prompt.contains("```sql\nSELECT cty FROM people\n```"));
        assert!(prompt.contains("Error message: \"Database execution error: column \"cty\" does not exist\""));
        assert!(prompt.contains("Hint: A referenced column does not exist."));
        assert!(prompt.contains("Output ONLY the corrected SQL."));
    }

    #[test]
    fn test_syntax_feedback_gets_no_execution_hint() {
        let fb = feedback(Diagnostic::syntax("Syntax validation error: column missing"));
        let request = GenerationRequest {
            question: "q",
            context: SCHEMA,
            feedback: Some(&fb),
            attempt_index: 1,
        };
        let prompt = SqlPrompt::new(SqlDialect::Generic).render(&request);
        assert!(prompt.contains("ANSI SQL"));
        assert!(!prompt.contains("Hint:"));
    }

    #[test]
    fn test_analysis_prompt_shapes() {
        let first = AnalysisPrompt.render(&GenerationRequest::first("top city", "city | income"));
        assert!(first.contains("USER INPUT: top city"));
        assert!(first.contains("`result`"));
        assert!(!first.contains("Execution error"));

        let fb = Feedback {
            artifact: "var result = df[0].nope.x;".to_string(),
            diagnostic: Diagnostic::execution("Error executing code: TypeError: undefined"),
        };
        let retry = AnalysisPrompt.render(&GenerationRequest {
            question: "top city",
            context: "city | income",
            feedback: Some(&fb),
            attempt_index: 1,
        });
        assert!(retry.contains("Execution error: Error executing code: TypeError: undefined"));
        assert!(retry.contains("```javascript\nvar result = df[0].nope.x;\n```"));
    }

    #[test]
    fn test_templates_extract_their_language() {
        assert_eq!(
            SqlPrompt::new(SqlDialect::PostgreSql).extract("```sql\nSELECT 1;\n```"),
            "SELECT 1"
        );
        assert_eq!(
            AnalysisPrompt.extract("Sure!\n```javascript\nvar result = 1;\n```"),
            "var result = 1;"
        );
    }
}
