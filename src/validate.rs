//! SQL syntax gate
//!
//! A parse-only check run before any execution attempt is spent. It never
//! rejects a statement for its kind (DDL and DML pass), only for failing to
//! parse.
//!
//! PostgreSQL accepts constructs the parser does not know (`WITHIN GROUP`,
//! `TABLESAMPLE`, ...). For that dialect a parser error only rejects the
//! text when it also fails to tokenize or does not open like a statement;
//! anything else is left for the server to judge. The generic dialect is
//! executed by Polars SQL, which parses with the same library, so there a
//! parser error is final.

use crate::execution_loop::{ArtifactValidator, ValidationOutcome};
use sqlparser::dialect::{Dialect, GenericDialect, PostgreSqlDialect};
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

pub const EMPTY_OR_UNPARSEABLE: &str = "empty or unparseable";

const STATEMENT_KEYWORDS: &[Keyword] = &[
    Keyword::SELECT,
    Keyword::WITH,
    Keyword::VALUES,
    Keyword::TABLE,
    Keyword::INSERT,
    Keyword::UPDATE,
    Keyword::DELETE,
    Keyword::MERGE,
    Keyword::CREATE,
    Keyword::ALTER,
    Keyword::DROP,
    Keyword::TRUNCATE,
    Keyword::EXPLAIN,
    Keyword::SHOW,
];

/// SQL dialect spoken by a database backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    PostgreSql,
    Generic,
}

impl SqlDialect {
    /// Name used inside prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSql => "PostgreSQL",
            SqlDialect::Generic => "ANSI SQL",
        }
    }

    fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::PostgreSql => Box::new(PostgreSqlDialect {}),
            SqlDialect::Generic => Box::new(GenericDialect {}),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Parse-only SQL validator
pub struct SqlSyntaxValidator {
    dialect: SqlDialect,
}

impl SqlSyntaxValidator {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn validate(&self, sql: &str) -> ValidationOutcome {
        if sql.trim().is_empty() {
            return ValidationOutcome::invalid(EMPTY_OR_UNPARSEABLE);
        }

        let dialect = self.dialect.parser_dialect();
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| Parser::parse_sql(dialect.as_ref(), sql)));

        match parsed {
            Ok(Ok(statements)) if statements.is_empty() => ValidationOutcome::invalid(EMPTY_OR_UNPARSEABLE),
            Ok(Ok(statements)) => {
                debug!(statements = statements.len(), "SQL parsed");
                ValidationOutcome::valid()
            }
            Ok(Err(e)) if self.server_may_accept(dialect.as_ref(), sql) => {
                debug!("Parser rejected well-formed {} text, deferring to the server: {}", self.dialect, e);
                ValidationOutcome::valid()
            }
            Ok(Err(e)) => ValidationOutcome::invalid(format!("Syntax validation error: {}", e)),
            Err(_) => ValidationOutcome::invalid("Syntax validation error: parser aborted"),
        }
    }

    /// PostgreSQL only: tokenizes cleanly and opens with a statement keyword
    fn server_may_accept(&self, dialect: &dyn Dialect, sql: &str) -> bool {
        if self.dialect != SqlDialect::PostgreSql {
            return false;
        }

        let tokens = match Tokenizer::new(dialect, sql).tokenize() {
            Ok(tokens) => tokens,
            Err(_) => return false,
        };

        let first = tokens
            .iter()
            .find(|t| !matches!(t, Token::Whitespace(_) | Token::LParen));

        matches!(first, Some(Token::Word(w)) if STATEMENT_KEYWORDS.contains(&w.keyword))
    }
}

impl ArtifactValidator for SqlSyntaxValidator {
    fn validate(&self, artifact: &str) -> ValidationOutcome {
        SqlSyntaxValidator::validate(self, artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_valid() {
        let validator = SqlSyntaxValidator::new(SqlDialect::PostgreSql);
        let outcome = validator.validate("SELECT city, AVG(income) FROM people GROUP BY city");
        assert!(outcome.valid);
        assert!(outcome.diagnostic.is_none());
    }

    #[test]
    fn test_non_select_statements_pass() {
        let validator = SqlSyntaxValidator::new(SqlDialect::PostgreSql);
        assert!(validator.validate("UPDATE people SET income = 0 WHERE id = 1").valid);
        assert!(validator.validate("CREATE TABLE t (id INT)").valid);
        assert!(validator.validate("WITH x AS (SELECT 1) SELECT * FROM x").valid);
    }

    #[test]
    fn test_empty_input() {
        let validator = SqlSyntaxValidator::new(SqlDialect::Generic);
        for sql in ["", "   \n", ";"] {
            let outcome = validator.validate(sql);
            assert!(!outcome.valid, "input {:?}", sql);
            assert_eq!(outcome.diagnostic.as_deref(), Some(EMPTY_OR_UNPARSEABLE));
        }
    }

    #[test]
    fn test_garbage_is_reported_not_raised() {
        let validator = SqlSyntaxValidator::new(SqlDialect::PostgreSql);
        let outcome = validator.validate("Error: Cannot answer question with the provided schema.");
        assert!(!outcome.valid);
        assert!(outcome
            .diagnostic
            .unwrap()
            .starts_with("Syntax validation error:"));

        assert!(!validator.validate("SELEC * FROM t").valid);
        assert!(!validator.validate("SELECT 'unterminated FROM t").valid);
    }

    #[test]
    fn test_postgres_constructs_beyond_the_parser_pass() {
        let validator = SqlSyntaxValidator::new(SqlDialect::PostgreSql);
        for sql in [
            "SELECT city, percentile_cont(0.5) WITHIN GROUP (ORDER BY income) FROM people GROUP BY city",
            "SELECT mode() WITHIN GROUP (ORDER BY city) FROM people",
            "SELECT * FROM people TABLESAMPLE SYSTEM (10)",
        ] {
            let outcome = validator.validate(sql);
            assert!(outcome.valid, "{:?}: {:?}", sql, outcome.diagnostic);
        }
    }

    #[test]
    fn test_generic_dialect_stays_strict() {
        let validator = SqlSyntaxValidator::new(SqlDialect::Generic);
        let outcome = validator.validate(
            "SELECT city, percentile_cont(0.5) WITHIN GROUP (ORDER BY income) FROM people GROUP BY city",
        );
        assert!(!outcome.valid);
    }
}
