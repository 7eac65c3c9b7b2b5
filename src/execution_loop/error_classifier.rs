//! Error Classifier
//!
//! Sorts database error text into a small taxonomy so the correction prompt
//! can carry a targeted hint next to the verbatim diagnostic.

use serde::Serialize;
use std::fmt;

/// SQL execution error classification taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlErrorClass {
    ColumnNotFound,
    TableNotFound,
    AmbiguousColumn,
    InvalidAggregation,
    TypeMismatch,
    Other,
}

impl fmt::Display for SqlErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlErrorClass::ColumnNotFound => write!(f, "ColumnNotFound"),
            SqlErrorClass::TableNotFound => write!(f, "TableNotFound"),
            SqlErrorClass::AmbiguousColumn => write!(f, "AmbiguousColumn"),
            SqlErrorClass::InvalidAggregation => write!(f, "InvalidAggregation"),
            SqlErrorClass::TypeMismatch => write!(f, "TypeMismatch"),
            SqlErrorClass::Other => write!(f, "Other"),
        }
    }
}

impl SqlErrorClass {
    /// One-line correction hint, if the class has one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SqlErrorClass::ColumnNotFound => {
                Some("A referenced column does not exist. Use only column names from the schema above.")
            }
            SqlErrorClass::TableNotFound => {
                Some("A referenced table does not exist. Use only the table named in the schema above.")
            }
            SqlErrorClass::AmbiguousColumn => {
                Some("A column reference is ambiguous. Qualify it with its table name or alias.")
            }
            SqlErrorClass::InvalidAggregation => Some(
                "Every non-aggregated column in the SELECT list must appear in the GROUP BY clause.",
            ),
            SqlErrorClass::TypeMismatch => {
                Some("A value or operator does not match the column type. Check the declared types and cast where needed.")
            }
            SqlErrorClass::Other => None,
        }
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an execution diagnostic into the taxonomy
    pub fn classify(&self, message: &str) -> SqlErrorClass {
        let error_msg = message.to_lowercase();

        if error_msg.contains("ambiguous") && error_msg.contains("column") {
            return SqlErrorClass::AmbiguousColumn;
        }

        if error_msg.contains("column")
            && (error_msg.contains("not found") || error_msg.contains("does not exist"))
        {
            return SqlErrorClass::ColumnNotFound;
        }

        if (error_msg.contains("table") || error_msg.contains("relation"))
            && (error_msg.contains("not found") || error_msg.contains("does not exist"))
        {
            return SqlErrorClass::TableNotFound;
        }

        if error_msg.contains("group by") || error_msg.contains("aggregate function") {
            return SqlErrorClass::InvalidAggregation;
        }

        if error_msg.contains("operator does not exist")
            || error_msg.contains("invalid input syntax for type")
            || error_msg.contains("cannot be cast")
            || error_msg.contains("type mismatch")
        {
            return SqlErrorClass::TypeMismatch;
        }

        SqlErrorClass::Other
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
