//! Result conversion - DataFrame to JSON rows and prompt-sized samples

use crate::error::{CopilotError, Result};
use polars::prelude::*;
use serde_json::Value;

/// Column names in frame order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Convert a DataFrame into an array of row objects keyed by column name
pub fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<Value>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());

    for row_idx in 0..df.height() {
        let mut row = serde_json::Map::new();
        for series in columns {
            row.insert(series.name().to_string(), series_to_json_value(series, row_idx)?);
        }
        rows.push(Value::Object(row));
    }

    Ok(rows)
}

fn series_to_json_value(series: &Series, row_idx: usize) -> Result<Value> {
    let any_val = series
        .get(row_idx)
        .map_err(|e| CopilotError::Execution(format!("Failed to get value: {}", e)))?;

    if any_val.is_null() {
        return Ok(Value::Null);
    }

    let value = match any_val {
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(i) => Value::Number(i.into()),
        AnyValue::Int16(i) => Value::Number(i.into()),
        AnyValue::Int32(i) => Value::Number(i.into()),
        AnyValue::Int64(i) => Value::Number(i.into()),
        AnyValue::UInt8(u) => Value::Number(u.into()),
        AnyValue::UInt16(u) => Value::Number(u.into()),
        AnyValue::UInt32(u) => Value::Number(u.into()),
        AnyValue::UInt64(u) => Value::Number(u.into()),
        AnyValue::Float32(f) => float_value(f as f64),
        AnyValue::Float64(f) => float_value(f),
        other => Value::String(other.to_string()),
    };

    Ok(value)
}

// NaN and infinities have no JSON form
fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Text shown to the analysis prompt: column list, row count and the first `rows` rows
pub fn render_sample(df: &DataFrame, rows: usize) -> String {
    let dtypes = df
        .get_columns()
        .iter()
        .map(|s| format!("{} ({})", s.name(), s.dtype()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Columns: {}\nTotal rows: {}\nFirst {} rows:\n{}",
        dtypes,
        df.height(),
        rows.min(df.height()),
        df.head(Some(rows))
    )
}
