//! Plain-text rendering of a [`CopilotReport`] for the terminal

use crate::copilot::CopilotReport;
use crate::execution::{AnalysisOutput, AnalysisValue};
use crate::execution_loop::LoopResult;
use crate::services::analysis::ANALYSIS_ARTIFACT;
use crate::services::sql::SQL_ARTIFACT;
use std::fmt::Write;

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n=== {} ===", title);
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn attempts(n: u32) -> String {
    if n == 1 {
        "1 attempt".to_string()
    } else {
        format!("{} attempts", n)
    }
}

fn render_analysis(out: &mut String, analysis: &LoopResult<AnalysisOutput>) {
    match analysis {
        LoopResult::Resolved {
            artifact,
            result,
            attempts_used,
        } => {
            section(out, &format!("Analysis code ({})", attempts(*attempts_used)));
            let _ = writeln!(out, "{}", artifact);

            section(out, "Result");
            match &result.value {
                AnalysisValue::Computed(value) => {
                    let _ = writeln!(out, "{}", pretty(value));
                }
                AnalysisValue::NothingComputed => {
                    let _ = writeln!(out, "(the analysis code did not assign `result`)");
                }
            }

            if !result.charts.is_empty() {
                section(out, &format!("Charts ({})", result.charts.len()));
                for spec in &result.charts {
                    let _ = writeln!(out, "{}", pretty(spec));
                }
            }

            if !result.logs.is_empty() {
                section(out, "Console");
                for line in &result.logs {
                    let _ = writeln!(out, "{}", line);
                }
            }
        }
        LoopResult::Exhausted { .. } => {
            section(out, "Analysis failed");
            if let Some(report) = analysis.failure_report(ANALYSIS_ARTIFACT) {
                let _ = writeln!(out, "{}", report);
            }
        }
    }
}

/// Render the whole report; `sample_rows` bounds the data preview
pub fn render(report: &CopilotReport, sample_rows: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Question: {}", report.question);
    let _ = writeln!(out, "Table: {}", report.table);

    match &report.sql {
        LoopResult::Resolved {
            artifact,
            result,
            attempts_used,
        } => {
            section(&mut out, &format!("SQL ({})", attempts(*attempts_used)));
            let _ = writeln!(out, "{}", artifact);

            section(
                &mut out,
                &format!("Data ({} rows, showing up to {})", result.height(), sample_rows),
            );
            let _ = writeln!(out, "{}", result.head(Some(sample_rows)));
        }
        LoopResult::Exhausted { .. } => {
            section(&mut out, "SQL generation failed");
            if let Some(failure) = report.sql.failure_report(SQL_ARTIFACT) {
                let _ = writeln!(out, "{}", failure);
            }
        }
    }

    if let Some(analysis) = &report.analysis {
        render_analysis(&mut out, analysis);
    }

    if let Some(note) = &report.note {
        let _ = writeln!(out, "\n{}", note);
    }

    out
}
