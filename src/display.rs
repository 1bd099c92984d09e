use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::summary::{Summary, SummaryCell, SummaryRow};

const TITLE: &str = "Performance summary:";
const MISSING: &str = "-";

/// Fixed two-decimal rendering; absent values become `-`.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => MISSING.to_string(),
    }
}

type Metric = fn(&SummaryCell) -> Option<f64>;

const METRICS: [(&str, Metric); 3] = [
    ("execution_time", |c: &SummaryCell| c.execution_time),
    ("speedup", |c: &SummaryCell| c.speedup),
    ("efficiency", |c: &SummaryCell| c.efficiency),
];

fn metric_value(row: &SummaryRow, processes: u32, metric: Metric) -> Option<f64> {
    row.cells.get(&processes).and_then(metric)
}

/// Pivot table as a markdown pipe table, one block of columns per metric.
pub fn format_markdown(summary: &Summary) -> String {
    let mut header = vec!["K".to_string(), "M".to_string()];
    for (name, _) in METRICS {
        for p in &summary.processes {
            header.push(format!("{} (p={})", name, p));
        }
    }

    let body: Vec<Vec<String>> = summary
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.key.k.to_string(), row.key.m.to_string()];
            for (_, metric) in METRICS {
                for &p in &summary.processes {
                    cells.push(format_value(metric_value(row, p, metric)));
                }
            }
            cells
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            body.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(
        &TITLE
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string(),
    );
    out.push_str("\n\n");

    // Header, left-aligned
    out.push('|');
    for (h, w) in header.iter().zip(&widths) {
        out.push_str(&format!(" {:<width$} |", h, width = w));
    }
    out.push('\n');

    // Separator, right-aligned numbers
    out.push('|');
    for w in &widths {
        out.push_str(&format!("{}:|", "-".repeat(w + 1)));
    }
    out.push('\n');

    for row in &body {
        out.push('|');
        for (cell, w) in row.iter().zip(&widths) {
            out.push_str(&format!(" {:>width$} |", cell, width = w));
        }
        out.push('\n');
    }

    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    baseline_processes: u32,
    #[serde(flatten)]
    summary: &'a Summary,
}

/// Pivot table as pretty JSON, stamped with `now`.
pub fn format_json(summary: &Summary, baseline_processes: u32, now: DateTime<Utc>) -> String {
    let report = JsonReport {
        generated_at: now,
        baseline_processes,
        summary,
    };
    let mut out = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}
