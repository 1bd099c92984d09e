use std::path::Path;

use anyhow::Result;
use csv::{Reader, StringRecord};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::MetricsError;
use crate::types::{
    BENCHMARK_COLUMNS, BenchmarkRow, BenchmarkTable, DERIVED_COLUMNS, DerivedRow, ExtraColumns,
    SolutionTable, TimeStep, TimingPoint,
};

const GRID_COLUMN: &str = "x";

fn open(path: &Path) -> Result<Reader<std::fs::File>, MetricsError> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| MetricsError::TableReadError {
            path: path.to_path_buf(),
            source,
        })
}

fn headers(reader: &mut Reader<std::fs::File>, path: &Path) -> Result<StringRecord, MetricsError> {
    reader
        .headers()
        .cloned()
        .map_err(|source| MetricsError::TableReadError {
            path: path.to_path_buf(),
            source,
        })
}

/// Fail with `MissingColumn` for the first required column not in `headers`.
pub fn require_columns(headers: &StringRecord, required: &[&str], path: &Path) -> Result<(), MetricsError> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(MetricsError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// A deserialized record, its first line in the file, and its raw fields.
struct Parsed<T> {
    line: u64,
    value: T,
    raw: StringRecord,
}

/// Line a record starts on. The header is line 1.
fn record_line(record: &StringRecord, index: usize) -> u64 {
    record
        .position()
        .map_or(index as u64 + 2, |pos| pos.line())
}

/// Check the header row, then deserialize every record into `T`.
fn load_records<T: DeserializeOwned>(
    path: &Path,
    required: &[&str],
) -> Result<(StringRecord, Vec<Parsed<T>>)> {
    let mut reader = open(path)?;
    let header = headers(&mut reader, path)?;
    require_columns(&header, required, path)?;

    let read_err = |source: csv::Error| MetricsError::TableReadError {
        path: path.to_path_buf(),
        source,
    };

    let mut out = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let raw = record.map_err(read_err)?;
        let value: T = raw.deserialize(Some(&header)).map_err(read_err)?;
        out.push(Parsed {
            line: record_line(&raw, i),
            value,
            raw,
        });
    }

    debug!(path = %path.display(), rows = out.len(), "loaded table");
    Ok((header, out))
}

fn check_processes(processes: u32, line: u64, path: &Path) -> Result<(), MetricsError> {
    if processes == 0 {
        return Err(MetricsError::InvalidRecord {
            path: path.to_path_buf(),
            line,
            detail: "processes must be a positive integer".to_string(),
        });
    }
    Ok(())
}

/// Load the benchmark table (`K`, `M`, `processes`, `execution_time`).
///
/// The header is validated before any row is parsed, so a missing column is
/// reported as a schema error rather than a per-row deserialization failure.
/// Columns other than the required four are kept verbatim, in file order.
pub fn load_benchmark_table(path: &Path) -> Result<BenchmarkTable> {
    let (header, records) = load_records::<BenchmarkRow>(path, &BENCHMARK_COLUMNS)?;

    let (extra_indices, names): (Vec<usize>, Vec<String>) = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !BENCHMARK_COLUMNS.contains(name))
        .map(|(i, name)| (i, name.to_string()))
        .unzip();

    let mut rows = Vec::with_capacity(records.len());
    let mut values = Vec::with_capacity(records.len());
    for record in records {
        check_processes(record.value.processes, record.line, path)?;
        values.push(
            extra_indices
                .iter()
                .map(|&i| record.raw.get(i).unwrap_or_default().to_string())
                .collect(),
        );
        rows.push(record.value);
    }

    Ok(BenchmarkTable {
        rows,
        extra: ExtraColumns { names, values },
    })
}

/// Typed rows of the benchmark table, without pass-through columns.
pub fn load_benchmarks(path: &Path) -> Result<Vec<BenchmarkRow>> {
    Ok(load_benchmark_table(path)?.rows)
}

/// Load a derived table previously written by `export::write_metrics`.
pub fn load_metrics(path: &Path) -> Result<Vec<DerivedRow>> {
    let (_, records) = load_records::<DerivedRow>(path, &DERIVED_COLUMNS)?;
    Ok(records.into_iter().map(|r| r.value).collect())
}

/// Load (processes, execution_time) samples. `K`/`M` are picked up when present.
pub fn load_timings(path: &Path) -> Result<Vec<TimingPoint>> {
    let (_, records) = load_records::<TimingPoint>(path, &["processes", "execution_time"])?;
    let mut points = Vec::with_capacity(records.len());
    for record in records {
        check_processes(record.value.processes, record.line, path)?;
        points.push(record.value);
    }
    Ok(points)
}

/// Parse the step number out of a `<name>_<step>` column header.
pub fn parse_time_step(column: &str) -> Option<u64> {
    let (_, step) = column.rsplit_once('_')?;
    step.parse().ok()
}

/// Load a solver output table: an `x` column plus one column per time step.
pub fn load_solution(path: &Path) -> Result<SolutionTable> {
    let mut reader = open(path)?;
    let header = headers(&mut reader, path)?;
    require_columns(&header, &[GRID_COLUMN], path)?;

    let mut x_index = 0;
    let mut steps = Vec::new();
    let mut step_indices = Vec::new();
    for (i, name) in header.iter().enumerate() {
        if name == GRID_COLUMN {
            x_index = i;
            continue;
        }
        let step = parse_time_step(name).ok_or_else(|| MetricsError::InvalidTimeColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })?;
        steps.push(TimeStep {
            name: name.to_string(),
            step,
            values: Vec::new(),
        });
        step_indices.push(i);
    }

    let mut x = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| MetricsError::TableReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record_line(&record, row);
        x.push(parse_field(&record, x_index, line, path)?);
        for (step, &col) in steps.iter_mut().zip(&step_indices) {
            step.values.push(parse_field(&record, col, line, path)?);
        }
    }

    debug!(
        path = %path.display(),
        points = x.len(),
        steps = steps.len(),
        "loaded solution"
    );
    Ok(SolutionTable { x, steps })
}

fn parse_field(record: &StringRecord, index: usize, line: u64, path: &Path) -> Result<f64, MetricsError> {
    let raw = record.get(index).unwrap_or_default();
    raw.parse().map_err(|_| MetricsError::InvalidRecord {
        path: path.to_path_buf(),
        line,
        detail: format!("'{}' is not a number", raw),
    })
}
