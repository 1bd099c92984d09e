use std::path::Path;

use anyhow::Result;
use serde::ser::{Serialize, SerializeTuple, Serializer};
use tracing::info;

use crate::errors::MetricsError;
use crate::types::{BENCHMARK_COLUMNS, DerivedRow, ExtraColumns, METRIC_COLUMNS};

const FIXED_WIDTH: usize = BENCHMARK_COLUMNS.len() + METRIC_COLUMNS.len();

/// One output line: the input fields, pass-through fields, then the metrics.
struct OutputRecord<'a> {
    row: &'a DerivedRow,
    extra: &'a [String],
    width: usize,
}

impl Serialize for OutputRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let row = self.row;
        let mut record = serializer.serialize_tuple(FIXED_WIDTH + self.width)?;
        record.serialize_element(&row.k)?;
        record.serialize_element(&row.m)?;
        record.serialize_element(&row.processes)?;
        record.serialize_element(&row.execution_time)?;
        for i in 0..self.width {
            record.serialize_element(self.extra.get(i).map_or("", String::as_str))?;
        }
        record.serialize_element(&row.base_time)?;
        record.serialize_element(&row.speedup)?;
        record.serialize_element(&row.efficiency)?;
        record.end()
    }
}

/// Write the derived table as CSV, one line per row in the given order.
pub fn write_metrics(path: &Path, rows: &[DerivedRow]) -> Result<()> {
    write_metrics_with_extra(path, rows, &ExtraColumns::default())
}

/// Write the derived table with the input's extra columns placed between the
/// required input columns and the metrics.
///
/// The header is written explicitly so an empty table still produces a file
/// with the full schema. Absent metrics are written as empty fields, as are
/// extra fields for rows that have none.
pub fn write_metrics_with_extra(
    path: &Path,
    rows: &[DerivedRow],
    extra: &ExtraColumns,
) -> Result<()> {
    let write_err = |source: csv::Error| MetricsError::TableWriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_err)?;

    let header = BENCHMARK_COLUMNS
        .iter()
        .copied()
        .chain(extra.names.iter().map(String::as_str))
        .chain(METRIC_COLUMNS);
    writer.write_record(header).map_err(write_err)?;

    for (i, row) in rows.iter().enumerate() {
        let record = OutputRecord {
            row,
            extra: extra.values.get(i).map(Vec::as_slice).unwrap_or_default(),
            width: extra.names.len(),
        };
        writer.serialize(record).map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| write_err(csv::Error::from(e)))?;

    info!(
        path = %path.display(),
        rows = rows.len(),
        extra_columns = extra.names.len(),
        "wrote metrics"
    );
    Ok(())
}
