use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::types::{DerivedRow, GroupKey};

/// Mean metrics for one (K, M, processes) cell of the pivot.
///
/// Non-finite means serialize as the strings `"inf"`, `"-inf"` or `"NaN"`
/// so that JSON keeps them apart from absent values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryCell {
    #[serde(serialize_with = "serialize_metric")]
    pub execution_time: Option<f64>,
    #[serde(serialize_with = "serialize_metric")]
    pub speedup: Option<f64>,
    #[serde(serialize_with = "serialize_metric")]
    pub efficiency: Option<f64>,
}

fn serialize_metric<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if !v.is_finite() => serializer.serialize_str(&v.to_string()),
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(flatten)]
    pub key: GroupKey,
    pub cells: BTreeMap<u32, SummaryCell>,
}

/// Derived table pivoted to (K, M) rows and process-count columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub processes: Vec<u32>,
    pub rows: Vec<SummaryRow>,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value
            && !v.is_nan()
        {
            self.sum += v;
            self.count += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

#[derive(Default)]
struct CellAccumulator {
    execution_time: Mean,
    speedup: Mean,
    efficiency: Mean,
}

/// Pivot derived rows by (K, M) x processes.
///
/// Rows and columns are sorted ascending. Duplicate runs are averaged and
/// absent values are skipped, so a cell is only absent when none of its
/// runs had a value.
pub fn summarize(rows: &[DerivedRow]) -> Summary {
    let mut grid: BTreeMap<GroupKey, BTreeMap<u32, CellAccumulator>> = BTreeMap::new();
    let mut processes = BTreeSet::new();

    for row in rows {
        processes.insert(row.processes);
        let acc = grid
            .entry(row.key())
            .or_default()
            .entry(row.processes)
            .or_default();
        acc.execution_time.add(Some(row.execution_time));
        acc.speedup.add(row.speedup);
        acc.efficiency.add(row.efficiency);
    }

    let rows = grid
        .into_iter()
        .map(|(key, cells)| SummaryRow {
            key,
            cells: cells
                .into_iter()
                .map(|(p, acc)| {
                    (
                        p,
                        SummaryCell {
                            execution_time: acc.execution_time.get(),
                            speedup: acc.speedup.get(),
                            efficiency: acc.efficiency.get(),
                        },
                    )
                })
                .collect(),
        })
        .collect();

    Summary {
        processes: processes.into_iter().collect(),
        rows,
    }
}
