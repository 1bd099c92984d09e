use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Process count whose run stands in for the single-process baseline.
pub const DEFAULT_BASELINE_PROCESSES: u32 = 2;

/// One observed benchmark run, as read from `benchmark_results.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    #[serde(rename = "K")]
    pub k: u64,
    #[serde(rename = "M")]
    pub m: u64,
    pub processes: u32,
    pub execution_time: f64,
}

impl BenchmarkRow {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            k: self.k,
            m: self.m,
        }
    }
}

/// Input columns beyond the required four, carried through to the derived table.
///
/// `values[i]` holds row `i`'s fields in `names` order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraColumns {
    pub names: Vec<String>,
    pub values: Vec<Vec<String>>,
}

/// A loaded benchmark table: typed rows plus whatever else the file carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkTable {
    pub rows: Vec<BenchmarkRow>,
    pub extra: ExtraColumns,
}

/// Problem-size pair that benchmark rows are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    #[serde(rename = "K")]
    pub k: u64,
    #[serde(rename = "M")]
    pub m: u64,
}

/// A benchmark row extended with its group's baseline and the derived metrics.
///
/// `base_time`, `speedup` and `efficiency` are either all present or all
/// absent: a group without a baseline run has nothing to compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
    #[serde(rename = "K")]
    pub k: u64,
    #[serde(rename = "M")]
    pub m: u64,
    pub processes: u32,
    pub execution_time: f64,
    pub base_time: Option<f64>,
    pub speedup: Option<f64>,
    pub efficiency: Option<f64>,
}

impl DerivedRow {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            k: self.k,
            m: self.m,
        }
    }
}

/// Column order of the derived table on disk, without pass-through columns.
pub const DERIVED_COLUMNS: [&str; 7] = [
    "K",
    "M",
    "processes",
    "execution_time",
    "base_time",
    "speedup",
    "efficiency",
];

/// Required columns of the benchmark input table.
pub const BENCHMARK_COLUMNS: [&str; 4] = ["K", "M", "processes", "execution_time"];

/// Columns appended after the input columns.
pub const METRIC_COLUMNS: [&str; 3] = ["base_time", "speedup", "efficiency"];

/// Single (processes, time) sample for the timing chart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimingPoint {
    pub processes: u32,
    pub execution_time: f64,
    #[serde(rename = "K")]
    pub k: Option<u64>,
    #[serde(rename = "M")]
    pub m: Option<u64>,
}

/// One named time-step column of a solver output table.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStep {
    pub name: String,
    pub step: u64,
    pub values: Vec<f64>,
}

/// Solver output: a spatial grid plus u(t, x) snapshots, in file column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionTable {
    pub x: Vec<f64>,
    pub steps: Vec<TimeStep>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}
