use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, warn};

use crate::types::{BenchmarkRow, DerivedRow, GroupKey};

/// Baseline time per (K, M) group.
///
/// The baseline is the execution time of the group's `baseline_processes` run
/// scaled by that process count, i.e. the single-process time under ideal
/// linear speedup. If a group holds several such runs the first one in input
/// order wins. Groups without one are absent from the map.
pub fn baselines(rows: &[BenchmarkRow], baseline_processes: u32) -> HashMap<GroupKey, f64> {
    let mut out = HashMap::new();

    for row in rows.iter().filter(|r| r.processes == baseline_processes) {
        match out.entry(row.key()) {
            Entry::Vacant(slot) => {
                slot.insert(row.execution_time * f64::from(baseline_processes));
            }
            Entry::Occupied(_) => {
                warn!(
                    k = row.k,
                    m = row.m,
                    processes = baseline_processes,
                    "duplicate baseline run, keeping the first"
                );
            }
        }
    }

    out
}

/// Attach each group's baseline to its rows and compute speedup and efficiency.
///
/// Row order is preserved. Rows of a group without a baseline get `None` for
/// all derived values. A zero execution time is not special-cased and yields
/// an infinite (or NaN) speedup.
pub fn derive_metrics(rows: &[BenchmarkRow], baseline_processes: u32) -> Vec<DerivedRow> {
    let base = baselines(rows, baseline_processes);
    debug!(
        rows = rows.len(),
        groups_with_baseline = base.len(),
        "deriving metrics"
    );

    rows.iter()
        .map(|row| {
            let base_time = base.get(&row.key()).copied();
            let speedup = base_time.map(|b| b / row.execution_time);
            let efficiency = speedup.map(|s| s / f64::from(row.processes) * 100.0);
            DerivedRow {
                k: row.k,
                m: row.m,
                processes: row.processes,
                execution_time: row.execution_time,
                base_time,
                speedup,
                efficiency,
            }
        })
        .collect()
}

/// Groups that have no baseline run, in first-seen order.
pub fn groups_without_baseline(rows: &[DerivedRow]) -> Vec<GroupKey> {
    let mut seen = Vec::new();
    for row in rows.iter().filter(|r| r.base_time.is_none()) {
        let key = row.key();
        if !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen
}
