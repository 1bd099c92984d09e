use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, info};

use crate::errors::MetricsError;
use crate::types::{BenchmarkRow, GroupKey, SolutionTable, TimingPoint};

const FONT: &str = "sans-serif";

pub const SOLUTION_2D_FILE: &str = "transport_solution.svg";
pub const SOLUTION_3D_FILE: &str = "transport_solution_3d.svg";

/// Surface resolution cap per axis; larger grids are strided down.
const MAX_SURFACE_POINTS: usize = 80;

type Series = (String, Vec<(f64, f64)>);
type Panel<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Execution time against problem size (K*M), one series per process count.
pub fn size_series(rows: &[BenchmarkRow]) -> Vec<Series> {
    let mut by_processes: BTreeMap<u32, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows {
        by_processes
            .entry(row.processes)
            .or_default()
            .push((row.k as f64 * row.m as f64, row.execution_time));
    }
    by_processes
        .into_iter()
        .map(|(p, mut points)| {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            (format!("{} processes", p), points)
        })
        .collect()
}

/// Execution time against process count, one series per (K, M).
pub fn process_series(rows: &[BenchmarkRow]) -> Vec<Series> {
    let mut by_group: BTreeMap<GroupKey, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows {
        by_group
            .entry(row.key())
            .or_default()
            .push((f64::from(row.processes), row.execution_time));
    }
    by_group
        .into_iter()
        .map(|(key, mut points)| {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            (format!("K={}, M={}", key.k, key.m), points)
        })
        .collect()
}

/// (processes, time) points sorted by process count, optionally restricted to one (K, M).
///
/// A filter on K or M drops points that carry no K/M value.
pub fn timing_series(points: &[TimingPoint], k: Option<u64>, m: Option<u64>) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| k.is_none() || p.k == k)
        .filter(|p| m.is_none() || p.m == m)
        .map(|p| (f64::from(p.processes), p.execution_time))
        .collect();
    out.sort_by(|a, b| a.0.total_cmp(&b.0));
    out
}

/// Padded bounds over the strictly positive finite values, for a log axis.
pub fn log_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    (lo <= hi).then(|| (lo / 2.0, hi * 2.0))
}

/// Simulation time of a step column: `step / columns * final_time`.
pub fn step_time(step: u64, columns: usize, final_time: f64) -> f64 {
    if columns == 0 {
        return 0.0;
    }
    step as f64 / columns as f64 * final_time
}

/// At most `max` evenly strided indices into `0..len`, always keeping the last one.
pub fn strided_indices(len: usize, max: usize) -> Vec<usize> {
    if len <= max || max < 2 {
        return (0..len).collect();
    }
    let stride = (len - 1).div_ceil(max - 1);
    let mut out: Vec<usize> = (0..len).step_by(stride).collect();
    if out.last() != Some(&(len - 1)) {
        out.push(len - 1);
    }
    out
}

/// Purple-to-yellow ramp for `h` in [0, 1].
fn ramp(h: f64) -> HSLColor {
    let h = if h.is_finite() { h.clamp(0.0, 1.0) } else { 0.0 };
    HSLColor(0.75 - 0.6 * h, 0.75, 0.45)
}

fn log_panel(area: &Panel<'_>, caption: &str, x_desc: &str, series: &[Series]) -> Result<()> {
    let positive = |&(x, y): &(f64, f64)| x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0;

    let (x_lo, x_hi) =
        log_bounds(series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.0))).unwrap_or((1.0, 10.0));
    let (y_lo, y_hi) =
        log_bounds(series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.1))).unwrap_or((0.1, 10.0));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d((x_lo..x_hi).log_scale(), (y_lo..y_hi).log_scale())?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Time (s)")
        .draw()?;

    for (i, (label, points)) in series.iter().enumerate() {
        let points: Vec<(f64, f64)> = points.iter().copied().filter(positive).collect();
        if points.is_empty() {
            continue;
        }
        let color = Palette99::pick(i).mix(0.9);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Two-panel log-log overview of the benchmark table.
pub fn render_performance(rows: &[BenchmarkRow], path: &Path) -> Result<()> {
    if rows.is_empty() {
        return Err(MetricsError::EmptyInput {
            what: "benchmark table".to_string(),
        }
        .into());
    }

    let root = SVGBackend::new(path, (1600, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Parallel performance analysis", (FONT, 30))?;
    let panels = root.split_evenly((1, 2));

    log_panel(
        &panels[0],
        "Execution time vs problem size",
        "Problem size (K*M)",
        &size_series(rows),
    )?;
    log_panel(
        &panels[1],
        "Execution time for each K and M",
        "Processes",
        &process_series(rows),
    )?;

    root.present()?;
    info!(path = %path.display(), "wrote performance chart");
    Ok(())
}

/// Execution time against process count with every point labelled in seconds.
pub fn render_timing(points: &[(f64, f64)], path: &Path) -> Result<()> {
    if points.is_empty() {
        return Err(MetricsError::EmptyInput {
            what: "timing series".to_string(),
        }
        .into());
    }

    let x_max = points.iter().map(|p| p.0).fold(1.0, f64::max);
    let t_max = points
        .iter()
        .map(|p| p.1)
        .filter(|t| t.is_finite())
        .fold(0.0, f64::max);
    let y_max = if t_max > 0.0 { t_max * 1.1 } else { 1.0 };

    let root = SVGBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Execution time vs number of processes", (FONT, 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(0.5..(x_max + 0.5), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Processes")
        .y_desc("Execution time (s)")
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 5, BLUE.filled())))?;

    let label_style = TextStyle::from((FONT, 13).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    let lift = y_max * 0.015;
    chart.draw_series(points.iter().map(|&(p, t)| {
        Text::new(format!("{:.2}s", t), (p, t + lift), label_style.clone())
    }))?;

    root.present()?;
    info!(path = %path.display(), points = points.len(), "wrote timing chart");
    Ok(())
}

fn value_range(table: &SolutionTable) -> (f64, f64) {
    let (lo, hi) = table
        .steps
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        (0.0, 1.0)
    } else if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}

fn render_solution_lines(table: &SolutionTable, final_time: f64, path: &Path) -> Result<()> {
    let (x_lo, x_hi) = table
        .x
        .iter()
        .copied()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let (u_lo, u_hi) = value_range(table);
    let columns = table.steps.len();

    let root = SVGBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Transport equation solution at different time steps", (FONT, 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, u_lo..u_hi)?;

    chart.configure_mesh().x_desc("x").y_desc("u(t,x)").draw()?;

    for (i, step) in table.steps.iter().enumerate() {
        let h = if columns > 1 {
            i as f64 / (columns - 1) as f64
        } else {
            0.0
        };
        let color = ramp(h).to_rgba();
        let t = step_time(step.step, columns, final_time);
        chart
            .draw_series(LineSeries::new(
                table.x.iter().copied().zip(step.values.iter().copied()),
                color.stroke_width(2),
            ))?
            .label(format!("t = {:.2}", t))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn render_solution_surface(table: &SolutionTable, final_time: f64, path: &Path) -> Result<()> {
    let columns = table.steps.len();
    let xi = strided_indices(table.x.len(), MAX_SURFACE_POINTS);
    let ti = strided_indices(columns, MAX_SURFACE_POINTS);

    let xs: Vec<f64> = xi.iter().map(|&i| table.x[i]).collect();
    // Evenly spaced on [0, final_time], independent of the column labels.
    let ts: Vec<f64> = ti
        .iter()
        .map(|&j| {
            if columns > 1 {
                j as f64 / (columns - 1) as f64 * final_time
            } else {
                0.0
            }
        })
        .collect();

    let (x_lo, x_hi) = xs
        .iter()
        .copied()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let (u_lo, u_hi) = value_range(table);
    let t_hi = if final_time > 0.0 { final_time } else { 1.0 };

    let sample = |x: f64, t: f64| -> f64 {
        let col = xs.iter().position(|v| v.to_bits() == x.to_bits());
        let row = ts.iter().position(|v| v.to_bits() == t.to_bits());
        match (col, row) {
            (Some(c), Some(r)) => table.steps[ti[r]].values[xi[c]],
            _ => u_lo,
        }
    };
    let style = |u: &f64| ramp((u - u_lo) / (u_hi - u_lo)).filled();

    let root = SVGBackend::new(path, (1400, 1000)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Transport equation solution (3D view)", (FONT, 24))
        .margin(20)
        .build_cartesian_3d(x_lo..x_hi, u_lo..u_hi, 0.0..t_hi)?;

    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.15))
        .max_light_lines(3)
        .draw()?;

    chart.draw_series(
        SurfaceSeries::xoz(xs.iter().copied(), ts.iter().copied(), sample).style_func(&style),
    )?;

    root.present()?;
    Ok(())
}

/// 2D and 3D views of the solution's time evolution, written into `dir`.
///
/// `dir` is created if missing. Returns the paths of the two charts.
pub fn render_solution(table: &SolutionTable, final_time: f64, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    if table.x.is_empty() || table.steps.is_empty() {
        return Err(MetricsError::EmptyInput {
            what: "solution table".to_string(),
        }
        .into());
    }

    std::fs::create_dir_all(dir)?;
    debug!(dir = %dir.display(), "rendering solution charts");

    let lines = dir.join(SOLUTION_2D_FILE);
    render_solution_lines(table, final_time, &lines)?;

    let surface = dir.join(SOLUTION_3D_FILE);
    render_solution_surface(table, final_time, &surface)?;

    info!(
        lines = %lines.display(),
        surface = %surface.display(),
        "wrote solution charts"
    );
    Ok((lines, surface))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeStep;
    use std::fs;

    fn bench(k: u64, m: u64, processes: u32, execution_time: f64) -> BenchmarkRow {
        BenchmarkRow {
            k,
            m,
            processes,
            execution_time,
        }
    }

    fn sample_rows() -> Vec<BenchmarkRow> {
        vec![
            bench(100, 100, 4, 2.5),
            bench(10, 10, 2, 1.0),
            bench(100, 100, 2, 5.0),
            bench(10, 10, 4, 0.6),
        ]
    }

    fn sample_solution() -> SolutionTable {
        let x: Vec<f64> = (0..=20).map(|i| i as f64 / 20.0).collect();
        let steps = (0..4)
            .map(|s| TimeStep {
                name: format!("t_{}", s * 10),
                step: s * 10,
                values: x.iter().map(|v| (v - 0.1 * s as f64).max(0.0)).collect(),
            })
            .collect();
        SolutionTable { x, steps }
    }

    // --- series builders ---

    #[test]
    fn size_series_grouped_by_processes() {
        let series = size_series(&sample_rows());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].0, "2 processes");
        assert_eq!(series[0].1, vec![(100.0, 1.0), (10000.0, 5.0)]);
        assert_eq!(series[1].0, "4 processes");
    }

    #[test]
    fn process_series_grouped_by_problem_size() {
        let series = process_series(&sample_rows());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].0, "K=10, M=10");
        assert_eq!(series[0].1, vec![(2.0, 1.0), (4.0, 0.6)]);
        assert_eq!(series[1].0, "K=100, M=100");
    }

    #[test]
    fn timing_series_sorted_and_filtered() {
        let points = vec![
            TimingPoint {
                processes: 4,
                execution_time: 3.0,
                k: Some(1),
                m: Some(1),
            },
            TimingPoint {
                processes: 2,
                execution_time: 6.0,
                k: Some(1),
                m: Some(1),
            },
            TimingPoint {
                processes: 2,
                execution_time: 9.0,
                k: Some(2),
                m: Some(1),
            },
        ];

        assert_eq!(timing_series(&points, None, None).len(), 3);
        assert_eq!(
            timing_series(&points, Some(1), Some(1)),
            vec![(2.0, 6.0), (4.0, 3.0)]
        );
        assert_eq!(timing_series(&points, Some(2), None), vec![(2.0, 9.0)]);
        assert!(timing_series(&points, Some(3), None).is_empty());
    }

    // --- helpers ---

    #[test]
    fn log_bounds_ignores_non_positive() {
        let bounds = log_bounds([0.0, -1.0, 2.0, 8.0, f64::INFINITY].into_iter());
        assert_eq!(bounds, Some((1.0, 16.0)));
        assert_eq!(log_bounds([0.0, -3.0].into_iter()), None);
    }

    #[test]
    fn step_time_scales_by_column_count() {
        assert_eq!(step_time(0, 4, 1.0), 0.0);
        assert_eq!(step_time(2, 4, 1.0), 0.5);
        assert_eq!(step_time(2, 4, 2.0), 1.0);
        assert_eq!(step_time(3, 0, 1.0), 0.0);
    }

    #[test]
    fn strided_indices_keep_ends() {
        assert_eq!(strided_indices(5, 10), vec![0, 1, 2, 3, 4]);
        let idx = strided_indices(1000, 80);
        assert!(idx.len() <= 81);
        assert_eq!(idx[0], 0);
        assert_eq!(*idx.last().unwrap(), 999);
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
    }

    // --- rendering ---

    #[test]
    fn performance_chart_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perf.svg");
        render_performance(&sample_rows(), &path).unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("K=10, M=10"));
    }

    #[test]
    fn performance_chart_rejects_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perf.svg");
        assert!(render_performance(&[], &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn timing_chart_labels_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timing.svg");
        render_timing(&[(1.0, 22.4666), (2.0, 11.4176), (16.0, 1.822)], &path).unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("22.47s"));
        assert!(svg.contains("1.82s"));
    }

    #[test]
    fn solution_charts_created_in_new_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plots");

        let (lines, surface) = render_solution(&sample_solution(), 1.0, &out).unwrap();
        assert_eq!(lines, out.join(SOLUTION_2D_FILE));
        assert_eq!(surface, out.join(SOLUTION_3D_FILE));
        assert!(surface.is_file());

        let svg = fs::read_to_string(&lines).unwrap();
        // step 30 of 4 columns
        assert!(svg.contains("t = 7.50"));
    }

    #[test]
    fn solution_rejects_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = SolutionTable {
            x: vec![],
            steps: vec![],
        };
        assert!(render_solution(&table, 1.0, dir.path()).is_err());
    }
}
