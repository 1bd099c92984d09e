use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use perfmetrics::config::Config;
use perfmetrics::display;
use perfmetrics::errors::MetricsError;
use perfmetrics::export;
use perfmetrics::metrics;
use perfmetrics::parse;
use perfmetrics::plot;
use perfmetrics::summary;
use perfmetrics::types::ReportFormat;

#[derive(Parser)]
#[command(
    name = "perfmetrics",
    version,
    about = "Speedup and efficiency reports for parallel benchmark runs"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (default: ./perfmetrics.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Derive speedup/efficiency from a benchmark table (default)
    Analyze(AnalyzeArgs),
    /// Chart execution time against process count
    Timing(TimingArgs),
    /// Chart a solver output table in 2D and 3D
    Solution(SolutionArgs),
}

#[derive(Args, Default)]
struct AnalyzeArgs {
    /// Benchmark table with K, M, processes, execution_time
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the derived table
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Process count of the reference run
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    baseline_processes: Option<u32>,

    #[arg(long, default_value = "markdown")]
    format: ReportFormat,

    /// Performance chart destination
    #[arg(long, conflicts_with = "no_plot")]
    plot: Option<PathBuf>,

    /// Skip the performance chart
    #[arg(long)]
    no_plot: bool,
}

#[derive(Args)]
struct TimingArgs {
    /// Table with processes and execution_time columns
    file: PathBuf,

    /// Only rows with this K
    #[arg(long)]
    k: Option<u64>,

    /// Only rows with this M
    #[arg(long)]
    m: Option<u64>,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SolutionArgs {
    /// Solver output with an x column and <name>_<step> columns
    file: PathBuf,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Simulated end time used for the time axis
    #[arg(long)]
    final_time: Option<f64>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn analyze(args: AnalyzeArgs, config: &Config) -> Result<()> {
    let input = args.input.unwrap_or_else(|| config.input.clone());
    let output = args.output.unwrap_or_else(|| config.output.clone());
    let baseline_processes = args.baseline_processes.unwrap_or(config.baseline_processes);
    let plot_path = match (args.no_plot, args.plot) {
        (true, _) => None,
        (false, Some(path)) => Some(path),
        (false, None) if config.no_plot => None,
        (false, None) => Some(config.plot.clone()),
    };

    let table = parse::load_benchmark_table(&input)?;
    let rows = &table.rows;
    let derived = metrics::derive_metrics(rows, baseline_processes);

    for key in metrics::groups_without_baseline(&derived) {
        warn!(
            k = key.k,
            m = key.m,
            baseline_processes,
            "no baseline run, metrics left empty"
        );
    }

    export::write_metrics_with_extra(&output, &derived, &table.extra)?;

    let summary = summary::summarize(&derived);
    let report = match args.format {
        ReportFormat::Markdown => display::format_markdown(&summary),
        ReportFormat::Json => display::format_json(&summary, baseline_processes, Utc::now()),
    };
    print!("{}", report);

    if let Some(path) = plot_path {
        if rows.is_empty() {
            info!("empty benchmark table, skipping chart");
        } else {
            plot::render_performance(rows, &path)?;
        }
    }

    Ok(())
}

fn timing(args: TimingArgs, config: &Config) -> Result<()> {
    let output = args.output.unwrap_or_else(|| config.timing_plot.clone());
    let points = parse::load_timings(&args.file)?;
    let series = plot::timing_series(&points, args.k, args.m);

    if series.is_empty() && !points.is_empty() {
        return Err(MetricsError::EmptyInput {
            what: format!(
                "selection (K={}, M={})",
                args.k.map_or("*".to_string(), |k| k.to_string()),
                args.m.map_or("*".to_string(), |m| m.to_string())
            ),
        }
        .into());
    }

    plot::render_timing(&series, &output)?;
    println!("Plot saved to {}", output.display());
    Ok(())
}

fn solution(args: SolutionArgs, config: &Config) -> Result<()> {
    let dir = args
        .output_dir
        .unwrap_or_else(|| config.solution.output_dir.clone());
    let final_time = args.final_time.unwrap_or(config.solution.final_time);

    let table = parse::load_solution(&args.file)?;
    let (lines, surface) = plot::render_solution(&table, final_time, &dir)?;

    println!("Plot saved to {}", lines.display());
    println!("3D plot saved to {}", surface.display());
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = Config::load(cli.config.as_deref(), &cwd)?;

    match cli.command {
        None => analyze(AnalyzeArgs::default(), &config),
        Some(Command::Analyze(args)) => analyze(args, &config),
        Some(Command::Timing(args)) => timing(args, &config),
        Some(Command::Solution(args)) => solution(args, &config),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
