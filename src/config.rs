use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MetricsError;
use crate::types::DEFAULT_BASELINE_PROCESSES;

pub const LOCAL_CONFIG_FILE: &str = "perfmetrics.toml";

/// Defaults for every command, overridable from the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub baseline_processes: u32,
    pub plot: PathBuf,
    /// Skip the performance chart unless `--plot` is given.
    pub no_plot: bool,
    pub timing_plot: PathBuf,
    pub solution: SolutionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolutionConfig {
    pub output_dir: PathBuf,
    pub final_time: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("benchmark_results.csv"),
            output: PathBuf::from("performance_metrics.csv"),
            baseline_processes: DEFAULT_BASELINE_PROCESSES,
            plot: PathBuf::from("parallel_performance_analysis.svg"),
            no_plot: false,
            timing_plot: PathBuf::from("execution_time_vs_processes.svg"),
            solution: SolutionConfig::default(),
        }
    }
}

impl Default for SolutionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("plots"),
            final_time: 1.0,
        }
    }
}

impl Config {
    /// Parse a config file. Missing keys take their default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| MetricsError::ConfigReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| MetricsError::ConfigParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), MetricsError> {
        let invalid = |detail: &str| MetricsError::InvalidConfig {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        };
        if self.baseline_processes == 0 {
            return Err(invalid("baseline_processes must be at least 1"));
        }
        if !(self.solution.final_time.is_finite() && self.solution.final_time > 0.0) {
            return Err(invalid("solution.final_time must be a positive number"));
        }
        Ok(())
    }

    /// Resolve the active config.
    ///
    /// An explicit path must exist. Otherwise `perfmetrics.toml` in `cwd` is
    /// tried, then `<config dir>/perfmetrics/config.toml`, then defaults.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(MetricsError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
            return Self::from_file(path);
        }

        let candidates = std::iter::once(cwd.join(LOCAL_CONFIG_FILE))
            .chain(dirs::config_dir().map(|d| d.join("perfmetrics").join("config.toml")));

        for candidate in candidates {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "using config file");
                return Self::from_file(&candidate);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_match_script_file_names() {
        let config = Config::default();
        assert_eq!(config.input, PathBuf::from("benchmark_results.csv"));
        assert_eq!(config.output, PathBuf::from("performance_metrics.csv"));
        assert_eq!(config.baseline_processes, 2);
        assert_eq!(config.solution.output_dir, PathBuf::from("plots"));
        assert_eq!(config.solution.final_time, 1.0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(
            &path,
            "input = \"runs.csv\"\nbaseline_processes = 4\n\n[solution]\nfinal_time = 2.5\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.input, PathBuf::from("runs.csv"));
        assert_eq!(config.baseline_processes, 4);
        assert_eq!(config.output, PathBuf::from("performance_metrics.csv"));
        assert_eq!(config.solution.final_time, 2.5);
        assert_eq!(config.solution.output_dir, PathBuf::from("plots"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "inptu = \"typo.csv\"\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MetricsError>(),
            Some(MetricsError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn zero_baseline_processes_is_rejected() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("zero.toml");
        fs::write(&path, "baseline_processes = 0\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        match err.downcast_ref::<MetricsError>() {
            Some(MetricsError::InvalidConfig { detail, .. }) => {
                assert!(detail.contains("baseline_processes"))
            }
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn non_positive_final_time_is_rejected() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("time.toml");
        fs::write(&path, "[solution]\nfinal_time = -1.0\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("final_time"));
    }

    #[test]
    fn no_plot_key_turns_chart_off() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("quiet.toml");
        fs::write(&path, "no_plot = true\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.no_plot);
        assert!(!Config::default().no_plot);
    }

    #[test]
    fn explicit_missing_path_errors() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let missing = tmp.path().join("missing.toml");

        let err = Config::load(Some(&missing), tmp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MetricsError>(),
            Some(MetricsError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn local_file_is_picked_up() {
        let tmp = assert_fs::TempDir::new().unwrap();
        fs::write(tmp.path().join(LOCAL_CONFIG_FILE), "output = \"metrics.csv\"\n").unwrap();

        let config = Config::load(None, tmp.path()).unwrap();
        assert_eq!(config.output, PathBuf::from("metrics.csv"));
    }
}
