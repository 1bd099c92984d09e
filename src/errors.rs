use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("Failed to read {path}: {source}")]
    TableReadError { path: PathBuf, source: csv::Error },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Invalid record in {path} at line {line}: {detail}")]
    InvalidRecord {
        path: PathBuf,
        line: u64,
        detail: String,
    },

    #[error("Column '{column}' in {path} is not a time-step column (expected <name>_<step>)")]
    InvalidTimeColumn { path: PathBuf, column: String },

    #[error("Failed to write {path}: {source}")]
    TableWriteError { path: PathBuf, source: csv::Error },

    #[error("Nothing to plot: {what} is empty")]
    EmptyInput { what: String },

    #[error("Config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file {path}: {detail}")]
    InvalidConfig { path: PathBuf, detail: String },
}
