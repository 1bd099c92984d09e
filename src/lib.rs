pub mod config;
pub mod display;
pub mod errors;
pub mod export;
pub mod metrics;
pub mod parse;
pub mod plot;
pub mod summary;
pub mod types;
