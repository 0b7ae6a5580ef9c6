//! Configuration module for coinregime.
//!
//! Pipeline tunables come from defaults, an optional TOML file and
//! `COINREGIME_*` environment variables; file locations from the CLI.

mod paths_config;
mod pipeline_config;

pub use paths_config::PathsConfig;
pub use pipeline_config::PipelineConfig;
