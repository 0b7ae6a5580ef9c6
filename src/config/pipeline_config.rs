//! Pipeline parameters: feature windows, thresholds and clustering policy.
//!
//! Values come from defaults, then an optional TOML file, then
//! `COINREGIME_*` environment variables.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Tunables of the feature and clustering stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // Feature extraction
    pub min_bars_per_month: usize,
    pub rolling_window_vol: usize,
    pub rolling_window_volume_spike: usize,
    pub jump_sigma_multiplier: f64,
    pub volume_spike_multiplier: f64,
    pub extreme_skew_threshold: f64,
    pub extreme_kurtosis_threshold: f64,

    // Clustering
    pub k_min: usize,
    pub k_max: usize,
    pub random_restarts: usize,
    pub random_seed: u64,
    pub max_iterations: usize,
    pub convergence_tolerance: f64,

    // Execution
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_bars_per_month: 100,
            rolling_window_vol: 15,
            rolling_window_volume_spike: 60,
            jump_sigma_multiplier: 3.0,
            volume_spike_multiplier: 2.0,
            extreme_skew_threshold: 1.5,
            extreme_kurtosis_threshold: 100.0,
            k_min: 3,
            k_max: 6,
            random_restarts: 20,
            random_seed: 50,
            max_iterations: 300,
            convergence_tolerance: 1e-4,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// TOML file (missing keys fall back to defaults), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str::<PipelineConfig>(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        self.min_bars_per_month = parse_env("COINREGIME_MIN_BARS", self.min_bars_per_month)?;
        self.rolling_window_vol = parse_env("COINREGIME_VOL_WINDOW", self.rolling_window_vol)?;
        self.rolling_window_volume_spike = parse_env(
            "COINREGIME_VOLUME_SPIKE_WINDOW",
            self.rolling_window_volume_spike,
        )?;
        self.jump_sigma_multiplier =
            parse_env("COINREGIME_JUMP_SIGMA", self.jump_sigma_multiplier)?;
        self.volume_spike_multiplier = parse_env(
            "COINREGIME_VOLUME_SPIKE_MULTIPLIER",
            self.volume_spike_multiplier,
        )?;
        self.extreme_skew_threshold =
            parse_env("COINREGIME_EXTREME_SKEW", self.extreme_skew_threshold)?;
        self.extreme_kurtosis_threshold =
            parse_env("COINREGIME_EXTREME_KURTOSIS", self.extreme_kurtosis_threshold)?;
        self.k_min = parse_env("COINREGIME_K_MIN", self.k_min)?;
        self.k_max = parse_env("COINREGIME_K_MAX", self.k_max)?;
        self.random_restarts = parse_env("COINREGIME_RESTARTS", self.random_restarts)?;
        self.random_seed = parse_env("COINREGIME_SEED", self.random_seed)?;
        self.max_iterations = parse_env("COINREGIME_MAX_ITERATIONS", self.max_iterations)?;
        self.convergence_tolerance =
            parse_env("COINREGIME_TOLERANCE", self.convergence_tolerance)?;
        self.parallel = parse_env("COINREGIME_PARALLEL", self.parallel)?;
        Ok(())
    }

    /// Rejects values the engines cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.min_bars_per_month < 2 {
            bail!("min_bars_per_month must be at least 2, got {}", self.min_bars_per_month);
        }
        if self.rolling_window_vol < 2 {
            bail!("rolling_window_vol must be at least 2, got {}", self.rolling_window_vol);
        }
        if self.rolling_window_volume_spike < 1 {
            bail!("rolling_window_volume_spike must be at least 1");
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.jump_sigma_multiplier) || !positive(self.volume_spike_multiplier) {
            bail!("jump_sigma_multiplier and volume_spike_multiplier must be positive");
        }
        if !self.extreme_skew_threshold.is_finite() || self.extreme_skew_threshold < 0.0 {
            bail!(
                "extreme_skew_threshold must be a finite non-negative number, got {}",
                self.extreme_skew_threshold
            );
        }
        if !self.extreme_kurtosis_threshold.is_finite() {
            bail!(
                "extreme_kurtosis_threshold must be finite, got {}",
                self.extreme_kurtosis_threshold
            );
        }
        if self.k_min < 2 {
            bail!("k_min must be at least 2, got {}", self.k_min);
        }
        if self.k_min > self.k_max {
            bail!("k_min ({}) must not exceed k_max ({})", self.k_min, self.k_max);
        }
        if self.random_restarts == 0 {
            bail!("random_restarts must be at least 1");
        }
        if self.max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }
        if self.convergence_tolerance.is_nan() || self.convergence_tolerance < 0.0 {
            bail!("convergence_tolerance must not be negative");
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Failed to parse {}='{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
