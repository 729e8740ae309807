use serde::Deserialize;
use thiserror::Error;

use crate::application::down_sampler::DEFAULT_DOWN_SAMPLE_BUDGET;
use crate::application::format::DEFAULT_PRECISION_DIVISOR;
use crate::application::stuck_sensor::DEFAULT_STUCK_WINDOW;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    /// Optional TOML file of preloaded and predicted series
    #[serde(default)]
    pub preloaded_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Upper bound, in seconds, on the time axis of one run
    #[serde(default = "default_run_length")]
    pub run_length: f64,
    #[serde(default = "default_down_sample_budget")]
    pub down_sample_budget: usize,
    #[serde(default = "default_precision_divisor")]
    pub precision_divisor: f64,
    #[serde(default = "default_stuck_window")]
    pub stuck_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_length: default_run_length(),
            down_sample_budget: default_down_sample_budget(),
            precision_divisor: default_precision_divisor(),
            stuck_window: default_stuck_window(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_simulator_name")]
    pub name: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_simulated_columns")]
    pub columns: Vec<SimulatedColumnConfig>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            name: default_simulator_name(),
            poll_interval_ms: default_poll_interval_ms(),
            columns: default_simulated_columns(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SimulatedColumnConfig {
    pub unit: String,
    pub position: i32,
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    #[serde(default = "default_period_secs")]
    pub period_secs: f64,
}

fn default_run_length() -> f64 {
    20.0
}

fn default_down_sample_budget() -> usize {
    DEFAULT_DOWN_SAMPLE_BUDGET
}

fn default_precision_divisor() -> f64 {
    DEFAULT_PRECISION_DIVISOR
}

fn default_stuck_window() -> usize {
    DEFAULT_STUCK_WINDOW
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_simulator_name() -> String {
    "Simulated Sensor".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_amplitude() -> f64 {
    1.0
}

fn default_period_secs() -> f64 {
    5.0
}

fn default_simulated_columns() -> Vec<SimulatedColumnConfig> {
    vec![
        SimulatedColumnConfig {
            unit: "degC".to_string(),
            position: 0,
            offset: 21.0,
            amplitude: 0.5,
            period_secs: 10.0,
        },
        SimulatedColumnConfig {
            unit: "N".to_string(),
            position: 1,
            offset: 0.0,
            amplitude: 5.0,
            period_secs: 2.0,
        },
    ]
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("run_length must be a positive number of seconds, got {0}")]
    InvalidRunLength(f64),
    #[error("down_sample_budget must be greater than zero")]
    ZeroDownSampleBudget,
    #[error("precision_divisor must be positive, got {0}")]
    InvalidPrecisionDivisor(f64),
    #[error("stuck_window must hold at least 2 snapshots, got {0}")]
    StuckWindowTooSmall(usize),
    #[error("simulator poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if !(p.run_length.is_finite() && p.run_length > 0.0) {
            return Err(ConfigError::InvalidRunLength(p.run_length));
        }
        if p.down_sample_budget == 0 {
            return Err(ConfigError::ZeroDownSampleBudget);
        }
        if !(p.precision_divisor.is_finite() && p.precision_divisor > 0.0) {
            return Err(ConfigError::InvalidPrecisionDivisor(p.precision_divisor));
        }
        if p.stuck_window < 2 {
            return Err(ConfigError::StuckWindowTooSmall(p.stuck_window));
        }
        if self.simulator.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

fn build_config(builder: config::ConfigBuilder<config::builder::DefaultState>) -> anyhow::Result<AppConfig> {
    let settings: AppConfig = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

/// Load `config/sensors.*` (optional) with `SENSORS__` environment overrides.
pub fn load_config() -> anyhow::Result<AppConfig> {
    build_config(
        config::Config::builder()
            .add_source(config::File::with_name("config/sensors").required(false))
            .add_source(
                config::Environment::with_prefix("SENSORS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            ),
    )
}
