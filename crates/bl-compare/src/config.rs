//! Comparison settings: JSON file plus `BAYESLOOP_*` environment overrides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use bl_optimizer::GpBoConfig;
use bl_types::{config_error, BoError, BoResult};

pub const CONFIG_ENV: &str = "BAYESLOOP_CONFIG";
pub const ITERATIONS_ENV: &str = "BAYESLOOP_ITERATIONS";
pub const SEED_ENV: &str = "BAYESLOOP_SEED";
pub const OUTPUT_DIR_ENV: &str = "BAYESLOOP_OUTPUT_DIR";
pub const FUNCTION_ENV: &str = "BAYESLOOP_FUNCTION";
pub const NOISELESS_ENV: &str = "BAYESLOOP_NOISELESS";

/// Benchmark objective to optimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveName {
    #[default]
    Forrester,
    ForresterLow,
    Branin,
    SixHumpCamel,
}

impl ObjectiveName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveName::Forrester => "forrester",
            ObjectiveName::ForresterLow => "forrester_low",
            ObjectiveName::Branin => "branin",
            ObjectiveName::SixHumpCamel => "six_hump_camel",
        }
    }
}

impl fmt::Display for ObjectiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectiveName {
    type Err = BoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forrester" => Ok(ObjectiveName::Forrester),
            "forrester_low" => Ok(ObjectiveName::ForresterLow),
            "branin" => Ok(ObjectiveName::Branin),
            "six_hump_camel" => Ok(ObjectiveName::SixHumpCamel),
            other => Err(config_error!("unknown objective function: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub function: ObjectiveName,
    /// Initial design. `None` picks a default for the objective.
    pub initial_points: Option<Vec<Vec<f64>>>,
    pub num_iterations: usize,
    pub output_dir: PathBuf,
    /// Resolution of the true-function curve in the report.
    pub grid_points: usize,
    pub optimizer: GpBoConfig,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            function: ObjectiveName::Forrester,
            initial_points: None,
            num_iterations: 10,
            output_dir: PathBuf::from("bayesloop-output"),
            grid_points: 200,
            optimizer: GpBoConfig::default(),
        }
    }
}

impl CompareConfig {
    /// Defaults, then the file named by `BAYESLOOP_CONFIG`, then
    /// individual environment overrides.
    pub fn load() -> BoResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> BoResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| config_error!("cannot read {}: {e}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> BoResult<Self> {
        serde_json::from_str(raw).map_err(|e| config_error!("invalid config: {e}"))
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> BoResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ITERATIONS_ENV) {
            self.num_iterations = parse_var(ITERATIONS_ENV, &v)?;
        }
        if let Some(v) = lookup(SEED_ENV) {
            self.optimizer.seed = parse_var(SEED_ENV, &v)?;
        }
        if let Some(v) = lookup(OUTPUT_DIR_ENV) {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(FUNCTION_ENV) {
            self.function = v.parse()?;
        }
        if let Some(v) = lookup(NOISELESS_ENV) {
            self.optimizer.noiseless = parse_bool(NOISELESS_ENV, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> BoResult<()> {
        if self.optimizer.batch_size == 0 {
            return Err(config_error!("batch_size must be at least 1"));
        }
        if self.grid_points < 2 {
            return Err(config_error!("grid_points must be at least 2"));
        }
        if let Some(points) = &self.initial_points {
            if points.is_empty() {
                return Err(config_error!("initial_points must not be empty"));
            }
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> BoResult<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| config_error!("{key}={value:?}: {e}"))
}

fn parse_bool(key: &str, value: &str) -> BoResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(config_error!("{key}={value:?}: expected a boolean")),
    }
}
