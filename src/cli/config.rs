// CLI Configuration - Convert CLI args to simulation config
// Principle: Clear mapping between user input and internal configuration

use crate::cli::SimulateCmd;
use crate::consensus::AdaptorError;
use crate::genesis::ChainParams;
use crate::governance::Plan;
use std::path::{Path, PathBuf};
use tracing::info;

/// Simulation configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Parameter table the controller starts from
    pub params: ChainParams,
    /// Plans submitted to the pool before block 1
    pub plans: Vec<Plan>,
    /// Blocks produced after genesis
    pub blocks: u64,
    /// Noise seed
    pub seed: u64,
    /// Uniform noise amplitude on the PoW share
    pub noise: f64,
    /// Progress log interval, 0 disables
    pub report_every: u64,
}

impl SimulationConfig {
    pub fn from_simulate_cmd(cmd: &SimulateCmd) -> Result<Self, ConfigError> {
        if cmd.blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }
        if !cmd.noise.is_finite() || !(0.0..=1.0).contains(&cmd.noise) {
            return Err(ConfigError::InvalidNoise(cmd.noise));
        }

        let params = load_params(cmd.params.as_deref())?;
        let plans = match &cmd.plans {
            Some(path) => load_plans(path)?,
            None => Vec::new(),
        };

        Ok(Self {
            params,
            plans,
            blocks: cmd.blocks,
            seed: cmd.seed,
            noise: cmd.noise,
            report_every: cmd.report_every,
        })
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            params: ChainParams::mainnet(),
            plans: Vec::new(),
            blocks: 1000,
            seed: 42,
            noise: 0.05,
            report_every: 0,
        }
    }
}

/// Loads and validates a parameter file, or returns the defaults.
pub fn load_params(path: Option<&Path>) -> Result<ChainParams, ConfigError> {
    let params = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::ParamsNotFound(path.to_path_buf()));
            }
            let params = ChainParams::from_file(path).map_err(|source| ConfigError::ParamsRead {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), version = params.version, "Loaded parameters");
            params
        }
        None => ChainParams::mainnet(),
    };
    params.validate()?;
    Ok(params)
}

/// Loads a JSON array of plans. Plan ids in the file are ignored.
pub fn load_plans(path: &Path) -> Result<Vec<Plan>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::PlansRead {
        path: path.to_path_buf(),
        source,
    })?;
    let plans: Vec<Plan> =
        serde_json::from_str(&content).map_err(|e| ConfigError::PlansParse(e.to_string()))?;
    info!(path = %path.display(), count = plans.len(), "Loaded plans");
    Ok(plans)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Parameter file not found: {0}")]
    ParamsNotFound(PathBuf),

    #[error("Failed to read parameters from {path}: {source}")]
    ParamsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] AdaptorError),

    #[error("Failed to read plans from {path}: {source}")]
    PlansRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plans: {0}")]
    PlansParse(String),

    #[error("Noise amplitude must be within [0, 1], got {0}")]
    InvalidNoise(f64),

    #[error("Simulation needs at least one block")]
    NoBlocks,
}
