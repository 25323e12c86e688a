// Chain parameters - Versioned table the adaptors are built from
//
// Replaces a process-wide parameter table: the controller owns one instance,
// governance plans are applied to it explicitly, and every applied plan bumps
// `version`.

use crate::consensus::{AdaptorError, GasAdaptor, PowAdaptor};
use crate::governance::Plan;
use crate::types::primitives::big_uint_dec;
use crate::types::RawRatio;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use tracing::info;

/// Adaptive controller parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    /// Incremented each time a plan changes at least one value
    #[serde(default)]
    pub version: u64,

    /// Difficulty the PoW adaptor starts from
    #[serde(with = "big_uint_dec")]
    pub difficulty: BigUint,

    /// Target share of PoW transactions, in (0, 1]
    pub target_pow_ratio: RawRatio,

    /// PoW gas ceiling bounds and start value
    pub min_pow_gas: u64,
    pub max_pow_gas: u64,
    pub initial_gas: u64,

    /// PoW price band
    #[serde(with = "big_uint_dec")]
    pub min_price: BigUint,
    #[serde(with = "big_uint_dec")]
    pub max_price: BigUint,

    /// EMA weight of the newest sample
    pub alpha: RawRatio,

    /// Per-block difficulty factor bounds
    pub fmin: RawRatio,
    pub fmax: RawRatio,

    /// PI gains of the price controller
    pub kp: RawRatio,
    pub ki: RawRatio,
}

/// One value written by a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamChange {
    pub name: &'static str,
    pub old: String,
    pub new: String,
}

impl ChainParams {
    /// Default network parameters
    pub fn mainnet() -> Self {
        Self {
            version: 0,
            difficulty: BigUint::from(1_000_000u64),
            target_pow_ratio: RawRatio::new(3, 10),
            min_pow_gas: 5_000_000,
            max_pow_gas: 30_000_000,
            initial_gas: 15_000_000,
            min_price: BigUint::from(100u64),
            max_price: BigUint::from(10_000u64),
            alpha: RawRatio::new(2, 10),
            fmin: RawRatio::new(8, 10),
            fmax: RawRatio::new(12, 10),
            kp: RawRatio::new(1, 10),
            ki: RawRatio::new(1, 100),
        }
    }

    /// Loads from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Saves to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn build_pow_adaptor(&self) -> Result<PowAdaptor, AdaptorError> {
        PowAdaptor::new(
            self.target_pow_ratio,
            self.alpha,
            self.fmin,
            self.fmax,
            self.difficulty.clone(),
            self.kp,
            self.ki,
            self.min_price.clone(),
            self.max_price.clone(),
        )
    }

    pub fn build_gas_adaptor(&self) -> Result<GasAdaptor, AdaptorError> {
        GasAdaptor::new(self.min_pow_gas, self.max_pow_gas, self.initial_gas, self.alpha)
    }

    /// Checks that both adaptors can be built from these values
    pub fn validate(&self) -> Result<(), AdaptorError> {
        self.build_pow_adaptor()?;
        self.build_gas_adaptor()?;
        Ok(())
    }

    /// Writes every value the plan sets. Returns what changed.
    pub fn apply_plan(&mut self, plan: &Plan) -> Vec<ParamChange> {
        let mut changes = Vec::new();

        set(&mut changes, "Difficulty", &mut self.difficulty, &plan.difficulty);
        set(&mut changes, "TargetPowRatio", &mut self.target_pow_ratio, &plan.target_pow_ratio);
        set(&mut changes, "MinPowGas", &mut self.min_pow_gas, &plan.min_pow_gas);
        set(&mut changes, "MaxPowGas", &mut self.max_pow_gas, &plan.max_pow_gas);
        set(&mut changes, "InitialGas", &mut self.initial_gas, &plan.initial_gas);
        set(&mut changes, "MinPrice", &mut self.min_price, &plan.min_price);
        set(&mut changes, "MaxPrice", &mut self.max_price, &plan.max_price);
        set(&mut changes, "Alpha", &mut self.alpha, &plan.alpha);
        set(&mut changes, "Fmin", &mut self.fmin, &plan.fmin);
        set(&mut changes, "Fmax", &mut self.fmax, &plan.fmax);
        set(&mut changes, "Kp", &mut self.kp, &plan.kp);
        set(&mut changes, "Ki", &mut self.ki, &plan.ki);

        if !changes.is_empty() {
            self.version += 1;
        }
        for change in &changes {
            info!(
                name = change.name,
                old = %change.old,
                new = %change.new,
                version = self.version,
                height = plan.height,
                "Parameter updated"
            );
        }
        changes
    }
}

impl Default for ChainParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

fn set<T: Clone + Display>(changes: &mut Vec<ParamChange>, name: &'static str, slot: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        changes.push(ParamChange {
            name,
            old: slot.to_string(),
            new: value.to_string(),
        });
        *slot = value.clone();
    }
}
