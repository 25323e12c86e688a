// Runner - Simulation driver for powctl
// Principle: Drive the controller through its service handle exactly as a block builder would
//
// The miner population is a linear response model: the PoW share falls as
// difficulty rises above its starting value and rises with the PoW price, plus
// uniform noise. Floats are used only here and in the summary.

use crate::cli::config::{ConfigError, SimulationConfig};
use crate::genesis::ChainParams;
use crate::governance::PlanPool;
use crate::node::{AdaptiveController, ControllerError, ControllerService};
use crate::types::{AdaptiveHeaderFields, BlockObservation, RawRatio};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Resolution of the PoW share handed to the controller
pub const SHARE_SCALE: u64 = 10_000;

/// Share of the gas ceiling the population wants at genesis
pub const BASE_GAS_DEMAND: f64 = 0.6;

/// Share sensitivity to relative difficulty
const DIFFICULTY_WEIGHT: f64 = 0.1;

/// Share sensitivity to relative price
const PRICE_WEIGHT: f64 = 0.05;

pub(crate) fn ratio_f64(ratio: RawRatio) -> f64 {
    if ratio.denominator == 0 {
        return 0.0;
    }
    ratio.numerator as f64 / ratio.denominator as f64
}

fn big_f64(value: &BigUint) -> f64 {
    value.to_f64().unwrap_or(f64::MAX)
}

/// Synthetic miner population
#[derive(Debug, Clone)]
pub struct MinerModel {
    target: f64,
    reference_difficulty: f64,
    reference_price: f64,
    gas_demand: f64,
    noise: f64,
    rng: StdRng,
}

impl MinerModel {
    pub fn new(params: &ChainParams, seed: u64, noise: f64) -> Self {
        let reference_price = (&params.min_price + &params.max_price) / BigUint::from(2u8);
        Self {
            target: ratio_f64(params.target_pow_ratio),
            reference_difficulty: big_f64(&params.difficulty).max(1.0),
            reference_price: big_f64(&reference_price).max(1.0),
            gas_demand: params.initial_gas as f64 * BASE_GAS_DEMAND,
            noise,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Measures the block built on top of `parent`.
    pub fn observe(&mut self, parent: &AdaptiveHeaderFields) -> BlockObservation {
        let difficulty = big_f64(&parent.difficulty) / self.reference_difficulty;
        let price = parent
            .pow_price
            .as_ref()
            .map_or(self.reference_price, big_f64)
            / self.reference_price;
        let jitter = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };

        let share = (self.target + DIFFICULTY_WEIGHT * (1.0 - difficulty) + PRICE_WEIGHT * (price - 1.0) + jitter)
            .clamp(0.0, 1.0);
        let demand = (self.gas_demand * (1.0 + jitter)).max(0.0);

        BlockObservation::new(
            RawRatio::new((share * SHARE_SCALE as f64).round() as u64, SHARE_SCALE),
            RawRatio::new(demand.round() as u64, parent.pow_gas.max(1)),
        )
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub blocks: u64,
    pub last: AdaptiveHeaderFields,
    pub params_version: u64,
    /// Largest |d(n+1) - d(n)| / d(n) seen
    pub max_difficulty_step: f64,
    pub lowest_price: BigUint,
    pub highest_price: BigUint,
}

impl SimulationSummary {
    pub fn avg_ratio(&self) -> f64 {
        ratio_f64(self.last.avg_ratio())
    }
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blocks:              {}", self.blocks)?;
        writeln!(f, "Parameter version:   {}", self.params_version)?;
        writeln!(f, "Final difficulty:    {}", self.last.difficulty)?;
        match &self.last.pow_price {
            Some(price) => writeln!(f, "Final PoW price:     {}", price)?,
            None => writeln!(f, "Final PoW price:     -")?,
        }
        writeln!(f, "Price range seen:    {} .. {}", self.lowest_price, self.highest_price)?;
        writeln!(f, "Final PoW gas:       {}", self.last.pow_gas)?;
        writeln!(f, "Average PoW ratio:   {:.4}", self.avg_ratio())?;
        write!(f, "Max difficulty step: {:.2}%", self.max_difficulty_step * 100.0)
    }
}

/// Runs `config.blocks` blocks after genesis through a controller service.
pub async fn run_simulation(config: SimulationConfig) -> Result<SimulationSummary, RunnerError> {
    let pool = Arc::new(PlanPool::new());
    let controller = AdaptiveController::new(config.params.clone(), Arc::clone(&pool))?;
    let genesis = controller.genesis_fields();
    let (handle, task) = ControllerService::spawn(controller);

    for plan in config.plans {
        handle.submit_plan(plan);
    }

    info!(
        blocks = config.blocks,
        seed = config.seed,
        noise = config.noise,
        pending_plans = pool.len(),
        "Starting simulation"
    );

    let mut model = MinerModel::new(&config.params, config.seed, config.noise);
    let mut parent = genesis;
    let mut max_step = 0.0f64;
    let start_price = parent.pow_price.clone().unwrap_or_default();
    let mut lowest_price = start_price.clone();
    let mut highest_price = start_price;

    for height in 1..=config.blocks {
        let observation = model.observe(&parent);
        let fields = handle.build_header_fields(height, parent.clone(), observation).await?;

        let before = big_f64(&parent.difficulty);
        let step = (big_f64(&fields.difficulty) - before).abs() / before.max(1.0);
        max_step = max_step.max(step);
        if let Some(price) = &fields.pow_price {
            if *price < lowest_price {
                lowest_price = price.clone();
            }
            if *price > highest_price {
                highest_price = price.clone();
            }
        }

        if config.report_every > 0 && height % config.report_every == 0 {
            info!(
                height,
                difficulty = %fields.difficulty,
                price = ?fields.pow_price.as_ref().map(|p| p.to_string()),
                gas = fields.pow_gas,
                avg_ratio = ratio_f64(fields.avg_ratio()),
                avg_gas = ratio_f64(fields.avg_gas()),
                "Simulation progress"
            );
        }
        parent = fields;
    }

    let snapshot = handle.snapshot().await?;
    handle.shutdown().await?;
    task.await.map_err(|e| RunnerError::Task(e.to_string()))?;

    Ok(SimulationSummary {
        blocks: config.blocks,
        last: parent,
        params_version: snapshot.params.version,
        max_difficulty_step: max_step,
        lowest_price,
        highest_price,
    })
}

/// Runner errors
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Controller task failed: {0}")]
    Task(String),
}
