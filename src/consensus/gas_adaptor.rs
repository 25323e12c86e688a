// Gas adaptor - EMA controller for the PoW gas ceiling
//
// newEMA = alpha * blockGasRatio + (1 - alpha) * parentEMA
//
// A dead band between 5/10 and 8/10 keeps the ceiling still under small noise;
// outside it the ceiling moves by 10% per block, clamped to [minGas, maxGas].

use super::AdaptorError;
use crate::types::{RawRatio, Rational};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// EMA above this raises the ceiling
pub const RAISE_THRESHOLD: (u64, u64) = (8, 10);

/// EMA below this lowers the ceiling
pub const LOWER_THRESHOLD: (u64, u64) = (5, 10);

/// +10% step
pub const RAISE_STEP: (u64, u64) = (11, 10);

/// -10% step
pub const LOWER_STEP: (u64, u64) = (9, 10);

/// Result of one gas adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasAdjustment {
    /// New PoW gas ceiling
    pub gas: u64,
    /// New EMA, persisted as AvgGasNumerator / AvgGasDenominator
    pub ema: Rational,
}

/// PoW gas ceiling controller
#[derive(Debug, Clone)]
pub struct GasAdaptor {
    min_gas: u64,
    max_gas: u64,
    current_gas: u64,
    alpha: Rational,
    one_minus_alpha: Rational,
}

impl GasAdaptor {
    pub fn new(min_gas: u64, max_gas: u64, initial_gas: u64, alpha: RawRatio) -> Result<Self, AdaptorError> {
        let alpha = alpha.validate("alpha")?;
        if min_gas >= max_gas {
            return Err(AdaptorError::InvalidGasBounds { min: min_gas, max: max_gas });
        }
        if initial_gas < min_gas || initial_gas > max_gas {
            return Err(AdaptorError::InitialGasOutOfBounds {
                initial: initial_gas,
                min: min_gas,
                max: max_gas,
            });
        }
        let one_minus_alpha = Rational::ONE
            .sub(&alpha)
            .map_err(|_| AdaptorError::AlphaAboveOne(alpha))?;

        Ok(Self {
            min_gas,
            max_gas,
            current_gas: initial_gas,
            alpha,
            one_minus_alpha,
        })
    }

    /// Advances the EMA with this block's gas ratio and moves the ceiling.
    ///
    /// A block gas ratio above 1 is a valid measurement (demand exceeded the
    /// ceiling); only zero denominators under non-zero numerators are rejected.
    pub fn adjust_gas(&mut self, block_gas_ratio: RawRatio, parent_ema: RawRatio) -> Result<GasAdjustment, AdaptorError> {
        let block = block_gas_ratio.validate("blockGasRatio")?;
        let parent = parent_ema.validate("parentEMARatio")?;

        let ema = self.alpha.mul(&block).add(&self.one_minus_alpha.mul(&parent));

        let previous = self.current_gas;
        if ema > Rational::new(RAISE_THRESHOLD.0, RAISE_THRESHOLD.1) {
            self.current_gas = self.step(RAISE_STEP);
        } else if ema < Rational::new(LOWER_THRESHOLD.0, LOWER_THRESHOLD.1) {
            self.current_gas = self.step(LOWER_STEP);
        }

        debug!(
            block = %block,
            parent = %parent,
            ema = %ema,
            previous_gas = previous,
            gas = self.current_gas,
            "Adjusted PoW gas"
        );

        Ok(GasAdjustment { gas: self.current_gas, ema })
    }

    // current * num / den, floored, then clamped into [min, max]
    fn step(&self, (num, den): (u64, u64)) -> u64 {
        let scaled = self.current_gas as u128 * num as u128 / den as u128;
        let scaled = u64::try_from(scaled).unwrap_or(u64::MAX);
        scaled.clamp(self.min_gas, self.max_gas)
    }

    pub fn current_gas(&self) -> u64 {
        self.current_gas
    }

    pub fn min_gas(&self) -> u64 {
        self.min_gas
    }

    pub fn max_gas(&self) -> u64 {
        self.max_gas
    }

    pub fn alpha(&self) -> Rational {
        self.alpha
    }
}
