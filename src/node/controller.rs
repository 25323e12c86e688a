// Adaptive controller - Header field production for one chain
// Principle: parameters change only at plan heights, adaptors advance once per block.
//
// Owns the parameter table and both adaptors. Plans are read from a shared pool,
// applied at their activation height, and the adaptors are rebuilt from the new
// table. The running difficulty and gas ceiling carry over unless the plan
// overrides them.

use crate::consensus::{AdaptorError, GasAdaptor, PowAdaptor};
use crate::genesis::{genesis_header_fields, ChainParams, ParamChange};
use crate::governance::{Plan, PlanPool};
use crate::types::{AdaptiveHeaderFields, BlockNumber, BlockObservation};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Adaptor(#[from] AdaptorError),

    #[error("plan at height {height} rejected: {source}")]
    PlanRejected {
        height: BlockNumber,
        #[source]
        source: AdaptorError,
    },

    #[error("controller service stopped")]
    ServiceStopped,
}

/// Block-builder facing controller
#[derive(Debug)]
pub struct AdaptiveController {
    params: ChainParams,
    pow: PowAdaptor,
    gas: GasAdaptor,
    pool: Arc<PlanPool>,
}

impl AdaptiveController {
    pub fn new(params: ChainParams, pool: Arc<PlanPool>) -> Result<Self, ControllerError> {
        let pow = params.build_pow_adaptor()?;
        let gas = params.build_gas_adaptor()?;
        info!(version = params.version, "Adaptive controller initialized");
        Ok(Self { params, pow, gas, pool })
    }

    /// Header fields of the genesis block under the current parameters
    pub fn genesis_fields(&self) -> AdaptiveHeaderFields {
        genesis_header_fields(&self.params)
    }

    /// Applies the plans scheduled at `height` and removes them from the pool.
    ///
    /// Plans for heights already passed are discarded. When the merged plan
    /// produces parameters the adaptors refuse, the plans are still consumed and
    /// the previous parameters stay in force.
    pub fn apply_due_plans(&mut self, height: BlockNumber) -> Result<Vec<ParamChange>, ControllerError> {
        for stale in self.pool.drain_below(height) {
            warn!(id = stale.id, plan_height = stale.height, height, "Discarding stale plan");
        }

        // Merge what was removed, so a plan submitted meanwhile stays pending
        let consumed = self.pool.take_plans(height);
        let Some(merged) = Plan::merge_all(height, &consumed) else {
            return Ok(Vec::new());
        };

        let mut next = self.params.clone();
        let changes = self.pool.update_params(Some(&merged), &mut next);
        if changes.is_empty() {
            return Ok(changes);
        }

        let rebuilt = self.rebuild(&next, merged.difficulty.is_none(), merged.initial_gas.is_none());
        match rebuilt {
            Ok((pow, gas)) => {
                self.params = next;
                self.pow = pow;
                self.gas = gas;
                info!(
                    height,
                    plans = consumed.len(),
                    version = self.params.version,
                    difficulty = %self.pow.current_difficulty(),
                    gas = self.gas.current_gas(),
                    "Rebuilt adaptors"
                );
                Ok(changes)
            }
            Err(source) => {
                error!(height, plans = consumed.len(), error = %source, "Plan rejected, keeping previous parameters");
                Err(ControllerError::PlanRejected { height, source })
            }
        }
    }

    fn rebuild(
        &self,
        params: &ChainParams,
        keep_difficulty: bool,
        keep_gas: bool,
    ) -> Result<(PowAdaptor, GasAdaptor), AdaptorError> {
        let pow = if keep_difficulty {
            let mut carried = params.clone();
            carried.difficulty = self.pow.current_difficulty().clone();
            carried.build_pow_adaptor()?
        } else {
            params.build_pow_adaptor()?
        };

        let gas = if keep_gas {
            let carried = self.gas.current_gas().max(params.min_pow_gas).min(params.max_pow_gas);
            GasAdaptor::new(params.min_pow_gas, params.max_pow_gas, carried, params.alpha)?
        } else {
            params.build_gas_adaptor()?
        };

        Ok((pow, gas))
    }

    /// Runs both adaptors against the parent header and this block's observation.
    pub fn next_header_fields(
        &mut self,
        parent: &AdaptiveHeaderFields,
        observation: &BlockObservation,
    ) -> Result<AdaptiveHeaderFields, ControllerError> {
        // Gas inputs are checked up front so a bad value cannot leave the PoW
        // adaptor advanced and the gas adaptor behind.
        observation.gas_ratio.validate("blockGasRatio").map_err(AdaptorError::from)?;
        parent.avg_gas().validate("parentEMARatio").map_err(AdaptorError::from)?;

        let pow = self
            .pow
            .adjust_parameters(observation.pow_ratio, parent.avg_ratio(), parent.pow_price.as_ref())?;
        let gas = self.gas.adjust_gas(observation.gas_ratio, parent.avg_gas())?;

        Ok(AdaptiveHeaderFields {
            difficulty: pow.difficulty,
            pow_price: Some(pow.price),
            pow_gas: gas.gas,
            avg_ratio_numerator: pow.avg_ratio.numerator,
            avg_ratio_denominator: pow.avg_ratio.denominator,
            avg_gas_numerator: gas.ema.numerator(),
            avg_gas_denominator: gas.ema.denominator(),
        })
    }

    /// Applies due plans, then computes the header fields for `height`.
    ///
    /// A rejected plan is logged and does not stop block production; the block is
    /// built with the parameters that were in force before it.
    pub fn build_header_fields(
        &mut self,
        height: BlockNumber,
        parent: &AdaptiveHeaderFields,
        observation: &BlockObservation,
    ) -> Result<AdaptiveHeaderFields, ControllerError> {
        match self.apply_due_plans(height) {
            Ok(_) | Err(ControllerError::PlanRejected { .. }) => {}
            Err(e) => return Err(e),
        }
        self.next_header_fields(parent, observation)
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn pool(&self) -> &Arc<PlanPool> {
        &self.pool
    }

    pub fn pow_adaptor(&self) -> &PowAdaptor {
        &self.pow
    }

    pub fn gas_adaptor(&self) -> &GasAdaptor {
        &self.gas
    }
}
