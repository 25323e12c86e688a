// Genesis - Parameter table and the adaptive fields of block 0
pub mod params;

pub use params::{ChainParams, ParamChange};

use crate::types::AdaptiveHeaderFields;
use num_bigint::BigUint;

/// Adaptive header fields for the genesis block.
///
/// Difficulty and gas start at their configured values, the price sits in the
/// middle of the band, the PoW average starts on target and the gas average at 1/2
/// (inside the dead band).
pub fn genesis_header_fields(params: &ChainParams) -> AdaptiveHeaderFields {
    let price = (&params.min_price + &params.max_price) / BigUint::from(2u8);
    AdaptiveHeaderFields {
        difficulty: params.difficulty.clone(),
        pow_price: Some(price),
        pow_gas: params.initial_gas,
        avg_ratio_numerator: params.target_pow_ratio.numerator,
        avg_ratio_denominator: params.target_pow_ratio.denominator,
        avg_gas_numerator: 1,
        avg_gas_denominator: 2,
    }
}
