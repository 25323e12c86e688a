// Header fields - The adaptive values carried by every block header
use crate::types::primitives::{big_uint_dec, opt_big_uint_dec};
use crate::types::rational::RawRatio;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Controller outputs written verbatim into the block header.
///
/// Field order follows the header layout (Difficulty, PowPrice, PowGas,
/// AvgRatioNumerator, AvgRatioDenominator, AvgGasNumerator, AvgGasDenominator).
/// `pow_price` is optional in the serialized header; a missing price on a
/// parent header is a fatal input error for the PoW adaptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdaptiveHeaderFields {
    #[serde(with = "big_uint_dec")]
    pub difficulty: BigUint,
    #[serde(with = "opt_big_uint_dec", default)]
    pub pow_price: Option<BigUint>,
    pub pow_gas: u64,
    pub avg_ratio_numerator: u64,
    pub avg_ratio_denominator: u64,
    pub avg_gas_numerator: u64,
    pub avg_gas_denominator: u64,
}

impl AdaptiveHeaderFields {
    pub fn avg_ratio(&self) -> RawRatio {
        RawRatio::new(self.avg_ratio_numerator, self.avg_ratio_denominator)
    }

    pub fn avg_gas(&self) -> RawRatio {
        RawRatio::new(self.avg_gas_numerator, self.avg_gas_denominator)
    }
}

/// What the block builder measured for the block being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockObservation {
    /// Share of the block attributable to PoW transactions (must be <= 1)
    pub pow_ratio: RawRatio,
    /// PoW gas used relative to the current PoW gas ceiling (may exceed 1)
    pub gas_ratio: RawRatio,
}

impl BlockObservation {
    pub fn new(pow_ratio: RawRatio, gas_ratio: RawRatio) -> Self {
        Self { pow_ratio, gas_ratio }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_field_names() {
        let fields = AdaptiveHeaderFields {
            difficulty: BigUint::from(100u32),
            pow_price: None,
            pow_gas: 5,
            avg_ratio_numerator: 3,
            avg_ratio_denominator: 10,
            avg_gas_numerator: 1,
            avg_gas_denominator: 2,
        };
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(
            json,
            r#"{"Difficulty":"100","PowPrice":null,"PowGas":5,"AvgRatioNumerator":3,"AvgRatioDenominator":10,"AvgGasNumerator":1,"AvgGasDenominator":2}"#
        );
        assert_eq!(fields.avg_ratio(), RawRatio::new(3, 10));
        assert_eq!(fields.avg_gas(), RawRatio::new(1, 2));
    }
}
