// Consensus - Per-block adaptive parameter control
// Principle: every node derives the same numbers from the same inputs.
//
// Both adaptors are plain state machines without internal locking. They must be
// driven by a single block-production path, once per block, in height order
// (see `node::service` for the owning task).

pub mod gas_adaptor;
pub mod pow_adaptor;

pub use gas_adaptor::{GasAdaptor, GasAdjustment};
pub use pow_adaptor::{PowAdaptor, PowAdjustment};

use crate::types::{FractionError, Rational, RationalError, RawRatio};
use num_bigint::BigUint;

/// Adaptor errors
///
/// Constructor variants are configuration errors: the node must not take part
/// in consensus with these bounds. Runtime variants mean an upstream component
/// let a malformed header through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdaptorError {
    #[error("Invalid ratio: {0}")]
    InvalidRatio(#[from] RationalError),

    #[error("Fraction error: {0}")]
    Fraction(#[from] FractionError),

    #[error("minGas ({min}) must be less than maxGas ({max})")]
    InvalidGasBounds { min: u64, max: u64 },

    #[error("initialGas ({initial}) outside [{min}, {max}]")]
    InitialGasOutOfBounds { initial: u64, min: u64, max: u64 },

    #[error("alpha must not exceed 1 (got {0})")]
    AlphaAboveOne(Rational),

    #[error("targetPowRatio must be in (0, 1] (got {0})")]
    TargetRatioOutOfRange(Rational),

    #[error("fMin ({fmin}) must not exceed fMax ({fmax})")]
    FactorBoundsInverted { fmin: Rational, fmax: Rational },

    #[error("minPrice must be positive")]
    NonPositivePrice,

    #[error("minPrice ({min}) must be less than or equal to maxPrice ({max})")]
    PriceBoundsInverted { min: BigUint, max: BigUint },

    #[error("initialDifficulty must be positive")]
    NonPositiveDifficulty,

    #[error("{field}: numerator must be less than or equal to denominator (got {ratio})")]
    RatioAboveOne { field: &'static str, ratio: RawRatio },

    #[error("parentPrice cannot be absent")]
    MissingParentPrice,
}
