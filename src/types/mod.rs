// Core types of the controller
// Principle: exact, deterministic, no floating point in consensus paths

pub mod primitives;
pub mod fraction;
pub mod rational;
pub mod header;

pub use primitives::*;
pub use fraction::{FractionError, SignedFraction};
pub use rational::{RawRatio, Rational, RationalError};
pub use header::{AdaptiveHeaderFields, BlockObservation};
