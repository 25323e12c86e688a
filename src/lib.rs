// pow-controller - Per-block adaptive difficulty, PoW price and PoW gas control
// Principle: every node derives identical header fields from identical inputs
//
// Layout:
// - types: exact rationals, big-integer fractions, header fields
// - consensus: gas and PoW adaptors
// - genesis: parameter table and genesis header fields
// - governance: height-scheduled plans, plan pool, update messages
// - node: controller engine and the task that owns it
// - cli: powctl command line

pub mod cli;
pub mod consensus;
pub mod genesis;
pub mod governance;
pub mod node;
pub mod types;

pub use consensus::{AdaptorError, GasAdaptor, PowAdaptor};
pub use genesis::ChainParams;
pub use governance::{Plan, PlanPool};
pub use node::{AdaptiveController, ControllerHandle, ControllerService};
pub use types::{AdaptiveHeaderFields, BlockObservation, RawRatio, Rational};

#[cfg(test)]
mod tests;
