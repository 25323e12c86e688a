// Tests module
// Convergence: closed-loop simulation against a synthetic miner population
// Plan lifecycle: governance frames through the pool into the controller
// Service: the controller task and its handle
// Properties: proptest checks of the arithmetic and the adaptor bounds

pub mod properties;
