// Governance - Height-scheduled parameter plans and the messages that carry them
pub mod plan;
pub mod pool;
pub mod update;

pub use plan::Plan;
pub use pool::PlanPool;
pub use update::{decode_frame, encode_frame, handle_frame, PlanUpdate, UpdateError, EXECUTION_GROUP};
