// Node - Controller engine and the task that owns it
pub mod controller;
pub mod service;

pub use controller::{AdaptiveController, ControllerError};
pub use service::{ControllerHandle, ControllerService, ControllerSnapshot};
