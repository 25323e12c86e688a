// Service - Single-owner task around the adaptive controller
// Principle: one writer for adaptor state, any number of callers.
//
// The controller lives inside a tokio task. Callers hold a cloneable handle and
// send commands over a bounded channel; each command carries a oneshot reply.
// Plan submission bypasses the task because the pool has its own lock.

use super::controller::{AdaptiveController, ControllerError};
use crate::genesis::{ChainParams, ParamChange};
use crate::governance::{handle_frame, Plan, PlanPool, UpdateError};
use crate::types::{AdaptiveHeaderFields, BlockNumber, BlockObservation, PlanId};
use num_bigint::BigUint;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Pending commands before callers start waiting
pub const COMMAND_QUEUE_SIZE: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    BuildHeader {
        height: BlockNumber,
        parent: AdaptiveHeaderFields,
        observation: BlockObservation,
        reply: Reply<Result<AdaptiveHeaderFields, ControllerError>>,
    },
    ApplyDuePlans {
        height: BlockNumber,
        reply: Reply<Result<Vec<ParamChange>, ControllerError>>,
    },
    Snapshot {
        reply: Reply<ControllerSnapshot>,
    },
    Shutdown,
}

/// Point-in-time view of the controller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub params: ChainParams,
    pub difficulty: BigUint,
    pub gas: u64,
}

/// Task owning the controller
pub struct ControllerService {
    controller: AdaptiveController,
    commands: mpsc::Receiver<Command>,
}

impl ControllerService {
    /// Starts the task. The join handle yields the controller back on shutdown.
    pub fn spawn(controller: AdaptiveController) -> (ControllerHandle, JoinHandle<AdaptiveController>) {
        let (sender, commands) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let pool = Arc::clone(controller.pool());
        let service = Self { controller, commands };
        let task = tokio::spawn(service.run());
        (ControllerHandle { sender, pool }, task)
    }

    async fn run(mut self) -> AdaptiveController {
        info!("Controller service started");

        while let Some(command) = self.commands.recv().await {
            match command {
                Command::BuildHeader { height, parent, observation, reply } => {
                    let result = self.controller.build_header_fields(height, &parent, &observation);
                    let _ = reply.send(result);
                }
                Command::ApplyDuePlans { height, reply } => {
                    let _ = reply.send(self.controller.apply_due_plans(height));
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(ControllerSnapshot {
                        params: self.controller.params().clone(),
                        difficulty: self.controller.pow_adaptor().current_difficulty().clone(),
                        gas: self.controller.gas_adaptor().current_gas(),
                    });
                }
                Command::Shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        info!("Controller service stopped");
        self.controller
    }
}

/// Cloneable handle to a running controller service
#[derive(Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<Command>,
    pool: Arc<PlanPool>,
}

impl ControllerHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(make(reply))
            .await
            .map_err(|_| ControllerError::ServiceStopped)?;
        response.await.map_err(|_| ControllerError::ServiceStopped)
    }

    /// Applies due plans and computes the header fields for `height`.
    pub async fn build_header_fields(
        &self,
        height: BlockNumber,
        parent: AdaptiveHeaderFields,
        observation: BlockObservation,
    ) -> Result<AdaptiveHeaderFields, ControllerError> {
        self.request(|reply| Command::BuildHeader { height, parent, observation, reply })
            .await?
    }

    pub async fn apply_due_plans(&self, height: BlockNumber) -> Result<Vec<ParamChange>, ControllerError> {
        self.request(|reply| Command::ApplyDuePlans { height, reply }).await?
    }

    pub async fn snapshot(&self) -> Result<ControllerSnapshot, ControllerError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Adds a plan to the shared pool
    pub fn submit_plan(&self, plan: Plan) -> PlanId {
        self.pool.add_plan(plan)
    }

    /// Decodes a governance frame and adds its plan to the shared pool
    pub fn submit_frame(&self, frame: &[u8]) -> Result<PlanId, UpdateError> {
        handle_frame(frame, &self.pool)
    }

    pub fn pool(&self) -> &Arc<PlanPool> {
        &self.pool
    }

    /// Asks the task to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| ControllerError::ServiceStopped)
    }
}
