// Governance updates - Length-prefixed JSON messages carrying plans
//
// Frame layout: 4-byte big-endian body length, then a JSON `PlanUpdate`.
// Only messages addressed to the execution group are forwarded to the pool.

use super::{Plan, PlanPool};
use crate::types::PlanId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Group whose plans drive the adaptive controller
pub const EXECUTION_GROUP: &str = "execution";

/// Size of the length prefix
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Largest body accepted in one frame (1 MiB)
pub const MAX_FRAME_BODY: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("incomplete frame: need {needed} bytes, have {available}")]
    Incomplete { needed: usize, available: usize },

    #[error("frame body of {0} bytes exceeds limit")]
    FrameTooLarge(usize),

    #[error("malformed update: {0}")]
    Json(#[from] serde_json::Error),

    #[error("update addressed to group {0:?}, expected \"execution\"")]
    WrongGroup(String),

    #[error("update carries no plan")]
    MissingPlan,
}

/// Plan update message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpdate {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub plan: Option<Plan>,
}

impl PlanUpdate {
    /// Update addressed to the execution group
    pub fn execution(action: impl Into<String>, plan: Plan) -> Self {
        Self {
            action: action.into(),
            level: String::new(),
            group: EXECUTION_GROUP.to_string(),
            plan: Some(plan),
        }
    }

    /// Adds the carried plan to the pool and returns its id.
    pub fn submit(self, pool: &PlanPool) -> Result<PlanId, UpdateError> {
        if self.group != EXECUTION_GROUP {
            return Err(UpdateError::WrongGroup(self.group));
        }
        let plan = self.plan.ok_or(UpdateError::MissingPlan)?;
        let height = plan.height;
        let id = pool.add_plan(plan);
        info!(id, height, action = %self.action, level = %self.level, "Accepted plan update");
        Ok(id)
    }
}

/// Decodes one frame from the front of `buf`. Returns the message and the
/// number of bytes consumed.
pub fn decode_frame(buf: &[u8]) -> Result<(PlanUpdate, usize), UpdateError> {
    let Some(prefix) = buf.get(..LENGTH_PREFIX_BYTES) else {
        return Err(UpdateError::Incomplete {
            needed: LENGTH_PREFIX_BYTES,
            available: buf.len(),
        });
    };
    let mut len_bytes = [0u8; LENGTH_PREFIX_BYTES];
    len_bytes.copy_from_slice(prefix);
    let body_len = u32::from_be_bytes(len_bytes) as usize;
    if body_len > MAX_FRAME_BODY {
        return Err(UpdateError::FrameTooLarge(body_len));
    }

    let total = LENGTH_PREFIX_BYTES + body_len;
    let Some(body) = buf.get(LENGTH_PREFIX_BYTES..total) else {
        return Err(UpdateError::Incomplete {
            needed: total,
            available: buf.len(),
        });
    };
    let update = serde_json::from_slice(body)?;
    Ok((update, total))
}

pub fn encode_frame(update: &PlanUpdate) -> Result<Vec<u8>, UpdateError> {
    let body = serde_json::to_vec(update)?;
    if body.len() > MAX_FRAME_BODY {
        return Err(UpdateError::FrameTooLarge(body.len()));
    }
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_BYTES + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes a frame and submits its plan. Rejections are logged and returned.
pub fn handle_frame(buf: &[u8], pool: &PlanPool) -> Result<PlanId, UpdateError> {
    decode_frame(buf)
        .and_then(|(update, _)| update.submit(pool))
        .map_err(|e| {
            warn!(error = %e, "Rejected plan update");
            e
        })
}
