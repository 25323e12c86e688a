// Plan pool - Pending governance plans indexed by activation height
// Principle: Many readers, one writer at a time; the lowest pending height is tracked
// so block production can skip the pool cheaply.

use super::Plan;
use crate::genesis::{ChainParams, ParamChange};
use crate::types::{BlockNumber, PlanId};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct PoolState {
    plans: BTreeMap<BlockNumber, Vec<Plan>>,
    next_id: PlanId,
    min_height: Option<BlockNumber>,
}

impl PoolState {
    fn recompute_min_height(&mut self) {
        self.min_height = self.plans.keys().next().copied();
    }
}

/// Thread-safe plan pool
#[derive(Debug, Default)]
pub struct PlanPool {
    state: RwLock<PoolState>,
}

impl PlanPool {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking holder cannot leave the maps half-written, so poisoned guards are reused.
    fn read(&self) -> RwLockReadGuard<'_, PoolState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PoolState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a plan under its height and assigns it the next id (ids start at 1).
    pub fn add_plan(&self, mut plan: Plan) -> PlanId {
        let mut state = self.write();
        state.next_id += 1;
        plan.id = state.next_id;

        let height = plan.height;
        let id = plan.id;
        state.plans.entry(height).or_default().push(plan);
        if state.min_height.map_or(true, |min| height < min) {
            state.min_height = Some(height);
        }

        info!(id, height, "Plan added");
        id
    }

    /// Removes the plan with this id. Returns false if no such plan exists.
    pub fn remove_plan(&self, id: PlanId) -> bool {
        let mut state = self.write();

        let found = state
            .plans
            .iter()
            .find_map(|(height, bucket)| bucket.iter().position(|p| p.id == id).map(|i| (*height, i)));
        let Some((height, index)) = found else {
            return false;
        };

        let now_empty = match state.plans.get_mut(&height) {
            Some(bucket) => {
                bucket.remove(index);
                bucket.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.plans.remove(&height);
            if state.min_height == Some(height) {
                state.recompute_min_height();
            }
        }

        info!(id, height, "Plan removed");
        true
    }

    /// Copy of the plans scheduled at `height`, in submission order
    pub fn get_plans_by_height(&self, height: BlockNumber) -> Vec<Plan> {
        self.read().plans.get(&height).cloned().unwrap_or_default()
    }

    pub fn get_plan_by_id(&self, id: PlanId) -> Option<Plan> {
        self.read()
            .plans
            .values()
            .flat_map(|bucket| bucket.iter())
            .find(|p| p.id == id)
            .cloned()
    }

    /// Combines every plan at `height` into one. Plans are applied in ascending id
    /// order and each field keeps the value of the last plan that set it.
    ///
    /// Returns `None` when nothing is scheduled at that height.
    pub fn merge_plans(&self, height: BlockNumber) -> Option<Plan> {
        let plans = self.get_plans_by_height(height);
        let merged = Plan::merge_all(height, &plans)?;
        debug!(height, count = plans.len(), "Merged plans");
        Some(merged)
    }

    /// Writes every field the plan sets into `params`. `None` changes nothing.
    pub fn update_params(&self, plan: Option<&Plan>, params: &mut ChainParams) -> Vec<ParamChange> {
        match plan {
            Some(plan) => params.apply_plan(plan),
            None => Vec::new(),
        }
    }

    /// Lowest height with pending plans
    pub fn min_height(&self) -> Option<BlockNumber> {
        self.read().min_height
    }

    /// True if some plan is due at or before `height`
    pub fn has_pending_plans(&self, height: BlockNumber) -> bool {
        self.min_height().is_some_and(|min| min <= height)
    }

    /// Removes and returns every plan scheduled at `height`
    pub fn take_plans(&self, height: BlockNumber) -> Vec<Plan> {
        let mut state = self.write();
        let plans = state.plans.remove(&height).unwrap_or_default();
        if !plans.is_empty() && state.min_height == Some(height) {
            state.recompute_min_height();
        }
        plans
    }

    /// Removes and returns every plan scheduled strictly below `height`
    pub fn drain_below(&self, height: BlockNumber) -> Vec<Plan> {
        let mut state = self.write();
        let keep = state.plans.split_off(&height);
        let stale = std::mem::replace(&mut state.plans, keep);
        if !stale.is_empty() {
            state.recompute_min_height();
        }
        stale.into_values().flatten().collect()
    }

    /// Number of pending plans
    pub fn len(&self) -> usize {
        self.read().plans.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().plans.is_empty()
    }
}
