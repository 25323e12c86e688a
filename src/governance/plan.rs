// Plan - Height-scheduled override of adaptor parameters
//
// Every field is optional: `None` means "no change requested". Inside the crate an
// explicit `Some(0)` is an explicit value. On the wire, legacy senders encode
// "unset" as zero or null, so the JSON reader maps both to `None`.

use crate::types::primitives::{opt_big_uint_dec, BlockNumber, PlanId};
use crate::types::RawRatio;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Governance parameter plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Plan {
    /// Assigned by the pool on submission
    #[serde(rename = "ID", default)]
    pub id: PlanId,

    /// Height at which the plan takes effect
    pub height: BlockNumber,

    #[serde(with = "wire::big", default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<BigUint>,
    #[serde(with = "wire::ratio", default, skip_serializing_if = "Option::is_none")]
    pub target_pow_ratio: Option<RawRatio>,
    #[serde(with = "wire::scalar", default, skip_serializing_if = "Option::is_none")]
    pub min_pow_gas: Option<u64>,
    #[serde(with = "wire::scalar", default, skip_serializing_if = "Option::is_none")]
    pub max_pow_gas: Option<u64>,
    #[serde(with = "wire::scalar", default, skip_serializing_if = "Option::is_none")]
    pub initial_gas: Option<u64>,
    #[serde(with = "wire::big", default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<BigUint>,
    #[serde(with = "wire::big", default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<BigUint>,
    #[serde(with = "wire::ratio", default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<RawRatio>,
    #[serde(with = "wire::ratio", default, skip_serializing_if = "Option::is_none")]
    pub fmin: Option<RawRatio>,
    #[serde(with = "wire::ratio", default, skip_serializing_if = "Option::is_none")]
    pub fmax: Option<RawRatio>,
    #[serde(with = "wire::ratio", default, skip_serializing_if = "Option::is_none")]
    pub kp: Option<RawRatio>,
    #[serde(with = "wire::ratio", default, skip_serializing_if = "Option::is_none")]
    pub ki: Option<RawRatio>,
}

impl Plan {
    /// Empty plan scheduled at `height`
    pub fn at(height: BlockNumber) -> Self {
        Self { height, ..Self::default() }
    }

    /// True when the plan requests no change at all
    pub fn is_empty(&self) -> bool {
        self.difficulty.is_none()
            && self.target_pow_ratio.is_none()
            && self.min_pow_gas.is_none()
            && self.max_pow_gas.is_none()
            && self.initial_gas.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.alpha.is_none()
            && self.fmin.is_none()
            && self.fmax.is_none()
            && self.kp.is_none()
            && self.ki.is_none()
    }

    /// Overlays `plans` in id order onto an empty plan at `height`.
    /// Returns `None` for an empty slice.
    pub fn merge_all(height: BlockNumber, plans: &[Plan]) -> Option<Plan> {
        if plans.is_empty() {
            return None;
        }
        let mut ordered: Vec<&Plan> = plans.iter().collect();
        ordered.sort_by_key(|p| p.id);

        let mut merged = Plan::at(height);
        for plan in ordered {
            merged.overlay(plan);
        }
        Some(merged)
    }

    /// Field-level overlay: each value `later` sets replaces ours, fields it
    /// leaves unset are kept.
    pub fn overlay(&mut self, later: &Plan) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        take(&mut self.difficulty, &later.difficulty);
        take(&mut self.target_pow_ratio, &later.target_pow_ratio);
        take(&mut self.min_pow_gas, &later.min_pow_gas);
        take(&mut self.max_pow_gas, &later.max_pow_gas);
        take(&mut self.initial_gas, &later.initial_gas);
        take(&mut self.min_price, &later.min_price);
        take(&mut self.max_price, &later.max_price);
        take(&mut self.alpha, &later.alpha);
        take(&mut self.fmin, &later.fmin);
        take(&mut self.fmax, &later.fmax);
        take(&mut self.kp, &later.kp);
        take(&mut self.ki, &later.ki);
    }
}

/// JSON forms used by governance senders
mod wire {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub mod scalar {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            value.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
            Ok(Option::<u64>::deserialize(deserializer)?.filter(|v| *v != 0))
        }
    }

    pub mod big {
        use super::*;
        use num_traits::Zero;

        pub fn serialize<S: Serializer>(value: &Option<BigUint>, serializer: S) -> Result<S::Ok, S::Error> {
            opt_big_uint_dec::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<BigUint>, D::Error> {
            Ok(opt_big_uint_dec::deserialize(deserializer)?.filter(|v| !v.is_zero()))
        }
    }

    /// `{"Numerator": n, "Denominator": d}`
    #[derive(Serialize, Deserialize)]
    struct WireRatio {
        #[serde(rename = "Numerator", alias = "numerator")]
        numerator: u64,
        #[serde(rename = "Denominator", alias = "denominator")]
        denominator: u64,
    }

    pub mod ratio {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<RawRatio>, serializer: S) -> Result<S::Ok, S::Error> {
            value
                .map(|r| WireRatio { numerator: r.numerator, denominator: r.denominator })
                .serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RawRatio>, D::Error> {
            Ok(Option::<WireRatio>::deserialize(deserializer)?
                .map(|w| RawRatio::new(w.numerator, w.denominator)))
        }
    }
}
