// Primitives - Minimal shared types
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serializer};
use std::str::FromStr;

/// Block number (u64 = ~584 billion years at 1 block/sec)
pub type BlockNumber = u64;

/// Identifier assigned to a plan by the pool (starts at 1)
pub type PlanId = u64;

/// Big integers on the wire: written as decimal strings, read from either a
/// JSON number or a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum BigUintRepr {
    Number(u64),
    Text(String),
}

impl BigUintRepr {
    fn into_big_uint<E: serde::de::Error>(self) -> Result<BigUint, E> {
        match self {
            BigUintRepr::Number(n) => Ok(BigUint::from(n)),
            BigUintRepr::Text(s) => BigUint::from_str(s.trim())
                .map_err(|e| E::custom(format!("invalid big integer {:?}: {}", s, e))),
        }
    }
}

pub mod big_uint_dec {
    use super::*;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        BigUintRepr::deserialize(deserializer)?.into_big_uint()
    }
}

pub mod opt_big_uint_dec {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<BigUint>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_str_radix(10)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<BigUint>, D::Error> {
        Option::<BigUintRepr>::deserialize(deserializer)?
            .map(BigUintRepr::into_big_uint)
            .transpose()
    }
}
