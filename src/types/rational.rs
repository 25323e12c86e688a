// Rational - Exact unsigned fraction with deterministic precision bounding
//
// Consensus quantities (EMA ratios, adaptor coefficients) are kept as reduced
// u64 pairs. Every operation computes in arbitrary precision and then passes
// through `normalize`, which shifts numerator and denominator together once
// either exceeds 2^32. The shift is lossy but identical on every node.

use crate::types::fraction;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Components above this value trigger a joint right shift
pub const PRECISION_THRESHOLD: u64 = 1 << 32;

/// Rational errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RationalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("Negative result: {lhs} - {rhs}")]
    NegativeResult { lhs: Rational, rhs: Rational },

    #[error("{field}: denominator cannot be zero when numerator ({numerator}) is not zero")]
    ZeroDenominator { field: &'static str, numerator: u64 },
}

/// Non-negative rational number, always reduced, denominator never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawRatio", into = "RawRatio")]
pub struct Rational {
    numerator: u64,
    denominator: u64,
}

impl Rational {
    pub const ZERO: Rational = Rational { numerator: 0, denominator: 1 };
    pub const ONE: Rational = Rational { numerator: 1, denominator: 1 };

    /// Creates `num/den`. A zero denominator is coerced to 1.
    pub fn new(num: u64, den: u64) -> Self {
        Self::normalize(BigUint::from(num), BigUint::from(den))
    }

    pub fn from_integer(value: u64) -> Self {
        Self::new(value, 1)
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn add(&self, other: &Rational) -> Rational {
        let (n1, d1) = self.big_parts();
        let (n2, d2) = other.big_parts();
        Self::normalize(&n1 * &d2 + &n2 * &d1, d1 * d2)
    }

    /// Subtraction; negative results are not representable
    pub fn sub(&self, other: &Rational) -> Result<Rational, RationalError> {
        let (n1, d1) = self.big_parts();
        let (n2, d2) = other.big_parts();
        let lhs = n1 * &d2;
        let rhs = n2 * &d1;
        if lhs < rhs {
            return Err(RationalError::NegativeResult { lhs: *self, rhs: *other });
        }
        Ok(Self::normalize(lhs - rhs, d1 * d2))
    }

    pub fn mul(&self, other: &Rational) -> Rational {
        let (n1, d1) = self.big_parts();
        let (n2, d2) = other.big_parts();
        Self::normalize(n1 * n2, d1 * d2)
    }

    pub fn div(&self, other: &Rational) -> Result<Rational, RationalError> {
        if other.numerator == 0 {
            return Err(RationalError::DivisionByZero);
        }
        let (n1, d1) = self.big_parts();
        let (n2, d2) = other.big_parts();
        Ok(Self::normalize(n1 * d2, d1 * n2))
    }

    /// -1, 0 or 1, by cross-multiplication
    pub fn compare(&self, other: &Rational) -> i8 {
        match self.cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// Floor of the value
    pub fn to_u64(&self) -> u64 {
        self.numerator / self.denominator
    }

    /// Floor of the value
    pub fn to_big_uint(&self) -> BigUint {
        BigUint::from(self.to_u64())
    }

    /// Integers wider than 64 bits are narrowed with `scale_down_big_ints`
    /// before normalisation, so very large inputs lose low bits.
    pub fn from_big_uint(value: &BigUint) -> Rational {
        let wide = BigInt::from(value.clone());
        match fraction::scale_down_big_ints(&wide, &BigInt::one()) {
            Ok((n, d)) => Rational::new(n, d),
            Err(_) => Rational::ZERO,
        }
    }

    /// Diagnostics only. Never feed the result back into consensus math.
    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn as_raw(&self) -> RawRatio {
        RawRatio::new(self.numerator, self.denominator)
    }

    fn big_parts(&self) -> (BigUint, BigUint) {
        (BigUint::from(self.numerator), BigUint::from(self.denominator))
    }

    /// Reduce, bound to the precision threshold, reduce again.
    ///
    /// Reducing before the shift differs from shift-then-reduce for parts
    /// above 2^32 that share a factor; this order loses less precision.
    fn normalize(num: BigUint, den: BigUint) -> Rational {
        let threshold = BigUint::from(PRECISION_THRESHOLD);
        let mut num = num;
        let mut den = if den.is_zero() { BigUint::one() } else { den };

        let g = num.gcd(&den);
        num /= &g;
        den /= &g;

        if num > threshold || den > threshold {
            while num > threshold || den > threshold {
                num >>= 1;
                den >>= 1;
                if den.is_zero() {
                    den = BigUint::one();
                }
            }
            let g = num.gcd(&den);
            num /= &g;
            den /= &g;
        }

        Rational {
            // Both parts are <= 2^32 here
            numerator: num.to_u64().unwrap_or(0),
            denominator: den.to_u64().unwrap_or(1),
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Rational::ZERO
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.numerator as u128 * other.denominator as u128;
        let rhs = other.numerator as u128 * self.denominator as u128;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<RawRatio> for Rational {
    fn from(raw: RawRatio) -> Self {
        Rational::new(raw.numerator, raw.denominator)
    }
}

impl From<Rational> for RawRatio {
    fn from(r: Rational) -> Self {
        r.as_raw()
    }
}

/// Unvalidated numerator/denominator pair, as carried by block headers,
/// parameter files and governance plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RawRatio {
    pub numerator: u64,
    pub denominator: u64,
}

impl RawRatio {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self { numerator, denominator }
    }

    /// Rejects a non-zero numerator over a zero denominator; `0/0` reads as zero.
    pub fn validate(&self, field: &'static str) -> Result<Rational, RationalError> {
        if self.numerator != 0 && self.denominator == 0 {
            return Err(RationalError::ZeroDenominator { field, numerator: self.numerator });
        }
        Ok(Rational::new(self.numerator, self.denominator))
    }

    /// numerator <= denominator (zero denominators count as 1)
    pub fn is_proper(&self) -> bool {
        self.numerator <= self.denominator.max(1)
    }
}

impl fmt::Display for RawRatio {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
