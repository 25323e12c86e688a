// Fraction utilities - Exact arbitrary-precision helpers shared by the adaptors
//
// Every node must derive identical numbers from identical inputs, so nothing in
// here touches floating point. Intermediate math is unbounded (BigInt); the only
// lossy step is `scale_down_big_ints`, which narrows a ratio into the fixed-width
// pair stored in block headers.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::fmt;

/// Bit width of a narrowed header field (keeps values inside i64 as well as u64)
pub const HEADER_FIELD_BITS: u64 = 63;

/// Fraction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FractionError {
    #[error("fatal: zero denominator")]
    ZeroDenominator,

    #[error("Negative value cannot be narrowed: {num}/{den}")]
    Negative { num: BigInt, den: BigInt },
}

/// Greatest common divisor (Euclid, iterative). Always non-negative.
pub fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let mut a = a.abs();
    let mut b = b.abs();
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple: |a*b| / gcd(a, b), or 0 if either input is 0
pub fn lcm(a: &BigInt, b: &BigInt) -> BigInt {
    if a.is_zero() || b.is_zero() {
        return BigInt::zero();
    }
    (a * b).abs() / gcd(a, b)
}

/// Reduces a fraction to lowest terms with a positive denominator.
/// A zero numerator always yields `0/1`.
pub fn reduce_fraction(num: &BigInt, den: &BigInt) -> Result<(BigInt, BigInt), FractionError> {
    if den.is_zero() {
        return Err(FractionError::ZeroDenominator);
    }
    if num.is_zero() {
        return Ok((BigInt::zero(), BigInt::one()));
    }

    let g = gcd(num, den);
    let mut n = num / &g;
    let mut d = den / &g;
    if d.is_negative() {
        n = -n;
        d = -d;
    }
    Ok((n, d))
}

/// Shrinks `num/den` until both fit in 63 bits by shifting them right together.
/// The denominator is forced back to 1 if shifting empties it.
pub fn scale_down_big_ints(num: &BigInt, den: &BigInt) -> Result<(u64, u64), FractionError> {
    if num.is_negative() || den.is_negative() {
        return Err(FractionError::Negative { num: num.clone(), den: den.clone() });
    }

    let mut n = num.clone();
    let mut d = den.clone();
    while n.bits() > HEADER_FIELD_BITS || d.bits() > HEADER_FIELD_BITS {
        n >>= 1;
        d >>= 1;
        if d.is_zero() {
            d = BigInt::one();
        }
    }

    // Both fit in 63 bits at this point
    Ok((n.to_u64().unwrap_or(u64::MAX), d.to_u64().unwrap_or(1)))
}

/// Exact signed fraction, always stored reduced with a positive denominator.
///
/// The PID price controller needs negative values (error = target - observed),
/// which `Rational` deliberately cannot represent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFraction {
    num: BigInt,
    den: BigInt,
}

impl SignedFraction {
    pub fn zero() -> Self {
        Self { num: BigInt::zero(), den: BigInt::one() }
    }

    pub fn new(num: BigInt, den: BigInt) -> Result<Self, FractionError> {
        let (num, den) = reduce_fraction(&num, &den)?;
        Ok(Self { num, den })
    }

    /// Builds `num/den` from unsigned parts (den already known non-zero)
    pub fn from_u64s(num: u64, den: u64) -> Result<Self, FractionError> {
        Self::new(BigInt::from(num), BigInt::from(den))
    }

    pub fn numerator(&self) -> &BigInt {
        &self.num
    }

    pub fn denominator(&self) -> &BigInt {
        &self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn add(&self, other: &SignedFraction) -> SignedFraction {
        let common = lcm(&self.den, &other.den);
        let n = &self.num * (&common / &self.den) + &other.num * (&common / &other.den);
        Self::from_reduced_parts(n, common)
    }

    pub fn sub(&self, other: &SignedFraction) -> SignedFraction {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &SignedFraction) -> SignedFraction {
        Self::from_reduced_parts(&self.num * &other.num, &self.den * &other.den)
    }

    pub fn neg(&self) -> SignedFraction {
        Self { num: -&self.num, den: self.den.clone() }
    }

    /// Rounds toward negative infinity
    pub fn floor(&self) -> BigInt {
        self.num.div_floor(&self.den)
    }

    /// Deterministically bounds both magnitudes to `max_bits` by shifting them
    /// right together. The sign is carried separately so negative values shrink
    /// exactly like positive ones.
    pub fn bounded(&self, max_bits: u64) -> SignedFraction {
        if self.num.bits() <= max_bits && self.den.bits() <= max_bits {
            return self.clone();
        }

        let sign = self.num.sign();
        let mut n = self.num.magnitude().clone();
        let mut d = self.den.magnitude().clone();
        while n.bits() > max_bits || d.bits() > max_bits {
            n >>= 1;
            d >>= 1;
        }
        if d.is_zero() {
            d = One::one();
        }
        let n = BigInt::from_biguint(if sign == Sign::Minus { Sign::Minus } else { Sign::Plus }, n);
        Self::from_reduced_parts(n, BigInt::from(d))
    }

    /// Diagnostics only
    pub fn to_f64(&self) -> f64 {
        let n = self.num.to_f64().unwrap_or(f64::NAN);
        let d = self.den.to_f64().unwrap_or(f64::NAN);
        n / d
    }

    // Denominators produced internally are products of non-zero denominators.
    fn from_reduced_parts(num: BigInt, den: BigInt) -> SignedFraction {
        match reduce_fraction(&num, &den) {
            Ok((num, den)) => Self { num, den },
            Err(_) => Self::zero(),
        }
    }
}

impl Default for SignedFraction {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for SignedFraction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(&big(48), &big(18)), big(6));
        assert_eq!(gcd(&big(-48), &big(18)), big(6));
        assert_eq!(gcd(&big(0), &big(7)), big(7));
        assert_eq!(gcd(&big(7), &big(0)), big(7));
        assert_eq!(gcd(&big(17), &big(5)), big(1));
    }

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(&big(4), &big(6)), big(12));
        assert_eq!(lcm(&big(-4), &big(6)), big(12));
        assert_eq!(lcm(&big(0), &big(6)), big(0));
        assert_eq!(lcm(&big(6), &big(0)), big(0));
    }

    #[test]
    fn test_reduce_fraction() {
        assert_eq!(reduce_fraction(&big(6), &big(8)).unwrap(), (big(3), big(4)));
        assert_eq!(reduce_fraction(&big(0), &big(8)).unwrap(), (big(0), big(1)));
        assert_eq!(reduce_fraction(&big(3), &big(-6)).unwrap(), (big(-1), big(2)));
        assert_eq!(reduce_fraction(&big(-3), &big(-6)).unwrap(), (big(1), big(2)));
        assert_eq!(reduce_fraction(&big(1), &big(0)), Err(FractionError::ZeroDenominator));
    }

    #[test]
    fn test_scale_down_keeps_small_values() {
        assert_eq!(scale_down_big_ints(&big(3), &big(10)).unwrap(), (3, 10));
    }

    #[test]
    fn test_scale_down_large_values() {
        let num = BigInt::from(3u8) << 100usize;
        let den = BigInt::from(10u8) << 100usize;
        let (n, d) = scale_down_big_ints(&num, &den).unwrap();
        assert!(n < (1u64 << 63));
        assert!(d < (1u64 << 63));
        let ratio = n as f64 / d as f64;
        assert!((ratio - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_scale_down_denominator_never_zero() {
        let num = BigInt::from(1u8) << 200usize;
        let (n, d) = scale_down_big_ints(&num, &big(1)).unwrap();
        assert_eq!(d, 1);
        assert!(n > 0);
    }

    #[test]
    fn test_scale_down_rejects_negative() {
        assert!(matches!(
            scale_down_big_ints(&big(-1), &big(2)),
            Err(FractionError::Negative { .. })
        ));
    }

    #[test]
    fn test_signed_fraction_arithmetic() {
        let a = SignedFraction::from_u64s(3, 10).unwrap();
        let b = SignedFraction::from_u64s(9, 10).unwrap();
        let err = a.sub(&b);
        assert_eq!(err, SignedFraction::new(big(-3), big(5)).unwrap());

        let scaled = err.mul(&SignedFraction::from_u64s(1, 10).unwrap());
        assert_eq!(scaled.to_string(), "-3/50");
        assert_eq!(scaled.floor(), big(-1));
        assert_eq!(SignedFraction::from_u64s(7, 2).unwrap().floor(), big(3));
    }

    #[test]
    fn test_signed_fraction_bounded() {
        let n = -(BigInt::from(5u8) << 200usize);
        let d = BigInt::from(3u8) << 200usize;
        let f = SignedFraction::new(n, d).unwrap();
        // Reduction already collapses the shared power of two
        assert_eq!(f.to_string(), "-5/3");

        let n = -(BigInt::from(5u8) << 200usize) - 1;
        let d = (BigInt::from(3u8) << 200usize) + 1;
        let f = SignedFraction::new(n, d).unwrap().bounded(128);
        assert!(f.numerator().bits() <= 128);
        assert!(f.denominator().bits() <= 128);
        assert!(f.numerator().is_negative());
        assert!((f.to_f64() + 5.0 / 3.0).abs() < 1e-9);
    }
}
