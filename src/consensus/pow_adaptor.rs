// PoW adaptor - EMA difficulty control + PI price control
//
// Per block:
//   avg        = alpha * current + (1 - alpha) * parentAvg
//   factor     = clamp(avg / target, fMin, fMax)
//   difficulty = max(1, floor(difficulty * factor))
//   error      = target - current
//   accError  += error
//   price      = clamp(parentPrice + floor(kp * error + ki * accError), minPrice, maxPrice)
//
// All intermediate values are exact. Only the emitted average is narrowed to the
// fixed-width header pair, and bounds are always applied last.

use super::AdaptorError;
use crate::types::fraction::{self, lcm, reduce_fraction, SignedFraction};
use crate::types::{RawRatio, Rational};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use std::cmp::Ordering;
use tracing::debug;

/// Magnitude bound for the accumulated error fraction
pub const ACCUMULATED_ERROR_BITS: u64 = 128;

/// Result of one PoW adjustment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowAdjustment {
    /// New mining difficulty
    pub difficulty: BigUint,
    /// New PoW gas price
    pub price: BigUint,
    /// New average PoW ratio, narrowed for AvgRatioNumerator / AvgRatioDenominator
    pub avg_ratio: RawRatio,
}

/// PoW difficulty and price controller
#[derive(Debug, Clone)]
pub struct PowAdaptor {
    // EMA
    target_ratio: Rational,
    alpha: Rational,

    // Difficulty
    fmin: Rational,
    fmax: Rational,
    current_difficulty: BigUint,

    // Price
    kp: Rational,
    ki: Rational,
    min_price: BigUint,
    max_price: BigUint,
    accumulated_error: SignedFraction,
}

impl PowAdaptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target_ratio: RawRatio,
        alpha: RawRatio,
        fmin: RawRatio,
        fmax: RawRatio,
        initial_difficulty: BigUint,
        kp: RawRatio,
        ki: RawRatio,
        min_price: BigUint,
        max_price: BigUint,
    ) -> Result<Self, AdaptorError> {
        let alpha = alpha.validate("alpha")?;
        let target = target_ratio.validate("targetPowRatio")?;
        let fmin = fmin.validate("fMin")?;
        let fmax = fmax.validate("fMax")?;
        let kp = kp.validate("kp")?;
        let ki = ki.validate("ki")?;

        if target.is_zero() || target > Rational::ONE {
            return Err(AdaptorError::TargetRatioOutOfRange(target));
        }
        if alpha > Rational::ONE {
            return Err(AdaptorError::AlphaAboveOne(alpha));
        }
        if fmin > fmax {
            return Err(AdaptorError::FactorBoundsInverted { fmin, fmax });
        }
        if min_price.is_zero() {
            return Err(AdaptorError::NonPositivePrice);
        }
        if min_price > max_price {
            return Err(AdaptorError::PriceBoundsInverted { min: min_price, max: max_price });
        }
        if initial_difficulty.is_zero() {
            return Err(AdaptorError::NonPositiveDifficulty);
        }

        Ok(Self {
            target_ratio: target,
            alpha,
            fmin,
            fmax,
            current_difficulty: initial_difficulty,
            kp,
            ki,
            min_price,
            max_price,
            accumulated_error: SignedFraction::zero(),
        })
    }

    /// Computes the next difficulty, price and average ratio.
    ///
    /// Advances `current_difficulty` and the accumulated error, so calls must
    /// follow block height order.
    pub fn adjust_parameters(
        &mut self,
        current_pow_ratio: RawRatio,
        parent_avg_ratio: RawRatio,
        parent_price: Option<&BigUint>,
    ) -> Result<PowAdjustment, AdaptorError> {
        let current = Self::validate_ratio("currentPowRatio", current_pow_ratio)?;
        let parent_avg = Self::validate_ratio("parentAvgRatio", parent_avg_ratio)?;
        let parent_price = parent_price.ok_or(AdaptorError::MissingParentPrice)?;

        let (avg_num, avg_den) = self.ema(&current, &parent_avg)?;
        let (n, d) = fraction::scale_down_big_ints(&avg_num, &avg_den)?;
        let difficulty = self.next_difficulty(&avg_num, &avg_den);
        let price = self.next_price(&current, parent_price)?;

        debug!(
            current = %current_pow_ratio,
            parent_avg = %parent_avg_ratio,
            avg = %format_args!("{}/{}", avg_num, avg_den),
            difficulty = %difficulty,
            price = %price,
            acc_error = %self.accumulated_error,
            "Adjusted PoW parameters"
        );

        Ok(PowAdjustment {
            difficulty,
            price,
            avg_ratio: RawRatio::new(n, d),
        })
    }

    // Header ratios keep their full u64 parts; `0/0` reads as `0/1`.
    fn validate_ratio(field: &'static str, raw: RawRatio) -> Result<(BigInt, BigInt), AdaptorError> {
        raw.validate(field)?;
        if !raw.is_proper() {
            return Err(AdaptorError::RatioAboveOne { field, ratio: raw });
        }
        Ok((BigInt::from(raw.numerator), BigInt::from(raw.denominator.max(1))))
    }

    // alpha * current + (1 - alpha) * parent, exact and reduced
    fn ema(&self, current: &(BigInt, BigInt), parent: &(BigInt, BigInt)) -> Result<(BigInt, BigInt), AdaptorError> {
        let a_num = BigInt::from(self.alpha.numerator());
        let a_den = BigInt::from(self.alpha.denominator());

        let (t1_num, t1_den) = reduce_fraction(&(&a_num * &current.0), &(&a_den * &current.1))?;
        let (t2_num, t2_den) = reduce_fraction(&((&a_den - &a_num) * &parent.0), &(&a_den * &parent.1))?;

        let common = lcm(&t1_den, &t2_den);
        let sum = &t1_num * (&common / &t1_den) + &t2_num * (&common / &t2_den);
        Ok(reduce_fraction(&sum, &common)?)
    }

    fn next_difficulty(&mut self, avg_num: &BigInt, avg_den: &BigInt) -> BigUint {
        let target_num = BigInt::from(self.target_ratio.numerator());
        let target_den = BigInt::from(self.target_ratio.denominator());

        // factor = avg / target
        let mut factor_num = avg_num * &target_den;
        let mut factor_den = avg_den * &target_num;

        let fmin_num = BigInt::from(self.fmin.numerator());
        let fmin_den = BigInt::from(self.fmin.denominator());
        let fmax_num = BigInt::from(self.fmax.numerator());
        let fmax_den = BigInt::from(self.fmax.denominator());

        // a/b < c/d  <=>  a*d < c*b  (all denominators positive)
        if (&factor_num * &fmin_den).cmp(&(&fmin_num * &factor_den)) == Ordering::Less {
            factor_num = fmin_num;
            factor_den = fmin_den;
        } else if (&factor_num * &fmax_den).cmp(&(&fmax_num * &factor_den)) == Ordering::Greater {
            factor_num = fmax_num;
            factor_den = fmax_den;
        }

        let scaled = BigInt::from(self.current_difficulty.clone()) * factor_num / factor_den;
        let mut next = scaled.to_biguint().unwrap_or_default();
        if next.is_zero() {
            next = BigUint::one();
        }

        self.current_difficulty = next.clone();
        next
    }

    fn next_price(&mut self, current: &(BigInt, BigInt), parent_price: &BigUint) -> Result<BigUint, AdaptorError> {
        let target = SignedFraction::from_u64s(self.target_ratio.numerator(), self.target_ratio.denominator())?;
        let observed = SignedFraction::new(current.0.clone(), current.1.clone())?;
        let error = target.sub(&observed);

        self.accumulated_error = self
            .accumulated_error
            .add(&error)
            .bounded(ACCUMULATED_ERROR_BITS);

        let kp = SignedFraction::from_u64s(self.kp.numerator(), self.kp.denominator())?;
        let ki = SignedFraction::from_u64s(self.ki.numerator(), self.ki.denominator())?;
        let adjustment = kp.mul(&error).add(&ki.mul(&self.accumulated_error)).floor();

        let raw = BigInt::from(parent_price.clone()) + adjustment;
        let min = BigInt::from(self.min_price.clone());
        let max = BigInt::from(self.max_price.clone());
        let clamped = if raw < min {
            min
        } else if raw > max {
            max
        } else {
            raw
        };

        // min_price > 0, so the clamped value is positive
        Ok(clamped.to_biguint().unwrap_or_else(|| self.min_price.clone()))
    }

    pub fn current_difficulty(&self) -> &BigUint {
        &self.current_difficulty
    }

    pub fn accumulated_error(&self) -> &SignedFraction {
        &self.accumulated_error
    }

    pub fn reset_accumulated_error(&mut self) {
        self.accumulated_error = SignedFraction::zero();
    }

    pub fn target_ratio(&self) -> Rational {
        self.target_ratio
    }

    pub fn price_bounds(&self) -> (&BigUint, &BigUint) {
        (&self.min_price, &self.max_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RationalError;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    fn adaptor_with_difficulty(difficulty: u64) -> PowAdaptor {
        PowAdaptor::new(
            RawRatio::new(3, 10),  // target
            RawRatio::new(2, 10),  // alpha
            RawRatio::new(8, 10),  // fMin
            RawRatio::new(12, 10), // fMax
            big(difficulty),
            RawRatio::new(1, 10),  // kp
            RawRatio::new(1, 100), // ki
            big(100),
            big(10000),
        )
        .unwrap()
    }

    fn adaptor() -> PowAdaptor {
        adaptor_with_difficulty(1_000_000)
    }

    #[test]
    fn test_normal_adjustment() {
        let mut pa = adaptor();
        let adj = pa
            .adjust_parameters(RawRatio::new(4, 10), RawRatio::new(3, 10), Some(&big(1000)))
            .unwrap();

        // avg = 0.2 * 0.4 + 0.8 * 0.3 = 0.32, factor = 0.32 / 0.3 = 16/15
        assert_eq!(adj.avg_ratio, RawRatio::new(8, 25));
        assert_eq!(adj.difficulty, big(1_066_666));
        assert_eq!(pa.current_difficulty(), &big(1_066_666));

        // error = -0.1, acc = -0.1, adjustment = floor(-0.01 - 0.001) = -1
        assert_eq!(adj.price, big(999));
        assert_eq!(pa.accumulated_error(), &SignedFraction::from_u64s(1, 10).unwrap().neg());
    }

    #[test]
    fn test_factor_clamped_to_fmax_and_fmin() {
        let mut pa = adaptor();
        // avg = 0.2 * 1 + 0.8 * 1 = 1, factor 10/3 -> fMax
        let adj = pa.adjust_parameters(RawRatio::new(1, 1), RawRatio::new(1, 1), Some(&big(1000))).unwrap();
        assert_eq!(adj.difficulty, big(1_200_000));

        // avg = 0, factor 0 -> fMin
        let adj = pa.adjust_parameters(RawRatio::new(0, 1), RawRatio::new(0, 1), Some(&big(1000))).unwrap();
        assert_eq!(adj.difficulty, big(960_000));
    }

    #[test]
    fn test_difficulty_never_reaches_zero() {
        let mut pa = adaptor_with_difficulty(1);
        let adj = pa.adjust_parameters(RawRatio::new(0, 1), RawRatio::new(0, 1), Some(&big(1000))).unwrap();
        assert_eq!(adj.difficulty, big(1));
    }

    #[test]
    fn test_price_never_leaves_band() {
        // High PoW share near the ceiling pushes the price down, never above max
        let mut pa = adaptor();
        let mut price = big(9990);
        for _ in 0..100 {
            let adj = pa.adjust_parameters(RawRatio::new(9, 10), RawRatio::new(9, 10), Some(&price)).unwrap();
            assert!(adj.price <= big(10000));
            assert!(adj.price >= big(100));
            price = adj.price;
        }

        // Low PoW share near the floor pushes the price up, never below min
        let mut pa = adaptor();
        let mut price = big(110);
        for _ in 0..100 {
            let adj = pa.adjust_parameters(RawRatio::new(1, 10), RawRatio::new(1, 10), Some(&price)).unwrap();
            assert!(adj.price >= big(100));
            assert!(adj.price <= big(10000));
            price = adj.price;
        }
    }

    #[test]
    fn test_price_saturates_at_bounds() {
        // error = 0.2 per block; the integral term needs ~490 blocks to move a unit
        let mut pa = adaptor();
        let mut price = big(9990);
        for _ in 0..1000 {
            price = pa
                .adjust_parameters(RawRatio::new(1, 10), RawRatio::new(1, 10), Some(&price))
                .unwrap()
                .price;
            assert!(price <= big(10000));
        }
        assert_eq!(price, big(10000));

        // Negative adjustments floor to at least -1 per block
        let mut pa = adaptor();
        let mut price = big(110);
        for _ in 0..20 {
            price = pa
                .adjust_parameters(RawRatio::new(9, 10), RawRatio::new(9, 10), Some(&price))
                .unwrap()
                .price;
            assert!(price >= big(100));
        }
        assert_eq!(price, big(100));
    }

    #[test]
    fn test_constructor_validation() {
        let build = |target: RawRatio, alpha: RawRatio, difficulty: u64, min: u64, max: u64| {
            PowAdaptor::new(
                target,
                alpha,
                RawRatio::new(8, 10),
                RawRatio::new(12, 10),
                big(difficulty),
                RawRatio::new(1, 10),
                RawRatio::new(1, 100),
                big(min),
                big(max),
            )
        };
        let t = RawRatio::new(3, 10);
        let a = RawRatio::new(2, 10);

        assert!(matches!(
            build(t, RawRatio::new(2, 0), 1_000_000, 100, 10000),
            Err(AdaptorError::InvalidRatio(RationalError::ZeroDenominator { field: "alpha", .. }))
        ));
        assert!(matches!(build(t, a, 1_000_000, 10000, 100), Err(AdaptorError::PriceBoundsInverted { .. })));
        assert_eq!(build(t, a, 1_000_000, 0, 100).unwrap_err(), AdaptorError::NonPositivePrice);
        assert_eq!(build(t, a, 0, 100, 10000).unwrap_err(), AdaptorError::NonPositiveDifficulty);
        assert!(matches!(
            build(RawRatio::new(11, 10), a, 1_000_000, 100, 10000),
            Err(AdaptorError::TargetRatioOutOfRange(_))
        ));
        assert!(matches!(
            build(RawRatio::new(0, 10), a, 1_000_000, 100, 10000),
            Err(AdaptorError::TargetRatioOutOfRange(_))
        ));
        assert!(matches!(
            build(t, RawRatio::new(3, 2), 1_000_000, 100, 10000),
            Err(AdaptorError::AlphaAboveOne(_))
        ));
        assert!(build(t, a, 1_000_000, 100, 100).is_ok());
    }

    #[test]
    fn test_inverted_factor_bounds() {
        let res = PowAdaptor::new(
            RawRatio::new(3, 10),
            RawRatio::new(2, 10),
            RawRatio::new(12, 10),
            RawRatio::new(8, 10),
            big(1),
            RawRatio::new(1, 10),
            RawRatio::new(1, 100),
            big(100),
            big(10000),
        );
        assert!(matches!(res, Err(AdaptorError::FactorBoundsInverted { .. })));
    }

    #[test]
    fn test_invalid_inputs() {
        let mut pa = adaptor();
        let price = big(1000);

        assert!(matches!(
            pa.adjust_parameters(RawRatio::new(1, 0), RawRatio::new(3, 10), Some(&price)),
            Err(AdaptorError::InvalidRatio(RationalError::ZeroDenominator { field: "currentPowRatio", .. }))
        ));
        assert!(matches!(
            pa.adjust_parameters(RawRatio::new(1, 10), RawRatio::new(3, 0), Some(&price)),
            Err(AdaptorError::InvalidRatio(RationalError::ZeroDenominator { field: "parentAvgRatio", .. }))
        ));
        assert_eq!(
            pa.adjust_parameters(RawRatio::new(11, 10), RawRatio::new(3, 10), Some(&price)).unwrap_err(),
            AdaptorError::RatioAboveOne { field: "currentPowRatio", ratio: RawRatio::new(11, 10) }
        );
        assert_eq!(
            pa.adjust_parameters(RawRatio::new(1, 10), RawRatio::new(3, 10), None).unwrap_err(),
            AdaptorError::MissingParentPrice
        );

        // Failed calls leave the state untouched
        assert_eq!(pa.current_difficulty(), &big(1_000_000));
        assert!(pa.accumulated_error().is_zero());
    }

    #[test]
    fn test_wide_parent_average_stays_exact() {
        let mut pa = adaptor();
        let parent = RawRatio::new((1 << 61) + 12345, (1 << 62) + 777);
        let adj = pa.adjust_parameters(RawRatio::new(3, 10), parent, Some(&big(5000))).unwrap();

        // 0.2 * 3/10 + 0.8 * parent, reduced then narrowed to 63 bits
        assert_eq!(adj.avg_ratio, RawRatio::new(3_314_649_325_744_700_560, 7_205_759_403_792_794_814));
        assert_eq!(adj.difficulty, big(1_200_000));
        assert_eq!(adj.price, big(5000));
    }

    #[test]
    fn test_wide_current_ratio_feeds_exact_error() {
        let mut pa = adaptor();
        let den = 10u64 << 59;
        let current = RawRatio::new(3 * (1u64 << 59) + 1, den);
        pa.adjust_parameters(current, RawRatio::new(3, 10), Some(&big(5000))).unwrap();

        // 3/10 - (3 * 2^59 + 1) / (10 * 2^59)
        let expected = SignedFraction::new(BigInt::from(-1), BigInt::from(den)).unwrap();
        assert_eq!(pa.accumulated_error(), &expected);
    }

    #[test]
    fn test_zero_over_zero_reads_as_zero() {
        let mut pa = adaptor();
        let adj = pa.adjust_parameters(RawRatio::new(0, 0), RawRatio::new(0, 0), Some(&big(1000))).unwrap();
        assert_eq!(adj.avg_ratio, RawRatio::new(0, 1));
        assert_eq!(adj.difficulty, big(800_000));
    }

    #[test]
    fn test_reset_accumulated_error() {
        let mut pa = adaptor();
        pa.adjust_parameters(RawRatio::new(9, 10), RawRatio::new(3, 10), Some(&big(1000))).unwrap();
        assert!(!pa.accumulated_error().is_zero());
        pa.reset_accumulated_error();
        assert!(pa.accumulated_error().is_zero());
    }

    #[test]
    fn test_deterministic_across_instances() {
        let mut a = adaptor();
        let mut b = adaptor();
        let inputs = [(1u64, 10u64), (7, 10), (3, 10), (999, 1000), (0, 1), (333, 1000)];
        let mut avg = RawRatio::new(3, 10);
        let mut price = big(5050);
        for (n, d) in inputs {
            let ra = a.adjust_parameters(RawRatio::new(n, d), avg, Some(&price)).unwrap();
            let rb = b.adjust_parameters(RawRatio::new(n, d), avg, Some(&price)).unwrap();
            assert_eq!(ra, rb);
            avg = ra.avg_ratio;
            price = ra.price;
        }
    }
}
