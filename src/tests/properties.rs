// Property Tests
//
// Randomised checks of the arithmetic and of the bounds every adaptor output
// must respect, whatever the block sequence.

#[cfg(test)]
mod property_tests {
    use crate::consensus::{GasAdaptor, PowAdaptor};
    use crate::governance::{Plan, PlanPool};
    use crate::types::fraction::{reduce_fraction, scale_down_big_ints};
    use crate::types::rational::PRECISION_THRESHOLD;
    use crate::types::{RawRatio, Rational};
    use num_bigint::{BigInt, BigUint};
    use num_traits::Zero;
    use proptest::prelude::*;

    // ===== STRATEGIES =====

    fn proper_ratio() -> impl Strategy<Value = RawRatio> {
        (1u64..=1_000_000).prop_flat_map(|den| (0..=den).prop_map(move |num| RawRatio::new(num, den)))
    }

    fn gas_ratio() -> impl Strategy<Value = RawRatio> {
        (0u64..=100_000, 1u64..=100_000).prop_map(|(num, den)| RawRatio::new(num, den))
    }

    fn pow_adaptor() -> PowAdaptor {
        PowAdaptor::new(
            RawRatio::new(3, 10),
            RawRatio::new(2, 10),
            RawRatio::new(8, 10),
            RawRatio::new(12, 10),
            BigUint::from(1_000_000u32),
            RawRatio::new(1, 10),
            RawRatio::new(1, 100),
            BigUint::from(100u32),
            BigUint::from(10_000u32),
        )
        .unwrap()
    }

    proptest! {
        // ===== RATIONAL AND FRACTION ARITHMETIC =====

        #[test]
        fn test_reduction_is_idempotent(num in any::<i64>(), den in any::<i64>().prop_filter("non-zero", |d| *d != 0)) {
            let (n, d) = reduce_fraction(&BigInt::from(num), &BigInt::from(den)).unwrap();
            let (n2, d2) = reduce_fraction(&n, &d).unwrap();
            prop_assert_eq!(n, n2);
            prop_assert_eq!(d, d2);
        }

        #[test]
        fn test_reduction_preserves_zero(den in any::<i64>().prop_filter("non-zero", |d| *d != 0)) {
            let (n, d) = reduce_fraction(&BigInt::zero(), &BigInt::from(den)).unwrap();
            prop_assert!(n.is_zero());
            prop_assert_eq!(d, BigInt::from(1));
        }

        #[test]
        fn test_scale_down_fits_header_fields(num in any::<u128>(), den in 1u128..) {
            let (n, d) = scale_down_big_ints(&BigInt::from(num), &BigInt::from(den)).unwrap();
            prop_assert!(n <= i64::MAX as u64);
            prop_assert!(d <= i64::MAX as u64);
            prop_assert!(d >= 1);
        }

        #[test]
        fn test_rational_parts_stay_below_threshold(num in any::<u64>(), den in any::<u64>()) {
            let r = Rational::new(num, den);
            prop_assert!(r.numerator() <= PRECISION_THRESHOLD);
            prop_assert!(r.denominator() <= PRECISION_THRESHOLD);
            prop_assert!(r.denominator() >= 1);
        }

        #[test]
        fn test_compare_is_antisymmetric(a in (any::<u32>(), 1u32..), b in (any::<u32>(), 1u32..)) {
            let x = Rational::new(a.0 as u64, a.1 as u64);
            let y = Rational::new(b.0 as u64, b.1 as u64);
            prop_assert_eq!(x.compare(&y), -y.compare(&x));
            prop_assert_eq!(x.compare(&x), 0);
        }

        #[test]
        fn test_small_fractions_compare_exactly(a in (0u32..1000, 1u32..1000), b in (0u32..1000, 1u32..1000)) {
            let x = Rational::new(a.0 as u64, a.1 as u64);
            let y = Rational::new(b.0 as u64, b.1 as u64);
            let expected = (a.0 as u64 * b.1 as u64).cmp(&(b.0 as u64 * a.1 as u64));
            prop_assert_eq!(x.cmp(&y), expected);
        }

        // ===== ADAPTOR BOUNDS =====

        #[test]
        fn test_gas_stays_within_bounds(ratios in prop::collection::vec(gas_ratio(), 1..200)) {
            let mut adaptor = GasAdaptor::new(1_000, 10_000, 5_000, RawRatio::new(3, 10)).unwrap();
            let mut ema = RawRatio::new(1, 2);
            for ratio in ratios {
                let adjustment = adaptor.adjust_gas(ratio, ema).unwrap();
                prop_assert!(adjustment.gas >= 1_000 && adjustment.gas <= 10_000);
                ema = adjustment.ema.as_raw();
            }
        }

        #[test]
        fn test_price_and_difficulty_bounded(ratios in prop::collection::vec(proper_ratio(), 1..200)) {
            let mut adaptor = pow_adaptor();
            let mut avg = RawRatio::new(3, 10);
            let mut price = BigUint::from(5_050u32);
            for ratio in ratios {
                let before = adaptor.current_difficulty().clone();
                let out = adaptor.adjust_parameters(ratio, avg, Some(&price)).unwrap();

                prop_assert!(out.price >= BigUint::from(100u32) && out.price <= BigUint::from(10_000u32));
                prop_assert!(out.difficulty >= BigUint::from(1u32));
                prop_assert!(out.difficulty <= &before * BigUint::from(6u32) / BigUint::from(5u32));
                prop_assert!(out.avg_ratio.is_proper());

                avg = out.avg_ratio;
                price = out.price;
            }
        }

        // ===== PLAN POOL =====

        #[test]
        fn test_min_height_is_lowest_pending(heights in prop::collection::vec(0u64..1_000, 1..50), removals in prop::collection::vec(any::<prop::sample::Index>(), 0..50)) {
            let pool = PlanPool::new();
            let mut live: Vec<(u64, u64)> = heights
                .iter()
                .map(|h| (pool.add_plan(Plan::at(*h)), *h))
                .collect();

            for index in removals {
                if live.is_empty() {
                    break;
                }
                let (id, _) = live.remove(index.index(live.len()));
                prop_assert!(pool.remove_plan(id));
                prop_assert_eq!(pool.min_height(), live.iter().map(|(_, h)| *h).min());
            }
            prop_assert_eq!(pool.len(), live.len());
        }

        #[test]
        fn test_merge_takes_last_writer(values in prop::collection::vec(prop::option::of(1u64..1_000_000), 1..10)) {
            let pool = PlanPool::new();
            for value in &values {
                pool.add_plan(Plan { min_pow_gas: *value, ..Plan::at(1) });
            }
            let expected = values.iter().rev().find_map(|v| *v);
            prop_assert_eq!(pool.merge_plans(1).and_then(|p| p.min_pow_gas), expected);
        }
    }
}
