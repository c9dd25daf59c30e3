//! Scale factor handling
//!
//! SunSpec transmits each measurement as an integer plus a power-of-ten
//! exponent. The physical value is `raw * 10^sf`, reported with `|sf|`
//! decimal places. Rounding is half to even, judged on the exact binary
//! value of the input, so `0.125` is a tie but `2.675` (stored just below
//! it) is not.

use std::cmp::Ordering;

/// Beyond this many places an `f64` has no digits left to round.
const MAX_PLACES: u32 = 15;

/// Apply a scale factor to a raw register value.
pub fn normalize(raw: i64, scale_factor: i32) -> f64 {
    let value = if scale_factor >= 0 {
        raw as f64 * 10f64.powi(scale_factor)
    } else {
        // dividing by an exact power of ten keeps e.g. 2305 / 100 == 23.05
        raw as f64 / 10f64.powi(-scale_factor)
    };
    round_to(value, scale_factor.unsigned_abs())
}

/// Round to `places` decimal places, ties to even.
pub fn round_to(value: f64, places: u32) -> f64 {
    if places > MAX_PLACES || !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    let scaled = value.abs() * factor;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = if scaled.fract() == 0.5 {
        // the product can land on .5 through its own rounding error
        match compare_to_tie(value.abs(), places, scaled) {
            Ordering::Less => scaled.floor(),
            Ordering::Equal => scaled.round_ties_even(),
            Ordering::Greater => scaled.ceil(),
        }
    } else {
        scaled.round()
    };
    (rounded / factor).copysign(value)
}

/// Compares `magnitude * 10^places` exactly against the half-way point
/// `tie`, which must be a finite, positive multiple of 0.5 below 2^52.
fn compare_to_tie(magnitude: f64, places: u32, tie: f64) -> Ordering {
    let bits = magnitude.to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exp) = if exp_bits == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), exp_bits - 1075)
    };

    // both sides doubled: mantissa * 10^places * 2^(exp + 1) against 2 * tie
    let lhs = u128::from(mantissa) * 10u128.pow(places);
    let rhs = (tie * 2.0) as u128;
    let shift = exp + 1;
    if shift >= 0 {
        let shift = shift as u32;
        if shift >= 128 || lhs > (u128::MAX >> shift) {
            return Ordering::Greater;
        }
        (lhs << shift).cmp(&rhs)
    } else {
        let shift = shift.unsigned_abs();
        if shift >= 128 || rhs > (u128::MAX >> shift) {
            return Ordering::Less;
        }
        lhs.cmp(&(rhs << shift))
    }
}

/// Lifetime energy counter in kWh.
///
/// The inverter reports watt-hours with an unsigned scale factor; the
/// result is always given to three decimal places whatever the factor.
pub fn energy_kwh(raw_wh: u32, scale_factor: u16) -> f64 {
    let wh = normalize(i64::from(raw_wh), i32::from(scale_factor));
    round_to(wh * 0.001, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_negative_scale() {
        assert_eq!(normalize(100, -2), 1.0);
        assert_eq!(normalize(2305, -2), 23.05);
        assert_eq!(normalize(5001, -2), 50.01);
        assert_eq!(normalize(-1234, -1), -123.4);
        assert_eq!(normalize(2401, -1), 240.1);
    }

    #[test]
    fn test_normalize_zero_and_positive_scale() {
        assert_eq!(normalize(4711, 0), 4711.0);
        assert_eq!(normalize(-5, 0), -5.0);
        assert_eq!(normalize(12, 3), 12000.0);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        for raw in [-32768i64, -1, 0, 1, 999, 32767, 65535] {
            for sf in -4..=2 {
                assert_eq!(normalize(raw, sf).to_bits(), normalize(raw, sf).to_bits());
            }
        }
    }

    #[test]
    fn test_normalize_matches_round_of_product() {
        for raw in [0i64, 1, 7, 99, 100, 12345, 65535] {
            for sf in -3..=0 {
                let expected = round_to(raw as f64 * 10f64.powi(sf), sf.unsigned_abs());
                assert!((normalize(raw, sf) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_round_ties_to_even() {
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(3.5, 0), 4.0);
        assert_eq!(round_to(-2.5, 0), -2.0);
        assert_eq!(round_to(0.5, 0), 0.0);
        // 0.125 and 0.375 are exact in binary, so these are true ties
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-0.125, 2), -0.12);
        assert_eq!(round_to(1.0, 2), 1.0);
    }

    #[test]
    fn test_round_uses_exact_binary_value() {
        // stored just below the decimal tie
        assert_eq!(round_to(2.675, 2), 2.67);
        assert_eq!(round_to(4.35, 1), 4.3);
        assert_eq!(round_to(0.145, 2), 0.14);
        assert_eq!(round_to(-4.35, 1), -4.3);
        assert_eq!(round_to(0.15, 1), 0.1);
        assert_eq!(round_to(1.2345, 3), 1.234);
        // stored just above it
        assert_eq!(round_to(2.345, 2), 2.35);
        // exact tie in binary
        assert_eq!(round_to(2.25, 1), 2.2);
    }

    #[test]
    fn test_round_to_passes_through_unroundable() {
        assert!(round_to(f64::INFINITY, 2).is_infinite());
        assert!(round_to(f64::NAN, 2).is_nan());
        assert_eq!(round_to(1.23456789, 40), 1.23456789);
    }

    #[test]
    fn test_energy_kwh() {
        assert_eq!(energy_kwh(12_345_678, 0), 12345.678);
        assert_eq!(energy_kwh(1, 0), 0.001);
        assert_eq!(energy_kwh(0, 0), 0.0);
        assert_eq!(energy_kwh(1_234, 1), 12.34);
        assert_eq!(energy_kwh(u32::MAX, 0), 4_294_967.295);
    }
}
