//! Fixed-point money conversion and fee arithmetic.
//!
//! All amounts that participate in conservation math are stored as
//! integers scaled by a configured power of ten `S`. Floats only appear
//! at the human-unit boundary (views, configuration).

/// Convert a human-unit amount to the integer fixed-point scale, truncating
/// toward negative infinity (`floor`), per spec.
pub fn to_fx(amount: f64, scale: i64) -> i64 {
    (amount * scale as f64).floor() as i64
}

/// Convert an integer fixed-point amount back to human units.
pub fn from_fx(amount: i64, scale: i64) -> f64 {
    amount as f64 / scale as f64
}

/// Fee in parts-per-million, truncated toward zero: `price*qty*ppm / 1_000_000`.
pub fn fee_ppm(price: i64, quantity: i64, ppm: i64) -> i64 {
    price * quantity * ppm / 1_000_000
}

/// Per-unit fee used by the market order purchasing-power check:
/// `floor(price * ppm / 1_000_000)`.
pub fn per_unit_fee_ppm(price: i64, ppm: i64) -> i64 {
    price * ppm / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_fx_truncates() {
        assert_eq!(to_fx(10_000.00, 100), 1_000_000);
        assert_eq!(to_fx(1.009, 100), 100);
        assert_eq!(to_fx(1.0, 1), 1);
    }

    #[test]
    fn round_trip_exact_cents() {
        assert_eq!(from_fx(to_fx(1234.56, 100), 100), 1234.56);
    }

    #[test]
    fn fee_is_truncated() {
        assert_eq!(fee_ppm(101_00, 10, 0), 0);
        // 10100 * 3 * 2500 / 1_000_000 = 75.75 -> 75
        assert_eq!(fee_ppm(101_00, 3, 2500), 75);
    }

    #[test]
    fn per_unit_fee_matches_fee_ppm_for_one_unit() {
        assert_eq!(per_unit_fee_ppm(100_00, 2500), fee_ppm(100_00, 1, 2500));
    }
}
