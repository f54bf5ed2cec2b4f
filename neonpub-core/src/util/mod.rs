mod id;

pub use id::*;

/// Rounds to two decimal places, halves away from zero.
///
/// Exact halves always grow in magnitude, so `2.125` becomes `2.13` where banker's rounding
/// would give `2.12`.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod test {
    use super::round_to_cents;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to_cents(4.0), 4.0);
        assert_eq!(round_to_cents(14.0 / 3.0), 4.67);
        assert_eq!(round_to_cents(3.125), 3.13);
        assert_eq!(round_to_cents(1.0 / 3.0), 0.33);
        assert_eq!(round_to_cents(17.0 / 8.0), 2.13);
    }
}
