// Numeric coercion for report cells.
//
// Report exports mix numbers, blanks and free text in the same column.
// Everything that is not a finite number collapses to NUMERIC_DEFAULT.

/// Value stored when a cell cannot be read as a finite number.
pub const NUMERIC_DEFAULT: i64 = 0;

/// Parse a cell as a finite float. Blank, non-numeric, NaN and infinite
/// input all yield `0.0`.
pub fn coerce_float(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) => finite_or_default(v),
        Err(_) => NUMERIC_DEFAULT as f64,
    }
}

/// Parse a cell as an integer. Fractional values truncate toward zero;
/// values outside the `i64` range collapse to the default.
pub fn coerce_int(raw: &str) -> i64 {
    float_to_int(coerce_float(raw))
}

/// Replace a non-finite float with the default.
pub fn finite_or_default(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        NUMERIC_DEFAULT as f64
    }
}

/// Truncate a float to `i64`, collapsing out-of-range or non-finite values.
pub fn float_to_int(value: f64) -> i64 {
    // i64::MAX is not exactly representable; the bound below is 2^63.
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        value.trunc() as i64
    } else {
        NUMERIC_DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_plain_numbers() {
        assert_eq!(coerce_int("42"), 42);
        assert_eq!(coerce_int(" 17 "), 17);
        assert_eq!(coerce_int("-3"), -3);
        assert_eq!(coerce_int("12.9"), 12);
        assert_eq!(coerce_int("-12.9"), -12);
        assert_eq!(coerce_float("2.5"), 2.5);
        assert_eq!(coerce_float("1e3"), 1000.0);
    }

    #[test]
    fn junk_collapses_to_default() {
        for raw in ["", "NaN", "nan", "inf", "-inf", "infinity", "abc", "1,000", "  "] {
            assert_eq!(coerce_int(raw), NUMERIC_DEFAULT, "input {raw:?}");
            assert_eq!(coerce_float(raw), 0.0, "input {raw:?}");
        }
    }

    #[test]
    fn out_of_range_collapses() {
        assert_eq!(coerce_int("1e30"), NUMERIC_DEFAULT);
        assert_eq!(coerce_int("-1e30"), NUMERIC_DEFAULT);
        assert_eq!(float_to_int(f64::NAN), NUMERIC_DEFAULT);
    }

    proptest! {
        #[test]
        fn coerce_float_is_always_finite(raw in ".{0,24}") {
            prop_assert!(coerce_float(&raw).is_finite());
        }

        #[test]
        fn integers_survive_coercion(n in -1_000_000_000i64..1_000_000_000i64) {
            prop_assert_eq!(coerce_int(&n.to_string()), n);
        }
    }
}
