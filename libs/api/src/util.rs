/// Current Unix time in seconds with sub-second precision.
pub fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Round `value` to `precision` decimal places.
///
/// Precision above 15 leaves the value untouched: `f64` carries no more
/// significant decimals than that.
pub fn round_to(value: f64, precision: u32) -> f64 {
    if precision > 15 {
        return value;
    }
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

/// Render an `f64` in its natural decimal form, always with a decimal point.
///
/// Shortest round-trip digits, so `0.1` stays `0.1`; integral values keep a
/// trailing `.0` (`3.0`, `-0.0`) so consumers always see a float token.
pub fn format_float(value: f64) -> String {
    let mut s = value.to_string();
    if value.is_finite() && !s.contains('.') {
        s.push_str(".0");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_precision() {
        assert_eq!(round_to(1.23456789, 6), 1.234568);
        assert_eq!(round_to(-9.9999999, 6), -10.0);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(0.1234, 20), 0.1234);
    }

    #[test]
    fn format_float_keeps_decimal_point() {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(-7.25), "-7.25");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(1700000000.5), "1700000000.5");
    }

    #[test]
    fn now_secs_is_after_2020() {
        assert!(now_secs() > 1_577_836_800.0);
    }
}
