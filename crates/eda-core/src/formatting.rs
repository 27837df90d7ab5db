/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use eda_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a half ULP at the target precision so exact midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let grouped = group_thousands(&(rounded.trunc() as u64).to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        // "0.50" -> ".50"
        let frac_str = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a case count with thousands separators.
///
/// Negative counts (possible for `still_infected`) keep their sign.
///
/// # Examples
///
/// ```
/// use eda_core::formatting::format_count;
///
/// assert_eq!(format_count(80_026), "80,026");
/// assert_eq!(format_count(-12), "-12");
/// assert_eq!(format_count(0), "0");
/// ```
pub fn format_count(value: i64) -> String {
    let grouped = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a ratio in `[0, 1]` as a percentage with one decimal place.
///
/// Non-finite ratios (a zero denominator) render as `"undefined"` rather than
/// being coerced to a number.
///
/// # Examples
///
/// ```
/// use eda_core::formatting::format_rate;
///
/// assert_eq!(format_rate(0.5), "50.0%");
/// assert_eq!(format_rate(f64::NAN), "undefined");
/// ```
pub fn format_rate(ratio: f64) -> String {
    if !ratio.is_finite() {
        return "undefined".to_string();
    }
    format!("{}%", format_number(ratio * 100.0, 1))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in s.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_000.0, 0), "1,000");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_negative_rounding_to_zero_drops_sign() {
        assert_eq!(format_number(-0.001, 1), "0.0");
    }

    // ── format_count ─────────────────────────────────────────────────────────

    #[test]
    fn test_format_count_groups_thousands() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_count_negative() {
        assert_eq!(format_count(-4_321), "-4,321");
    }

    #[test]
    fn test_format_count_min_value_does_not_overflow() {
        assert!(format_count(i64::MIN).starts_with("-9,223"));
    }

    // ── format_rate ──────────────────────────────────────────────────────────

    #[test]
    fn test_format_rate_rounds() {
        assert_eq!(format_rate(0.1234), "12.3%");
        assert_eq!(format_rate(1.0), "100.0%");
    }

    #[test]
    fn test_format_rate_non_finite() {
        assert_eq!(format_rate(f64::INFINITY), "undefined");
        assert_eq!(format_rate(f64::NAN), "undefined");
    }
}
