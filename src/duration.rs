//! Duration token parsing for temporary sanctions.

/// Parse a duration token like `10m` or `1h` into milliseconds.
///
/// The accepted shape is one or more decimal digits followed by exactly one
/// unit letter (`s`, `m`, `h`, `d`). Anything else returns 0, which the
/// sanction scheduler treats as "revert immediately". Compound tokens such
/// as `1h30m` are not accepted.
#[must_use]
pub fn parse_duration_ms(token: &str) -> u64 {
    let Some(unit) = token.chars().last() else {
        return 0;
    };
    let digits = &token[..token.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    let Ok(value) = digits.parse::<u64>() else {
        return 0;
    };
    let factor: u64 = match unit {
        's' => 1_000,
        'm' => 60_000,
        'h' => 3_600_000,
        'd' => 86_400_000,
        _ => return 0,
    };
    value.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_factors() {
        assert_eq!(parse_duration_ms("1s"), 1_000);
        assert_eq!(parse_duration_ms("30s"), 30_000);
        assert_eq!(parse_duration_ms("10m"), 600_000);
        assert_eq!(parse_duration_ms("1h"), 3_600_000);
        assert_eq!(parse_duration_ms("2h"), 7_200_000);
        assert_eq!(parse_duration_ms("1d"), 86_400_000);
        assert_eq!(parse_duration_ms("7d"), 604_800_000);
    }

    #[test]
    fn test_zero_value_is_permitted() {
        // "0s" matches the grammar and maps to an immediate reversal
        assert_eq!(parse_duration_ms("0s"), 0);
        assert_eq!(parse_duration_ms("0d"), 0);
    }

    #[test]
    fn test_malformed_tokens_return_zero() {
        assert_eq!(parse_duration_ms(""), 0);
        assert_eq!(parse_duration_ms("m"), 0);
        assert_eq!(parse_duration_ms("10"), 0);
        assert_eq!(parse_duration_ms("10x"), 0);
        assert_eq!(parse_duration_ms("10 m"), 0);
        assert_eq!(parse_duration_ms("1h30m"), 0);
        assert_eq!(parse_duration_ms("-5m"), 0);
        assert_eq!(parse_duration_ms("1.5h"), 0);
        assert_eq!(parse_duration_ms("10M"), 0);
        assert_eq!(parse_duration_ms("ms"), 0);
    }

    #[test]
    fn test_overflow_saturates() {
        let huge = format!("{}d", u64::MAX);
        assert_eq!(parse_duration_ms(&huge), u64::MAX);
    }
}
